//! Strategy configuration and composition.

use crate::domain::rule::Rule;
use serde::{Deserialize, Serialize};

/// How the per-rule signals of a multi-rule strategy are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    /// Logical AND across rules.
    #[default]
    All,
    /// Logical OR across rules.
    Any,
}

impl Combine {
    pub fn merge(self, values: impl IntoIterator<Item = bool>) -> bool {
        let mut values = values.into_iter();
        match self {
            Combine::All => values.all(|v| v),
            Combine::Any => values.any(|v| v),
        }
    }
}

/// A validated strategy. Build one through `normalizer::normalize_strategy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub combine: Combine,
}

impl Strategy {
    /// Leading bars on which no rule can fire.
    pub fn warmup(&self) -> usize {
        self.rules.iter().map(Rule::warmup).max().unwrap_or(0)
    }
}
