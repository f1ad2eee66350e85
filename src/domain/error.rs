//! Domain error types.

/// Rejection raised while normalizing an untrusted strategy definition.
///
/// Always raised before any bar is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("strategy must contain at least one rule")]
    NoRules,

    #[error("unsupported rule kind '{kind}' (rule {index})")]
    UnsupportedRuleKind { index: usize, kind: String },

    #[error("invalid parameter '{name}' in rule {index}: {reason}")]
    InvalidParameter {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("malformed strategy: {reason}")]
    Malformed { reason: String },
}

/// Top-level error type for ruletrader.
#[derive(Debug, thiserror::Error)]
pub enum RuletraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RuletraderError> for std::process::ExitCode {
    fn from(err: &RuletraderError) -> Self {
        let code: u8 = match err {
            RuletraderError::Io(_) => 1,
            RuletraderError::ConfigParse { .. }
            | RuletraderError::ConfigMissing { .. }
            | RuletraderError::ConfigInvalid { .. } => 2,
            RuletraderError::Data { .. } => 3,
            RuletraderError::Validation(_) | RuletraderError::Json(_) => 4,
            RuletraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages() {
        let err = ValidationError::UnsupportedRuleKind {
            index: 0,
            kind: "foo_bar".into(),
        };
        assert_eq!(err.to_string(), "unsupported rule kind 'foo_bar' (rule 0)");

        let err = ValidationError::InvalidParameter {
            index: 1,
            name: "period".into(),
            reason: "must be a positive integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid parameter 'period' in rule 1: must be a positive integer"
        );
    }

    #[test]
    fn validation_converts_transparently() {
        let err: RuletraderError = ValidationError::NoRules.into();
        assert_eq!(err.to_string(), "strategy must contain at least one rule");
        assert!(matches!(err, RuletraderError::Validation(ValidationError::NoRules)));
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;

        let cases = [
            (
                RuletraderError::Io(std::io::Error::other("boom")),
                ExitCode::from(1),
            ),
            (
                RuletraderError::ConfigMissing {
                    section: "data".into(),
                    key: "dir".into(),
                },
                ExitCode::from(2),
            ),
            (
                RuletraderError::Data {
                    reason: "bad row".into(),
                },
                ExitCode::from(3),
            ),
            (
                RuletraderError::Validation(ValidationError::NoRules),
                ExitCode::from(4),
            ),
            (
                RuletraderError::NoData { code: "AAPL".into() },
                ExitCode::from(5),
            ),
        ];

        for (err, expected) in &cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(err)),
                format!("{expected:?}"),
                "{err}"
            );
        }
    }
}
