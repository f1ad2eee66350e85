//! Strategy DSL normalization.
//!
//! Turns an untrusted JSON strategy (hand-edited or machine-generated) into a
//! validated [`Strategy`], filling per-kind defaults. Everything here runs
//! before any indicator is computed.
//!
//! Accepted shape:
//!
//! ```json
//! { "name": "Golden cross",
//!   "combine": "all",
//!   "rules": [ { "type": "ma_cross", "params": { "fast": 10, "slow": "30" } } ] }
//! ```
//!
//! Parameters may also be given inline on the rule object. Numeric strings are
//! coerced; `null` counts as missing.

use crate::domain::error::{RuletraderError, ValidationError};
use crate::domain::indicator::macd;
use crate::domain::rule::{MovingAverage, Polarity, Rule};
use crate::domain::strategy::{Combine, Strategy};
use serde_json::{Map, Value};

pub const DEFAULT_STRATEGY_NAME: &str = "Unnamed strategy";

pub const DEFAULT_MA_FAST: usize = 10;
pub const DEFAULT_MA_SLOW: usize = 30;

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_RSI_LOW: f64 = 30.0;
pub const DEFAULT_RSI_HIGH: f64 = 70.0;

const MAX_PERIOD: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    MaCross,
    RsiThreshold,
    MacdCross,
}

impl RuleKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().replace('-', "_").as_str() {
            "ma_cross" | "sma_cross" | "moving_average_cross" => Some(RuleKind::MaCross),
            "rsi_threshold" | "rsi" | "momentum_oscillator_threshold" => {
                Some(RuleKind::RsiThreshold)
            }
            "macd_cross" | "macd" | "trend_signal_cross" => Some(RuleKind::MacdCross),
            _ => None,
        }
    }
}

/// Parse and normalize a strategy from JSON text.
pub fn parse_strategy(json: &str) -> Result<Strategy, RuletraderError> {
    let value: Value = serde_json::from_str(json)?;
    Ok(normalize_strategy(&value)?)
}

pub fn normalize_strategy(input: &Value) -> Result<Strategy, ValidationError> {
    let object = input.as_object().ok_or_else(|| ValidationError::Malformed {
        reason: "strategy must be a JSON object".into(),
    })?;

    let name = match present(object.get("name")) {
        None => DEFAULT_STRATEGY_NAME.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) => DEFAULT_STRATEGY_NAME.to_string(),
        Some(_) => {
            return Err(ValidationError::Malformed {
                reason: "name must be a string".into(),
            });
        }
    };

    let combine = match present(object.get("combine")) {
        None => Combine::default(),
        Some(value) => parse_combine(value)?,
    };

    let raw_rules = match present(object.get("rules")) {
        None => return Err(ValidationError::NoRules),
        Some(Value::Array(rules)) => rules,
        Some(_) => {
            return Err(ValidationError::Malformed {
                reason: "rules must be an array".into(),
            });
        }
    };

    if raw_rules.is_empty() {
        return Err(ValidationError::NoRules);
    }

    let rules = raw_rules
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_rule(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Strategy {
        name,
        rules,
        combine,
    })
}

fn parse_combine(value: &Value) -> Result<Combine, ValidationError> {
    let malformed = || ValidationError::Malformed {
        reason: format!("combine must be 'all' or 'any', got {}", value),
    };
    match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
        Some("all") | Some("and") => Ok(Combine::All),
        Some("any") | Some("or") => Ok(Combine::Any),
        _ => Err(malformed()),
    }
}

fn normalize_rule(index: usize, raw: &Value) -> Result<Rule, ValidationError> {
    let object = raw.as_object().ok_or_else(|| ValidationError::Malformed {
        reason: format!("rule {} must be a JSON object", index),
    })?;

    let tag = match present(object.get("type")).or_else(|| present(object.get("kind"))) {
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => {
            return Err(ValidationError::UnsupportedRuleKind {
                index,
                kind: other.to_string(),
            });
        }
        None => {
            return Err(ValidationError::Malformed {
                reason: format!("rule {} has no 'type'", index),
            });
        }
    };

    let kind = RuleKind::parse(tag).ok_or_else(|| ValidationError::UnsupportedRuleKind {
        index,
        kind: tag.to_string(),
    })?;

    let params = match present(object.get("params")) {
        None => None,
        Some(Value::Object(params)) => Some(params),
        Some(_) => {
            return Err(ValidationError::Malformed {
                reason: format!("params of rule {} must be an object", index),
            });
        }
    };
    let p = Params {
        index,
        params,
        inline: object,
    };

    match kind {
        RuleKind::MaCross => Ok(Rule::MaCross {
            fast: p.period("fast", DEFAULT_MA_FAST)?,
            slow: p.period("slow", DEFAULT_MA_SLOW)?,
            average: p.average("average", MovingAverage::default())?,
            enter: p.polarity("enter", Polarity::Above)?,
            exit: p.polarity("exit", Polarity::Below)?,
        }),
        RuleKind::RsiThreshold => {
            let low = p.threshold("low", DEFAULT_RSI_LOW)?;
            let high = p.threshold("high", DEFAULT_RSI_HIGH)?;
            if low >= high {
                return Err(p.invalid("low", format!("low ({low}) must be below high ({high})")));
            }
            Ok(Rule::RsiThreshold {
                period: p.period("period", DEFAULT_RSI_PERIOD)?,
                low,
                high,
                enter: p.polarity("enter", Polarity::Above)?,
                exit: p.polarity("exit", Polarity::Above)?,
            })
        }
        RuleKind::MacdCross => Ok(Rule::MacdCross {
            fast: p.period("fast", macd::DEFAULT_FAST)?,
            slow: p.period("slow", macd::DEFAULT_SLOW)?,
            signal: p.period("signal", macd::DEFAULT_SIGNAL)?,
            enter: p.polarity("enter", Polarity::Above)?,
            exit: p.polarity("exit", Polarity::Below)?,
        }),
    }
}

/// Parameter lookup for one rule: `params` first, then the rule object itself.
struct Params<'a> {
    index: usize,
    params: Option<&'a Map<String, Value>>,
    inline: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.params
            .and_then(|p| present(p.get(name)))
            .or_else(|| present(self.inline.get(name)))
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidParameter {
            index: self.index,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    fn number(&self, name: &str) -> Result<Option<f64>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => coerce_number(value)
                .map(Some)
                .ok_or_else(|| self.invalid(name, format!("expected a number, got {}", value))),
        }
    }

    fn period(&self, name: &str, default: usize) -> Result<usize, ValidationError> {
        let Some(value) = self.number(name)? else {
            return Ok(default);
        };
        if value <= 0.0 {
            return Err(self.invalid(name, format!("period must be positive, got {}", value)));
        }
        if value.fract() != 0.0 {
            return Err(self.invalid(name, format!("period must be an integer, got {}", value)));
        }
        if value > MAX_PERIOD {
            return Err(self.invalid(name, format!("period {} exceeds {}", value, MAX_PERIOD)));
        }
        Ok(value as usize)
    }

    fn threshold(&self, name: &str, default: f64) -> Result<f64, ValidationError> {
        let value = self.number(name)?.unwrap_or(default);
        if !(0.0..=100.0).contains(&value) {
            return Err(self.invalid(name, format!("threshold must be within 0..=100, got {}", value)));
        }
        Ok(value)
    }

    fn polarity(&self, name: &str, default: Polarity) -> Result<Polarity, ValidationError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let text = value.as_str().map(|s| s.trim().to_lowercase().replace('-', "_"));
        match text.as_deref() {
            Some("above" | "price_above" | "cross_above" | "up") => Ok(Polarity::Above),
            Some("below" | "price_below" | "cross_below" | "down") => Ok(Polarity::Below),
            _ => Err(self.invalid(name, format!("expected 'above' or 'below', got {}", value))),
        }
    }

    fn average(&self, name: &str, default: MovingAverage) -> Result<MovingAverage, ValidationError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("sma" | "simple") => Ok(MovingAverage::Sma),
            Some("ema" | "exponential") => Ok(MovingAverage::Ema),
            _ => Err(self.invalid(name, format!("expected 'sma' or 'ema', got {}", value))),
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
