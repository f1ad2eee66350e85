//! Rule data structures.
//!
//! A `Rule` is one of a closed set of indicator patterns. Each variant carries
//! its periods/thresholds plus the polarity used for the enter and the exit
//! condition. Rules are only built by the normalizer, so the parameters held
//! here are already validated.

use crate::domain::indicator::IndicatorType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a cross.
///
/// `Above` fires when the left series moves from at-or-below to strictly
/// above the right series; `Below` is the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Above,
    Below,
}

/// Moving average flavour used by `Rule::MaCross`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverage {
    #[default]
    Sma,
    Ema,
}

impl MovingAverage {
    pub fn indicator(self, period: usize) -> IndicatorType {
        match self {
            MovingAverage::Sma => IndicatorType::Sma(period),
            MovingAverage::Ema => IndicatorType::Ema(period),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Fast moving average crossing the slow one.
    MaCross {
        fast: usize,
        slow: usize,
        average: MovingAverage,
        enter: Polarity,
        exit: Polarity,
    },
    /// RSI crossing the low threshold (enter) or the high threshold (exit).
    RsiThreshold {
        period: usize,
        low: f64,
        high: f64,
        enter: Polarity,
        exit: Polarity,
    },
    /// MACD line crossing its signal line.
    MacdCross {
        fast: usize,
        slow: usize,
        signal: usize,
        enter: Polarity,
        exit: Polarity,
    },
}

impl Rule {
    /// Indicators this rule reads.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        match *self {
            Rule::MaCross {
                fast,
                slow,
                average,
                ..
            } => vec![average.indicator(fast), average.indicator(slow)],
            Rule::RsiThreshold { period, .. } => vec![IndicatorType::Rsi(period)],
            Rule::MacdCross {
                fast, slow, signal, ..
            } => vec![IndicatorType::Macd { fast, slow, signal }],
        }
    }

    /// Number of leading bars on which this rule can never fire.
    ///
    /// A cross needs the previous bar defined too, hence the `+ 1`.
    pub fn warmup(&self) -> usize {
        self.indicators()
            .iter()
            .map(IndicatorType::warmup)
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rule::MaCross { .. } => "ma_cross",
            Rule::RsiThreshold { .. } => "rsi_threshold",
            Rule::MacdCross { .. } => "macd_cross",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Above => write!(f, "above"),
            Polarity::Below => write!(f, "below"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MaCross {
                fast,
                slow,
                average,
                enter,
                exit,
            } => write!(
                f,
                "{} x {} (enter {}, exit {})",
                average.indicator(*fast),
                average.indicator(*slow),
                enter,
                exit
            ),
            Rule::RsiThreshold {
                period,
                low,
                high,
                enter,
                exit,
            } => write!(
                f,
                "{} enter {} {}, exit {} {}",
                IndicatorType::Rsi(*period),
                enter,
                low,
                exit,
                high
            ),
            Rule::MacdCross {
                fast,
                slow,
                signal,
                enter,
                exit,
            } => write!(
                f,
                "{} line x signal (enter {}, exit {})",
                IndicatorType::Macd {
                    fast: *fast,
                    slow: *slow,
                    signal: *signal
                },
                enter,
                exit
            ),
        }
    }
}
