//! Technical indicator implementations.
//!
//! Every indicator maps a price slice to a series of the same length. Values
//! inside the warm-up window are `None`, so a comparison against undefined
//! data cannot silently succeed.
//!
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a single-valued series (SMA, EMA, RSI)
//! - `MacdSeries`: the three aligned MACD series

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    /// Index of the first bar at which the indicator is defined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(period) | IndicatorType::Ema(period) => period.saturating_sub(1),
            IndicatorType::Rsi(period) => period,
            IndicatorType::Macd { fast, slow, signal } => {
                (fast.max(slow).saturating_sub(1)).max(signal.saturating_sub(1))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// A series of `len` undefined values.
    pub fn undefined(indicator_type: IndicatorType, len: usize) -> Self {
        Self {
            indicator_type,
            values: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, `None` when undefined or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}
