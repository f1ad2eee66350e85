//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), defined once both EMAs are defined
//! Signal Line = EMA(signal) of MACD Line, undefined line values fed in as 0.0
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: max(max(fast, slow) - 1, signal - 1) for signal and histogram.

use crate::domain::indicator::ema::ema_raw_values;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, MacdSeries};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let n = prices.len();

    if fast == 0 || slow == 0 || signal_period == 0 {
        return MacdSeries {
            line: IndicatorSeries::undefined(indicator_type, n),
            signal: IndicatorSeries::undefined(indicator_type, n),
            histogram: IndicatorSeries::undefined(indicator_type, n),
        };
    }

    let ema_fast = ema_raw_values(prices, fast);
    let ema_slow = ema_raw_values(prices, slow);
    let line_warmup = fast.max(slow) - 1;

    let line: Vec<Option<f64>> = (0..n)
        .map(|i| (i >= line_warmup).then(|| ema_fast[i] - ema_slow[i]))
        .collect();

    let signal_input: Vec<f64> = line.iter().map(|v| v.unwrap_or(0.0)).collect();
    let signal_raw = ema_raw_values(&signal_input, signal_period);
    let signal_warmup = line_warmup.max(signal_period - 1);

    let signal: Vec<Option<f64>> = (0..n)
        .map(|i| (i >= signal_warmup).then_some(signal_raw[i]))
        .collect();

    let histogram: Vec<Option<f64>> = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdSeries {
        line: IndicatorSeries {
            indicator_type,
            values: line,
        },
        signal: IndicatorSeries {
            indicator_type,
            values: signal,
        },
        histogram: IndicatorSeries {
            indicator_type,
            values: histogram,
        },
    }
}
