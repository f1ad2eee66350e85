//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 50 when avg_gain is also 0 (no movement).
//!
//! Warmup: first n values are undefined (n price changes are needed for the
//! initial average, and index 0 has no prior change at all).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_rsi(prices: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 || prices.len() <= period {
        return IndicatorSeries::undefined(indicator_type, prices.len());
    }

    let mut values = vec![None; prices.len()];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..=period {
        let (gain, loss) = split_change(prices[i] - prices[i - 1]);
        avg_gain += gain;
        avg_loss += loss;
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    values[period] = Some(rsi_value(avg_gain, avg_loss));

    let n = period as f64;
    for i in (period + 1)..prices.len() {
        let (gain, loss) = split_change(prices[i] - prices[i - 1]);
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        values[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn split_change(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, -change)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
