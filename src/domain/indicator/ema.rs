//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first raw price (no SMA seed), then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! The recursion runs from index 0 but the first (n-1) values are reported
//! as undefined so EMA and SMA line up over the same warm-up window.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_ema(prices: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema(period);
    if period == 0 {
        return IndicatorSeries::undefined(indicator_type, prices.len());
    }

    let values = ema_raw_values(prices, period)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i + 1 >= period).then_some(v))
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// The unmasked EMA recursion, defined from index 0.
pub(crate) fn ema_raw_values(prices: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(prices.len());
    let mut ema = 0.0;

    for (i, &price) in prices.iter().enumerate() {
        ema = if i == 0 {
            price
        } else {
            price * k + ema * (1.0 - k)
        };
        values.push(ema);
    }

    values
}
