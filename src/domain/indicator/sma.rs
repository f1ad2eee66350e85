//! Simple Moving Average indicator.
//!
//! Running window sum: the value entering the window is added and the value
//! leaving it is subtracted, so the whole series costs O(n).
//! Warmup: first (n-1) values are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_sma(prices: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma(period);
    if period == 0 || prices.len() < period {
        return IndicatorSeries::undefined(indicator_type, prices.len());
    }

    let mut values = Vec::with_capacity(prices.len());
    let mut sum = 0.0;

    for (i, &price) in prices.iter().enumerate() {
        sum += price;
        if i >= period {
            sum -= prices[i - period];
        }
        if i + 1 >= period {
            values.push(Some(sum / period as f64));
        } else {
            values.push(None);
        }
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
