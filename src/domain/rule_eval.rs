//! Rule evaluation engine.
//!
//! Turns a rule plus a price series into per-bar enter/exit signals.
//!
//! # Evaluation Semantics
//!
//! - A cross compares the previous and current bar: `Above` fires on
//!   `prev_left <= prev_right && curr_left > curr_right`, `Below` on the mirror
//! - Index 0 never fires (no previous bar)
//! - Any undefined operand on either bar makes the cross `false`, so nothing
//!   fires inside an indicator's warm-up window
//! - Multi-rule strategies merge per-rule signals with the strategy's `Combine`

use crate::domain::indicator::{
    IndicatorSeries, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
};
use crate::domain::rule::{MovingAverage, Polarity, Rule};
use crate::domain::strategy::Strategy;
use tracing::trace;

/// Per-bar enter/exit flags aligned with the input bars.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signals {
    pub enter: Vec<bool>,
    pub exit: Vec<bool>,
}

impl Signals {
    pub fn none(len: usize) -> Self {
        Self {
            enter: vec![false; len],
            exit: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.enter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enter.is_empty()
    }
}

/// One side of a cross comparison.
#[derive(Debug, Clone, Copy)]
enum Operand<'a> {
    Series(&'a IndicatorSeries),
    Constant(f64),
}

impl Operand<'_> {
    fn at(&self, index: usize) -> Option<f64> {
        match self {
            Operand::Series(series) => series.get(index),
            Operand::Constant(v) => Some(*v),
        }
    }
}

fn crossed(polarity: Polarity, left: Operand, right: Operand, bar_index: usize) -> bool {
    if bar_index == 0 {
        return false;
    }
    let (Some(left_prev), Some(left_curr), Some(right_prev), Some(right_curr)) = (
        left.at(bar_index - 1),
        left.at(bar_index),
        right.at(bar_index - 1),
        right.at(bar_index),
    ) else {
        return false;
    };

    match polarity {
        Polarity::Above => left_prev <= right_prev && left_curr > right_curr,
        Polarity::Below => left_prev >= right_prev && left_curr < right_curr,
    }
}

fn cross_signals(
    len: usize,
    enter: (Polarity, Operand, Operand),
    exit: (Polarity, Operand, Operand),
) -> Signals {
    Signals {
        enter: (0..len)
            .map(|i| crossed(enter.0, enter.1, enter.2, i))
            .collect(),
        exit: (0..len).map(|i| crossed(exit.0, exit.1, exit.2, i)).collect(),
    }
}

/// Evaluate a single rule over `prices`.
pub fn evaluate_rule(rule: &Rule, prices: &[f64]) -> Signals {
    let len = prices.len();
    trace!(%rule, bars = len, "evaluating rule");

    match *rule {
        Rule::MaCross {
            fast,
            slow,
            average,
            enter,
            exit,
        } => {
            let moving_average = |period| match average {
                MovingAverage::Sma => calculate_sma(prices, period),
                MovingAverage::Ema => calculate_ema(prices, period),
            };
            let fast_line = moving_average(fast);
            let slow_line = moving_average(slow);
            let (f, s) = (Operand::Series(&fast_line), Operand::Series(&slow_line));
            cross_signals(len, (enter, f, s), (exit, f, s))
        }
        Rule::RsiThreshold {
            period,
            low,
            high,
            enter,
            exit,
        } => {
            let rsi = calculate_rsi(prices, period);
            let r = Operand::Series(&rsi);
            cross_signals(
                len,
                (enter, r, Operand::Constant(low)),
                (exit, r, Operand::Constant(high)),
            )
        }
        Rule::MacdCross {
            fast,
            slow,
            signal,
            enter,
            exit,
        } => {
            let macd = calculate_macd(prices, fast, slow, signal);
            let (l, s) = (Operand::Series(&macd.line), Operand::Series(&macd.signal));
            cross_signals(len, (enter, l, s), (exit, l, s))
        }
    }
}

/// Evaluate every rule of `strategy` and merge the results.
pub fn evaluate_strategy(strategy: &Strategy, prices: &[f64]) -> Signals {
    let per_rule: Vec<Signals> = strategy
        .rules
        .iter()
        .map(|rule| evaluate_rule(rule, prices))
        .collect();

    if per_rule.is_empty() {
        return Signals::none(prices.len());
    }

    let combine = strategy.combine;
    Signals {
        enter: (0..prices.len())
            .map(|i| combine.merge(per_rule.iter().map(|s| s.enter[i])))
            .collect(),
        exit: (0..prices.len())
            .map(|i| combine.merge(per_rule.iter().map(|s| s.exit[i])))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorType;
    use crate::domain::strategy::Combine;

    fn series(values: Vec<Option<f64>>) -> IndicatorSeries {
        IndicatorSeries {
            indicator_type: IndicatorType::Sma(1),
            values,
        }
    }

    fn ma_rule(fast: usize, slow: usize) -> Rule {
        Rule::MaCross {
            fast,
            slow,
            average: MovingAverage::Sma,
            enter: Polarity::Above,
            exit: Polarity::Below,
        }
    }

    #[test]
    fn cross_above_requires_at_or_below_then_above() {
        let left = series(vec![Some(1.0), Some(2.0), Some(3.0)]);
        let right = series(vec![Some(2.0), Some(2.0), Some(2.0)]);
        let (l, r) = (Operand::Series(&left), Operand::Series(&right));

        assert!(!crossed(Polarity::Above, l, r, 0));
        // 1 <= 2 then 2 > 2 is false
        assert!(!crossed(Polarity::Above, l, r, 1));
        // 2 <= 2 then 3 > 2
        assert!(crossed(Polarity::Above, l, r, 2));
    }

    #[test]
    fn cross_below_mirror() {
        let left = series(vec![Some(3.0), Some(2.0), Some(1.0)]);
        let r = Operand::Constant(2.0);
        let l = Operand::Series(&left);

        assert!(!crossed(Polarity::Below, l, r, 1));
        assert!(crossed(Polarity::Below, l, r, 2));
        assert!(!crossed(Polarity::Above, l, r, 2));
    }

    #[test]
    fn cross_false_when_undefined() {
        let left = series(vec![None, Some(3.0)]);
        let right = series(vec![Some(2.0), Some(2.0)]);
        assert!(!crossed(
            Polarity::Above,
            Operand::Series(&left),
            Operand::Series(&right),
            1
        ));
    }

    #[test]
    fn ma_cross_signals() {
        // SMA(1) is price itself, SMA(2) lags by half a step
        let prices = [10.0, 9.0, 8.0, 12.0, 13.0, 7.0];
        let signals = evaluate_rule(&ma_rule(1, 2), &prices);

        assert_eq!(signals.len(), prices.len());
        assert_eq!(signals.enter, vec![false, false, false, true, false, false]);
        assert_eq!(signals.exit, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn no_signals_inside_warmup() {
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 10.0 } else { 20.0 }).collect();
        let signals = evaluate_rule(&ma_rule(10, 30), &prices);
        assert!(signals.enter.iter().all(|s| !s));
        assert!(signals.exit.iter().all(|s| !s));
    }

    #[test]
    fn rsi_threshold_signals() {
        // falls hard into oversold, recovers, then rallies into overbought
        let mut prices: Vec<f64> = (0..6).map(|i| 100.0 - 5.0 * i as f64).collect();
        prices.extend([80.0, 90.0, 100.0, 110.0, 120.0]);
        let rule = Rule::RsiThreshold {
            period: 3,
            low: 30.0,
            high: 70.0,
            enter: Polarity::Above,
            exit: Polarity::Above,
        };
        let signals = evaluate_rule(&rule, &prices);

        let first_enter = signals.enter.iter().position(|s| *s).unwrap();
        let first_exit = signals.exit.iter().position(|s| *s).unwrap();
        assert_eq!(first_enter, 6);
        assert!(first_exit > first_enter);
    }

    #[test]
    fn macd_cross_signals_on_reversal() {
        let mut prices: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        prices.extend((0..30).map(|i| 70.0 + 2.0 * i as f64));
        let rule = Rule::MacdCross {
            fast: 3,
            slow: 6,
            signal: 3,
            enter: Polarity::Above,
            exit: Polarity::Below,
        };
        let signals = evaluate_rule(&rule, &prices);
        let enter = signals.enter.iter().position(|s| *s).unwrap();
        assert!(enter >= 30, "bullish cross after the turn, got {}", enter);
    }

    #[test]
    fn strategy_combine_modes() {
        let prices = [10.0, 9.0, 8.0, 12.0, 13.0, 7.0];
        let never = Rule::RsiThreshold {
            period: 50,
            low: 30.0,
            high: 70.0,
            enter: Polarity::Above,
            exit: Polarity::Above,
        };
        let mut strategy = Strategy {
            name: "t".into(),
            rules: vec![ma_rule(1, 2), never],
            combine: Combine::All,
        };
        let all = evaluate_strategy(&strategy, &prices);
        assert!(all.enter.iter().all(|s| !s));

        strategy.combine = Combine::Any;
        let any = evaluate_strategy(&strategy, &prices);
        assert_eq!(any, evaluate_rule(&ma_rule(1, 2), &prices));
    }

    #[test]
    fn empty_prices() {
        let signals = evaluate_rule(&ma_rule(10, 30), &[]);
        assert!(signals.is_empty());
    }
}
