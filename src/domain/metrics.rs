//! Equity curve and summary statistics.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::Trade;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EQUITY_BASE: f64 = 100.0;

/// One point of the cumulative return index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    /// The bar's price move accrued to the strategy (long since the prior close).
    pub in_position: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_return_pct: f64,
    pub trades: usize,
    pub win_rate_pct: f64,
    pub avg_trade_pct: f64,
}

impl Stats {
    pub fn empty() -> Self {
        Stats {
            total_return_pct: 0.0,
            trades: 0,
            win_rate_pct: 0.0,
            avg_trade_pct: 0.0,
        }
    }

    /// Fold closed trades and the equity curve into summary figures.
    pub fn compute(trades: &[Trade], equity: &[EquityPoint], base: f64) -> Self {
        let final_equity = equity.last().map(|p| p.equity).unwrap_or(base);
        let total_return_pct = if base > 0.0 {
            (final_equity / base - 1.0) * 100.0
        } else {
            0.0
        };

        let (win_rate_pct, avg_trade_pct) = if trades.is_empty() {
            (0.0, 0.0)
        } else {
            let count = trades.len() as f64;
            let wins = trades.iter().filter(|t| t.return_pct > 0.0).count() as f64;
            let sum: f64 = trades.iter().map(|t| t.return_pct).sum();
            (wins / count * 100.0, sum / count)
        };

        Stats {
            total_return_pct,
            trades: trades.len(),
            win_rate_pct,
            avg_trade_pct,
        }
    }
}

/// Build the equity index.
///
/// `exposure[i]` is true when a position was open at the close of bar `i - 1`,
/// so bar `i`'s move `close[i] / close[i - 1]` compounds into the index. Flat
/// bars carry the index forward. The first point is always `base`.
pub fn equity_curve(bars: &[OhlcvBar], exposure: &[bool], base: f64) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(bars.len());
    let mut equity = base;

    for (i, bar) in bars.iter().enumerate() {
        let held = i > 0 && exposure.get(i).copied().unwrap_or(false);
        if held {
            let prev_close = bars[i - 1].close;
            if prev_close > 0.0 && bar.close.is_finite() {
                equity *= bar.close / prev_close;
            }
        }
        curve.push(EquityPoint {
            date: bar.date,
            equity,
            in_position: held,
        });
    }

    curve
}

/// Largest peak-to-trough decline of the curve, in percent.
pub fn max_drawdown_pct(equity: &[EquityPoint]) -> f64 {
    let mut peak = match equity.first() {
        Some(p) => p.equity,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;

    for point in equity {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak * 100.0);
        }
    }

    max_dd
}
