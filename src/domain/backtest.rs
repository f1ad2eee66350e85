//! Backtest engine and event loop.
//!
//! `run_backtest` is a pure function of the strategy, the bars and the
//! config: one forward pass over the bars, no shared state. `run_batch` fans
//! independent instruments out over the rayon thread pool.

use crate::domain::metrics::{self, DEFAULT_EQUITY_BASE, EquityPoint, Stats};
use crate::domain::ohlcv::{OhlcvBar, closes};
use crate::domain::position::{EndOfSeriesPolicy, OpenPosition, PositionMachine, ReentryPolicy, Trade};
use crate::domain::rule_eval::evaluate_strategy;
use crate::domain::strategy::Strategy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub equity_base: f64,
    pub reentry: ReentryPolicy,
    pub end_of_series: EndOfSeriesPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            equity_base: DEFAULT_EQUITY_BASE,
            reentry: ReentryPolicy::default(),
            end_of_series: EndOfSeriesPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub stats: Stats,
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_position: Option<OpenPosition>,
}

/// Result of one instrument in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeResult {
    pub code: String,
    pub result: BacktestResult,
}

pub fn run_backtest(strategy: &Strategy, bars: &[OhlcvBar], config: &BacktestConfig) -> BacktestResult {
    let prices = closes(bars);
    let warmup = strategy.warmup();
    debug!(
        strategy = %strategy.name,
        bars = bars.len(),
        warmup,
        "running backtest"
    );
    if bars.len() <= warmup {
        debug!(bars = bars.len(), warmup, "series shorter than warm-up, no signals possible");
    }

    let signals = evaluate_strategy(strategy, &prices);
    let mut machine = PositionMachine::new(config.reentry);
    let mut exposure = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        exposure.push(machine.is_long());
        machine.step(i, bar, signals.enter[i], signals.exit[i]);
    }

    let mut open_position = None;
    if let Some((last_index, last_bar)) = bars.iter().enumerate().last() {
        match config.end_of_series {
            EndOfSeriesPolicy::MarkToMarket => {
                open_position = machine.open_position(last_index, last_bar);
            }
            EndOfSeriesPolicy::Liquidate => {
                machine.liquidate(last_index, last_bar);
            }
        }
    }

    let trades = machine.into_trades();
    let equity = metrics::equity_curve(bars, &exposure, config.equity_base);
    let stats = Stats::compute(&trades, &equity, config.equity_base);

    BacktestResult {
        stats,
        trades,
        equity,
        open_position,
    }
}

/// Run one backtest per instrument concurrently. Results keep input order.
pub fn run_batch(
    strategy: &Strategy,
    series: &[(String, Vec<OhlcvBar>)],
    config: &BacktestConfig,
) -> Vec<CodeResult> {
    series
        .par_iter()
        .map(|(code, bars)| CodeResult {
            code: code.clone(),
            result: run_backtest(strategy, bars, config),
        })
        .collect()
}
