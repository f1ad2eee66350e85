//! Position tracking: the flat/long state machine and the trade log it emits.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happens when an exit and an enter signal fire on the same bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Close, then open a fresh position at the same close.
    #[default]
    SameBar,
    /// Close and stay flat until at least the next bar.
    NextBar,
}

/// What happens to a position still open on the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfSeriesPolicy {
    /// Leave it open: it shows up in the equity curve but not in the trade log.
    #[default]
    MarkToMarket,
    /// Close it at the final close as a regular trade.
    Liquidate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Long {
        entry_index: usize,
        entry_date: NaiveDate,
        entry_price: f64,
    },
}

/// A closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub return_pct: f64,
    pub bars_held: usize,
}

/// A position still open when the series ends, valued at the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub unrealized_pct: f64,
    pub bars_held: usize,
}

/// `(exit - entry) / entry * 100`, or 0 for a non-positive entry price.
pub fn return_pct(entry_price: f64, exit_price: f64) -> f64 {
    if entry_price > 0.0 {
        (exit_price - entry_price) / entry_price * 100.0
    } else {
        0.0
    }
}

/// Long-only, single-position state machine.
///
/// Feed bars in order through [`PositionMachine::step`]. Exit is evaluated
/// before enter on every bar; enter signals are ignored while long.
#[derive(Debug, Clone)]
pub struct PositionMachine {
    state: PositionState,
    reentry: ReentryPolicy,
    trades: Vec<Trade>,
}

impl PositionMachine {
    pub fn new(reentry: ReentryPolicy) -> Self {
        Self {
            state: PositionState::Flat,
            reentry,
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_long(&self) -> bool {
        matches!(self.state, PositionState::Long { .. })
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Process one bar. Returns the trade closed on this bar, if any.
    pub fn step(&mut self, index: usize, bar: &OhlcvBar, enter: bool, exit: bool) -> Option<Trade> {
        let closed = if exit && self.is_long() {
            self.close(index, bar)
        } else {
            None
        };

        let may_enter = closed.is_none() || self.reentry == ReentryPolicy::SameBar;
        if enter && may_enter && !self.is_long() {
            debug!(date = %bar.date, price = bar.close, "open long");
            self.state = PositionState::Long {
                entry_index: index,
                entry_date: bar.date,
                entry_price: bar.close,
            };
        }

        closed
    }

    /// Close any open position at `bar`, regardless of signals.
    ///
    /// A position opened on this same bar never carried exposure, so it is
    /// dropped without recording a trade.
    pub fn liquidate(&mut self, index: usize, bar: &OhlcvBar) -> Option<Trade> {
        if matches!(self.state, PositionState::Long { entry_index, .. } if entry_index == index) {
            debug!(date = %bar.date, "discard long opened on final bar");
            self.state = PositionState::Flat;
            return None;
        }
        self.close(index, bar)
    }

    /// The open position valued at `bar`, if long.
    pub fn open_position(&self, index: usize, bar: &OhlcvBar) -> Option<OpenPosition> {
        match self.state {
            PositionState::Long {
                entry_index,
                entry_date,
                entry_price,
            } => Some(OpenPosition {
                entry_date,
                entry_price,
                last_date: bar.date,
                last_price: bar.close,
                unrealized_pct: return_pct(entry_price, bar.close),
                bars_held: index.saturating_sub(entry_index),
            }),
            PositionState::Flat => None,
        }
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    fn close(&mut self, index: usize, bar: &OhlcvBar) -> Option<Trade> {
        let PositionState::Long {
            entry_index,
            entry_date,
            entry_price,
        } = self.state
        else {
            return None;
        };

        let trade = Trade {
            entry_date,
            entry_price,
            exit_date: bar.date,
            exit_price: bar.close,
            return_pct: return_pct(entry_price, bar.close),
            bars_held: index.saturating_sub(entry_index),
        };
        debug!(date = %bar.date, price = bar.close, return_pct = trade.return_pct, "close long");

        self.state = PositionState::Flat;
        self.trades.push(trade.clone());
        Some(trade)
    }
}
