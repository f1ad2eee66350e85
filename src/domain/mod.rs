//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod normalizer;
pub mod ohlcv;
pub mod position;
pub mod rule;
pub mod rule_eval;
pub mod strategy;
