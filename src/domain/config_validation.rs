//! Configuration validation.
//!
//! Reads the `[backtest]` section into a validated [`BacktestConfig`] and
//! date window before any data is loaded.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RuletraderError;
use crate::domain::metrics::DEFAULT_EQUITY_BASE;
use crate::domain::position::{EndOfSeriesPolicy, ReentryPolicy};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const SECTION: &str = "backtest";

/// Inclusive date bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, RuletraderError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Err(invalid("start_date", "start_date must be before end_date"));
            }
        }
        Ok(Self { start, end })
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, RuletraderError> {
    Ok(BacktestConfig {
        equity_base: equity_base(config)?,
        reentry: reentry_policy(config)?,
        end_of_series: end_of_series_policy(config)?,
    })
}

pub fn build_date_window(config: &dyn ConfigPort) -> Result<DateWindow, RuletraderError> {
    let start = optional_date(config, "start_date")?;
    let end = optional_date(config, "end_date")?;
    DateWindow::new(start, end)
}

/// Parse a `YYYY-MM-DD` value for `key`.
pub fn parse_date(value: &str, key: &str) -> Result<NaiveDate, RuletraderError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(key, &format!("invalid {} format, expected YYYY-MM-DD", key)))
}

pub fn parse_reentry(value: &str) -> Result<ReentryPolicy, RuletraderError> {
    match value.trim().to_lowercase().as_str() {
        "same_bar" => Ok(ReentryPolicy::SameBar),
        "next_bar" => Ok(ReentryPolicy::NextBar),
        other => Err(invalid(
            "reentry",
            &format!("unknown reentry policy '{}', expected same_bar or next_bar", other),
        )),
    }
}

pub fn parse_end_of_series(value: &str) -> Result<EndOfSeriesPolicy, RuletraderError> {
    match value.trim().to_lowercase().as_str() {
        "mark_to_market" => Ok(EndOfSeriesPolicy::MarkToMarket),
        "liquidate" => Ok(EndOfSeriesPolicy::Liquidate),
        other => Err(invalid(
            "end_of_series",
            &format!(
                "unknown end_of_series policy '{}', expected mark_to_market or liquidate",
                other
            ),
        )),
    }
}

fn equity_base(config: &dyn ConfigPort) -> Result<f64, RuletraderError> {
    let Some(raw) = non_empty(config, "equity_base") else {
        return Ok(DEFAULT_EQUITY_BASE);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid("equity_base", "equity_base must be a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("equity_base", "equity_base must be positive"));
    }
    Ok(value)
}

fn reentry_policy(config: &dyn ConfigPort) -> Result<ReentryPolicy, RuletraderError> {
    non_empty(config, "reentry")
        .map(|v| parse_reentry(&v))
        .unwrap_or(Ok(ReentryPolicy::default()))
}

fn end_of_series_policy(config: &dyn ConfigPort) -> Result<EndOfSeriesPolicy, RuletraderError> {
    non_empty(config, "end_of_series")
        .map(|v| parse_end_of_series(&v))
        .unwrap_or(Ok(EndOfSeriesPolicy::default()))
}

fn optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, RuletraderError> {
    non_empty(config, key).map(|v| parse_date(&v, key)).transpose()
}

fn non_empty(config: &dyn ConfigPort, key: &str) -> Option<String> {
    config
        .get_string(SECTION, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(key: &str, reason: &str) -> RuletraderError {
    RuletraderError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
