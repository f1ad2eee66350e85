//! JSON report adapter implementing ReportPort.
//!
//! Output is a single pretty-printed document:
//! `{ "strategy": {...}, "results": [{ "code": ..., "result": {...} }] }`.
//! Serialization is deterministic, so identical runs produce identical bytes.

use crate::domain::backtest::CodeResult;
use crate::domain::error::RuletraderError;
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct Report<'a> {
    strategy: &'a Strategy,
    results: &'a [CodeResult],
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Render the report document, newline-terminated.
    pub fn render(
        &self,
        results: &[CodeResult],
        strategy: &Strategy,
    ) -> Result<String, RuletraderError> {
        let mut out = serde_json::to_string_pretty(&Report { strategy, results })?;
        out.push('\n');
        Ok(out)
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        results: &[CodeResult],
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), RuletraderError> {
        let document = self.render(results, strategy)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, document)?;
        info!(path = %output_path.display(), results = results.len(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run_backtest};
    use crate::domain::normalizer::parse_strategy;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample() -> (Vec<CodeResult>, Strategy) {
        let strategy =
            parse_strategy(r#"{"name":"cross","rules":[{"type":"ma_cross","fast":1,"slow":2}]}"#)
                .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<OhlcvBar> = [10.0, 9.0, 8.0, 12.0, 13.0, 7.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100,
                vwap: None,
                transactions: None,
            })
            .collect();
        let result = run_backtest(&strategy, &bars, &BacktestConfig::default());
        (
            vec![CodeResult {
                code: "AAA".into(),
                result,
            }],
            strategy,
        )
    }

    #[test]
    fn writes_report_document() {
        let (results, strategy) = sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");

        JsonReportAdapter::new()
            .write(&results, &strategy, &path)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["strategy"]["name"], "cross");
        assert_eq!(json["strategy"]["rules"][0]["type"], "ma_cross");
        assert_eq!(json["results"][0]["code"], "AAA");
        assert_eq!(json["results"][0]["result"]["stats"]["trades"], 1);
        assert_eq!(json["results"][0]["result"]["equity"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn render_is_deterministic() {
        let (results, strategy) = sample();
        let adapter = JsonReportAdapter::new();
        let a = adapter.render(&results, &strategy).unwrap();
        let b = adapter.render(&results, &strategy).unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with('\n'));
    }

    #[test]
    fn write_to_missing_dir_root_fails() {
        let (results, strategy) = sample();
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let result = JsonReportAdapter::new().write(&results, &strategy, &blocker.join("report.json"));
        assert!(matches!(result, Err(RuletraderError::Io(_))));
    }
}
