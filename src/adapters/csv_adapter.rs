//! CSV file data adapter.
//!
//! One file per instrument: `<base_path>/<CODE>.csv` with header
//! `date,open,high,low,close,volume` and optional `vwap,transactions` columns.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RuletraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RuletraderError::NoData {
                code: code.to_string(),
            },
            _ => RuletraderError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.deserialize::<OhlcvBar>().enumerate() {
            // header is line 1
            let line = row + 2;
            let bar = result.map_err(|e| RuletraderError::Data {
                reason: format!("{}:{}: {}", path.display(), line, e),
            })?;

            if !bar.has_valid_prices() {
                return Err(RuletraderError::Data {
                    reason: format!(
                        "{}:{}: prices must be positive and finite",
                        path.display(),
                        line
                    ),
                });
            }

            if start_date.is_some_and(|start| bar.date < start)
                || end_date.is_some_and(|end| bar.date > end)
            {
                continue;
            }

            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        // keep the last row for a repeated date
        bars.reverse();
        bars.dedup_by_key(|b| b.date);
        bars.reverse();
        if bars.len() != before {
            warn!(code, dropped = before - bars.len(), "duplicate dates dropped");
        }

        debug!(code, bars = bars.len(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RuletraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RuletraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| RuletraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("CBA.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fetch_ohlcv_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP", None, None).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(2024, 1, 15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[0].vwap, None);
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_ohlcv("BHP", Some(date(2024, 1, 16)), Some(date(2024, 1, 16)))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(2024, 1, 16));

        let bars = adapter.fetch_ohlcv("BHP", Some(date(2024, 1, 16)), None).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn fetch_ohlcv_missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_ohlcv("XYZ", None, None);
        assert!(matches!(result, Err(RuletraderError::NoData { code }) if code == "XYZ"));
    }

    #[test]
    fn fetch_ohlcv_sorts_and_dedups() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("MSFT.csv"),
            "date,open,high,low,close,volume,vwap,transactions\n\
             2024-01-03,3,3,3,3,10,,\n\
             2024-01-01,1,1,1,1,10,1.1,7\n\
             2024-01-03,4,4,4,4,10,,\n\
             2024-01-02,2,2,2,2,10,,\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let bars = adapter.fetch_ohlcv("MSFT", None, None).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 4.0]);
        assert_eq!(bars[0].vwap, Some(1.1));
        assert_eq!(bars[0].transactions, Some(7));
        assert_eq!(bars[1].vwap, None);
    }

    #[test]
    fn fetch_ohlcv_rejects_bad_prices() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-01,1,1,1,0,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let result = adapter.fetch_ohlcv("BAD", None, None);
        assert!(matches!(result, Err(RuletraderError::Data { .. })));
    }

    #[test]
    fn fetch_ohlcv_rejects_malformed_rows() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,volume\nnot-a-date,1,1,1,1,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_ohlcv("BAD", None, None).unwrap_err();
        assert!(err.to_string().contains(":2:"), "{err}");
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["BHP", "CBA"]);
    }

    #[test]
    fn list_symbols_missing_dir() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/ruletrader/data"));
        assert!(adapter.list_symbols().is_err());
    }
}
