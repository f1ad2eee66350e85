#![allow(dead_code)]

use chrono::NaiveDate;
use ruletrader::domain::error::RuletraderError;
pub use ruletrader::domain::ohlcv::OhlcvBar;
use ruletrader::domain::rule::{MovingAverage, Polarity, Rule};
use ruletrader::domain::strategy::{Combine, Strategy};
use ruletrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RuletraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RuletraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(code).ok_or_else(|| RuletraderError::NoData {
            code: code.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RuletraderError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars starting 2024-01-01 with open/high/low equal to the close.
pub fn bars_from(prices: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
            vwap: None,
            transactions: None,
        })
        .collect()
}

pub fn ma_cross_strategy(fast: usize, slow: usize) -> Strategy {
    Strategy {
        name: format!("MA {}/{}", fast, slow),
        rules: vec![Rule::MaCross {
            fast,
            slow,
            average: MovingAverage::Sma,
            enter: Polarity::Above,
            exit: Polarity::Below,
        }],
        combine: Combine::All,
    }
}

pub fn rsi_strategy(period: usize) -> Strategy {
    Strategy {
        name: format!("RSI {}", period),
        rules: vec![Rule::RsiThreshold {
            period,
            low: 30.0,
            high: 70.0,
            enter: Polarity::Above,
            exit: Polarity::Above,
        }],
        combine: Combine::All,
    }
}

pub fn macd_strategy() -> Strategy {
    Strategy {
        name: "MACD 3/6/3".into(),
        rules: vec![Rule::MacdCross {
            fast: 3,
            slow: 6,
            signal: 3,
            enter: Polarity::Above,
            exit: Polarity::Below,
        }],
        combine: Combine::All,
    }
}

/// Zig-zag series that produces repeated crosses for short averages.
pub fn zigzag(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let phase = (i % 12) as f64;
            let swing = if phase < 6.0 { phase } else { 12.0 - phase };
            100.0 + 4.0 * swing + 0.1 * i as f64
        })
        .collect()
}

pub fn write_csv(dir: &Path, code: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        writeln!(
            content,
            "{},{},{},{},{},{}",
            b.date, b.open, b.high, b.low, b.close, b.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{}.csv", code)), content).unwrap();
}
