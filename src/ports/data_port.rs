//! Data access port trait.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code`, sorted ascending by date with unique dates, restricted
    /// to the inclusive `[start, end]` window when bounds are given.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RuletraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, RuletraderError>;
}
