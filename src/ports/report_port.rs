//! Report generation port trait.

use crate::domain::backtest::CodeResult;
use crate::domain::error::RuletraderError;
use crate::domain::strategy::Strategy;
use std::path::Path;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        results: &[CodeResult],
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), RuletraderError>;
}
