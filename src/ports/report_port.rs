//! Report generation port trait.

use crate::domain::backtest::SimulationResult;
use crate::domain::error::RuletraderError;
use std::path::Path;

/// Port for writing simulation reports.
pub trait ReportPort {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), RuletraderError>;
}
