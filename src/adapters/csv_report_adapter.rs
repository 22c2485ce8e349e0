//! Per-step trace report written as CSV.

use crate::domain::backtest::{SimulationResult, StepRecord};
use crate::domain::error::RuletraderError;
use crate::domain::metrics::step_value;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct TraceRow {
    step: usize,
    close: f64,
    ema: f64,
    invested_proportion: f64,
    trade_proportion: f64,
    action: String,
    executed_proportion: f64,
    invested_units: f64,
    available_money: f64,
    value: f64,
}

impl From<&StepRecord> for TraceRow {
    fn from(step: &StepRecord) -> Self {
        TraceRow {
            step: step.index,
            close: step.close,
            ema: step.ema,
            invested_proportion: step.invested_proportion,
            trade_proportion: step.trade_proportion,
            action: step.action.to_string(),
            executed_proportion: step.action.proportion(),
            invested_units: step.invested_units,
            available_money: step.available_money,
            value: step_value(step),
        }
    }
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), RuletraderError> {
        let report_error = |e: csv::Error| RuletraderError::Report {
            reason: format!("{}: {}", output_path.display(), e),
        };
        let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
        for step in &result.trace {
            wtr.serialize(TraceRow::from(step)).map_err(report_error)?;
        }
        wtr.flush()?;
        info!(path = %output_path.display(), rows = result.trace.len(), "trace written");
        Ok(())
    }
}
