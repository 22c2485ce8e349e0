//! CSV file data adapter.
//!
//! Candle files carry a header row; the `open`, `close`, `high` and `low`
//! columns are located by name and any other columns (date, volume) are
//! ignored. Rulebook files are plain numbers separated by commas and/or
//! newlines, with `#` comment lines.

use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use crate::domain::rulebook::Rulebook;
use crate::ports::data_port::DataPort;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct CsvAdapter {
    candles_path: PathBuf,
    rulebook_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(candles_path: PathBuf, rulebook_path: PathBuf) -> Self {
        Self {
            candles_path,
            rulebook_path,
        }
    }

    pub fn candles_path(&self) -> &Path {
        &self.candles_path
    }

    pub fn rulebook_path(&self) -> &Path {
        &self.rulebook_path
    }
}

fn data_error(path: &Path, e: impl std::fmt::Display) -> RuletraderError {
    RuletraderError::Data {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn parse_field(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, String> {
    let raw = record
        .get(index)
        .ok_or_else(|| format!("line {line}: missing {name} column"))?;
    raw.parse()
        .map_err(|e| format!("line {line}: invalid {name} value {raw:?}: {e}"))
}

pub fn read_candles(path: &Path) -> Result<Vec<Candle>, RuletraderError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| data_error(path, e))?;

    let headers = rdr.headers().map_err(|e| data_error(path, e))?.clone();
    let mut columns = [0usize; 4];
    for (slot, name) in ["open", "close", "high", "low"].iter().enumerate() {
        columns[slot] = column_index(&headers, name)
            .ok_or_else(|| data_error(path, format!("missing {name} column")))?;
    }

    let mut candles = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| data_error(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let [open, close, high, low] = columns;
        candles.push(Candle {
            open: parse_field(&record, open, "open", line).map_err(|e| data_error(path, e))?,
            close: parse_field(&record, close, "close", line).map_err(|e| data_error(path, e))?,
            high: parse_field(&record, high, "high", line).map_err(|e| data_error(path, e))?,
            low: parse_field(&record, low, "low", line).map_err(|e| data_error(path, e))?,
        });
    }

    debug!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

pub fn read_flat_rulebook(path: &Path) -> Result<Vec<f64>, RuletraderError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| data_error(path, e))?;

    let mut values = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| data_error(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        for field in record.iter().filter(|f| !f.is_empty()) {
            let value: f64 = field.parse().map_err(|e| {
                data_error(path, format!("line {line}: invalid coefficient {field:?}: {e}"))
            })?;
            values.push(value);
        }
    }

    if values.is_empty() {
        warn!(path = %path.display(), "rulebook file has no coefficients");
    }
    Ok(values)
}

/// Write a flat rulebook, one rule per line.
pub fn write_flat_rulebook(path: &Path, rulebook: &Rulebook) -> Result<(), RuletraderError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| data_error(path, e))?;
    let flat = rulebook.to_flat();
    let length = flat.len() / rulebook.rule_count().max(1);
    for rule in flat.chunks(length.max(1)) {
        wtr.write_record(rule.iter().map(|v| v.to_string()))
            .map_err(|e| data_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

impl DataPort for CsvAdapter {
    fn load_candles(&self) -> Result<Vec<Candle>, RuletraderError> {
        read_candles(&self.candles_path)
    }

    fn load_rulebook(&self, window: usize, rule_count: usize) -> Result<Rulebook, RuletraderError> {
        let flat = read_flat_rulebook(&self.rulebook_path)?;
        Ok(Rulebook::from_flat(&flat, window, rule_count)?)
    }
}
