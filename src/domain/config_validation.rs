//! Configuration validation.
//!
//! Validates all config fields before any data is loaded.

use crate::domain::backtest::SimulationConfig;
use crate::domain::error::RuletraderError;
use crate::domain::portfolio::Portfolio;
use crate::ports::config_port::ConfigPort;

pub const SIMULATION: &str = "simulation";
pub const DATA: &str = "data";
pub const REPORT: &str = "report";

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let window = require_positive_int(config, "candlesticks_per_rule")?;
    require_positive_int(config, "rule_count")?;
    let ema_width = require_positive_int(config, "ema_width")?;
    if ema_width < window {
        return Err(RuletraderError::ConfigInvalid {
            section: SIMULATION.to_string(),
            key: "ema_width".to_string(),
            reason: "ema_width must be at least candlesticks_per_rule".to_string(),
        });
    }
    validate_holding(config, "invested_units")?;
    validate_holding(config, "available_money")?;
    Ok(())
}

/// Paths may come from the CLI instead, so only present values are checked.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    for key in ["candles", "rulebook"] {
        if let Some(s) = config.get_string(DATA, key) {
            if s.trim().is_empty() {
                return Err(RuletraderError::ConfigInvalid {
                    section: DATA.to_string(),
                    key: key.to_string(),
                    reason: "path must not be empty".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn require_positive_int(config: &dyn ConfigPort, key: &str) -> Result<usize, RuletraderError> {
    let raw = config
        .get_string(SIMULATION, key)
        .ok_or_else(|| RuletraderError::ConfigMissing {
            section: SIMULATION.to_string(),
            key: key.to_string(),
        })?;
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(RuletraderError::ConfigInvalid {
            section: SIMULATION.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a positive integer"),
        }),
    }
}

fn validate_holding(config: &dyn ConfigPort, key: &str) -> Result<(), RuletraderError> {
    let Some(raw) = config.get_string(SIMULATION, key) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(()),
        _ => Err(RuletraderError::ConfigInvalid {
            section: SIMULATION.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be non-negative"),
        }),
    }
}

/// Read `[simulation]` into typed values. Call after
/// [`validate_simulation_config`].
pub fn build_simulation_config(
    config: &dyn ConfigPort,
) -> Result<(SimulationConfig, Portfolio), RuletraderError> {
    let sim = SimulationConfig {
        window: require_positive_int(config, "candlesticks_per_rule")?,
        rule_count: require_positive_int(config, "rule_count")?,
        ema_width: require_positive_int(config, "ema_width")?,
    };
    let portfolio = Portfolio::new(
        config.get_double(SIMULATION, "invested_units", 0.0),
        config.get_double(SIMULATION, "available_money", 0.0),
    )?;
    Ok((sim, portfolio))
}
