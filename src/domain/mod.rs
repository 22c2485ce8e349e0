//! Core domain types and logic.

pub mod candle;
pub mod ema;
pub mod rulebook;
pub mod rule_eval;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
