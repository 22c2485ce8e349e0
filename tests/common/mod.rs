#![allow(dead_code)]

use ruletrader::domain::backtest::SimulationConfig;
pub use ruletrader::domain::candle::Candle;
use ruletrader::domain::portfolio::Portfolio;
use ruletrader::domain::rulebook::{feature_width, slot_count, BoundPair, Rule, Rulebook};
use std::io::Write;

pub const WIDE: f64 = 1e12;

/// Index of the EMA feature in a coefficient vector.
pub fn ema_index(window: usize) -> usize {
    feature_width(window) - 3
}

/// Index of the constant 1.0 feature.
pub fn constant_index(window: usize) -> usize {
    feature_width(window) - 2
}

/// Index of the invested-proportion feature.
pub fn proportion_index(window: usize) -> usize {
    feature_width(window) - 1
}

/// Same bound pair in every slot.
pub fn uniform_rule(window: usize, lower: Vec<f64>, upper: Vec<f64>, weight: f64) -> Rule {
    Rule {
        bounds: vec![BoundPair { lower, upper }; slot_count(window)],
        weight,
    }
}

/// Every attribute bounded by the constants `lo..=hi`.
pub fn constant_rule(window: usize, lo: f64, hi: f64, weight: f64) -> Rule {
    let width = feature_width(window);
    let mut lower = vec![0.0; width];
    let mut upper = vec![0.0; width];
    lower[constant_index(window)] = lo;
    upper[constant_index(window)] = hi;
    uniform_rule(window, lower, upper, weight)
}

pub fn always_rule(window: usize, weight: f64) -> Rule {
    constant_rule(window, -WIDE, WIDE, weight)
}

/// Lower bound above upper bound, so no price qualifies.
pub fn never_rule(window: usize, weight: f64) -> Rule {
    constant_rule(window, 1.0, -1.0, weight)
}

pub fn rulebook(window: usize, rules: Vec<Rule>) -> Rulebook {
    Rulebook::from_rules(window, rules).unwrap()
}

pub fn config(window: usize, rule_count: usize, ema_width: usize) -> SimulationConfig {
    SimulationConfig {
        window,
        rule_count,
        ema_width,
    }
}

pub fn portfolio(units: f64, money: f64) -> Portfolio {
    Portfolio::new(units, money).unwrap()
}

pub fn flat_candles(price: f64, count: usize) -> Vec<Candle> {
    vec![Candle::flat(price); count]
}

/// Flat candles at the given closes.
pub fn closes(prices: &[f64]) -> Vec<Candle> {
    prices.iter().map(|&p| Candle::flat(p)).collect()
}

/// Candles drifting by `step` per bar with a small intrabar range.
pub fn trending_candles(count: usize, start: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let open = start + step * i as f64;
            let close = open + step / 2.0;
            Candle::new(open, close, open.max(close) + 0.5, open.min(close) - 0.5)
        })
        .collect()
}

pub fn candles_csv(candles: &[Candle]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for (i, c) in candles.iter().enumerate() {
        out.push_str(&format!(
            "2024-01-{:02},{},{},{},{},1000\n",
            i % 28 + 1,
            c.open,
            c.high,
            c.low,
            c.close
        ));
    }
    out
}

pub fn rulebook_text(rulebook: &Rulebook) -> String {
    rulebook
        .to_flat()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}
