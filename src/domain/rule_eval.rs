//! Rule evaluation engine.
//!
//! # Evaluation Semantics
//!
//! - Features: the trailing `W` candles flattened oldest first, then
//!   `[EMA, 1.0, invested_proportion]`
//! - Slot `t` of a rule bounds the current candle's attribute `t mod 4`
//!   between `lower . features` and `upper . features` (inclusive)
//! - A rule is satisfied only when all `4W` slots hold; evaluation stops at
//!   the first failing slot
//! - The trade signal is the sum of satisfied rule weights, in rule order
//!
//! Every window position reuses the current candle's four attributes, so
//! each attribute is checked against `W` independent bound sets.

use super::candle::{Attribute, Candle};
use super::rulebook::{Rule, Rulebook};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// `window` must be the trailing candles ending at the current step.
    pub fn build(window: &[Candle], ema: f64, invested_proportion: f64) -> Self {
        let mut values: Vec<f64> = window.iter().flat_map(|c| c.attributes()).collect();
        values.extend_from_slice(&[ema, 1.0, invested_proportion]);
        FeatureVector(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn dot(coefficients: &[f64], features: &FeatureVector) -> f64 {
    coefficients
        .iter()
        .zip(features.values())
        .map(|(c, f)| c * f)
        .sum()
}

pub fn is_satisfied(rule: &Rule, features: &FeatureVector, current: &Candle) -> bool {
    rule.bounds.iter().enumerate().all(|(slot, pair)| {
        let value = current.get(Attribute::from_slot(slot));
        let lower = dot(&pair.lower, features);
        let upper = dot(&pair.upper, features);
        (lower..=upper).contains(&value)
    })
}

/// Sum of the weights of every satisfied rule, in ascending rule order.
pub fn trade_proportion(rulebook: &Rulebook, features: &FeatureVector, current: &Candle) -> f64 {
    rulebook
        .rules()
        .iter()
        .filter(|rule| is_satisfied(rule, features, current))
        .fold(0.0, |acc, rule| acc + rule.weight)
}
