//! Typed rulebook layout.
//!
//! A rulebook arrives as one flat buffer of `rule_count` equally sized rules.
//! Each rule is `4W` bound pairs followed by a trailing weight, where a bound
//! pair is a lower and an upper coefficient vector of `4W + 3` scalars each:
//!
//! ```text
//! rule := (lower[4W+3] upper[4W+3]) x 4W, weight
//! ```
//!
//! The buffer is decoded once into [`Rulebook`] so the simulation loop never
//! recomputes offsets.

use super::candle::CANDLE_WIDTH;
use super::error::ConfigurationError;

/// Trailing features appended after the candle window: EMA, constant, invested proportion.
pub const EXTRA_FEATURES: usize = 3;

/// Length of a feature vector and of each coefficient vector: `4W + 3`.
pub fn feature_width(window: usize) -> usize {
    CANDLE_WIDTH * window + EXTRA_FEATURES
}

/// Number of bound pairs per rule: `4W`.
pub fn slot_count(window: usize) -> usize {
    CANDLE_WIDTH * window
}

/// Flat length of one rule: `8W(4W + 3) + 1`. Only for windows already
/// accepted by [`rulebook_length`].
pub fn rule_length(window: usize) -> usize {
    2 * slot_count(window) * feature_width(window) + 1
}

fn checked_rule_length(window: usize) -> Option<usize> {
    let slots = CANDLE_WIDTH.checked_mul(window)?;
    let width = slots.checked_add(EXTRA_FEATURES)?;
    slots.checked_mul(width)?.checked_mul(2)?.checked_add(1)
}

/// Flat length of a whole rulebook, `rule_count * rule_length(window)`.
pub fn rulebook_length(window: usize, rule_count: usize) -> Result<usize, ConfigurationError> {
    checked_rule_length(window)
        .and_then(|len| len.checked_mul(rule_count))
        .ok_or(ConfigurationError::RulebookTooLarge { window, rule_count })
}

/// Lower and upper coefficient vectors for one bound slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPair {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub bounds: Vec<BoundPair>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rulebook {
    window: usize,
    rules: Vec<Rule>,
}

impl Rule {
    fn from_flat(block: &[f64], window: usize) -> Self {
        let width = feature_width(window);
        let bounds = block[..block.len() - 1]
            .chunks_exact(2 * width)
            .map(|pair| BoundPair {
                lower: pair[..width].to_vec(),
                upper: pair[width..].to_vec(),
            })
            .collect();
        Rule {
            bounds,
            weight: block[block.len() - 1],
        }
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        for pair in &self.bounds {
            out.extend_from_slice(&pair.lower);
            out.extend_from_slice(&pair.upper);
        }
        out.push(self.weight);
    }
}

impl Rulebook {
    /// Decode a flat rulebook buffer for `window` candlesticks per rule.
    pub fn from_flat(
        flat: &[f64],
        window: usize,
        rule_count: usize,
    ) -> Result<Self, ConfigurationError> {
        if window == 0 {
            return Err(ConfigurationError::ZeroParameter {
                name: "candlesticks_per_rule",
            });
        }
        if rule_count == 0 {
            return Err(ConfigurationError::ZeroParameter { name: "rule_count" });
        }
        let total = rulebook_length(window, rule_count)?;
        if flat.len() % rule_count != 0 {
            return Err(ConfigurationError::UnevenRulebook {
                len: flat.len(),
                rule_count,
            });
        }
        let length = flat.len() / rule_count;
        let expected = total / rule_count;
        if length != expected {
            return Err(ConfigurationError::RuleShape {
                rule_length: length,
                expected,
                window,
            });
        }
        if let Some(offset) = flat.iter().position(|v| !v.is_finite()) {
            return Err(ConfigurationError::InvalidCoefficient { offset });
        }

        let rules = flat
            .chunks_exact(length)
            .map(|block| Rule::from_flat(block, window))
            .collect();
        Ok(Rulebook { window, rules })
    }

    /// Every coefficient set to `coefficient`, every rule weighted `weight`.
    pub fn uniform(
        window: usize,
        rule_count: usize,
        coefficient: f64,
        weight: f64,
    ) -> Result<Self, ConfigurationError> {
        if window == 0 {
            return Err(ConfigurationError::ZeroParameter {
                name: "candlesticks_per_rule",
            });
        }
        if rule_count == 0 {
            return Err(ConfigurationError::ZeroParameter { name: "rule_count" });
        }
        let length = rulebook_length(window, rule_count)? / rule_count;
        if !coefficient.is_finite() {
            return Err(ConfigurationError::InvalidCoefficient { offset: 0 });
        }
        if !weight.is_finite() {
            return Err(ConfigurationError::InvalidCoefficient { offset: length - 1 });
        }

        let width = feature_width(window);
        let rule = Rule {
            bounds: vec![
                BoundPair {
                    lower: vec![coefficient; width],
                    upper: vec![coefficient; width],
                };
                slot_count(window)
            ],
            weight,
        };
        Ok(Rulebook {
            window,
            rules: vec![rule; rule_count],
        })
    }

    /// Build from typed rules. Every rule must carry `4W` pairs of `4W + 3`
    /// coefficients.
    pub fn from_rules(window: usize, rules: Vec<Rule>) -> Result<Self, ConfigurationError> {
        let expected = rulebook_length(window, 1)?;
        let mut flat = Vec::new();
        for rule in &rules {
            let shaped = rule.bounds.len() == slot_count(window)
                && rule.bounds.iter().all(|p| {
                    p.lower.len() == feature_width(window) && p.upper.len() == feature_width(window)
                });
            if !shaped {
                let actual: usize =
                    rule.bounds.iter().map(|p| p.lower.len() + p.upper.len()).sum::<usize>() + 1;
                return Err(ConfigurationError::RuleShape {
                    rule_length: actual,
                    expected,
                    window,
                });
            }
            rule.write_flat(&mut flat);
        }
        Self::from_flat(&flat, window, rules.len())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Canonical flat encoding; inverse of [`Rulebook::from_flat`].
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.rules.len() * rule_length(self.window));
        for rule in &self.rules {
            rule.write_flat(&mut out);
        }
        out
    }
}
