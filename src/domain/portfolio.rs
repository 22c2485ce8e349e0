//! Two-asset portfolio: units of the instrument plus cash.

use super::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portfolio {
    pub invested_units: f64,
    pub available_money: f64,
}

/// Executed side of one step's trade. `proportion` is the clamped fraction
/// in `[0, 1]` of cash (buy) or held units (sell) that moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAction {
    Buy { proportion: f64 },
    Sell { proportion: f64 },
}

impl TradeAction {
    pub fn proportion(&self) -> f64 {
        match self {
            TradeAction::Buy { proportion } | TradeAction::Sell { proportion } => *proportion,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TradeAction::Buy { .. })
    }

    /// A sell of zero proportion leaves the portfolio untouched.
    pub fn is_idle(&self) -> bool {
        matches!(self, TradeAction::Sell { proportion } if *proportion == 0.0)
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy { .. } => f.write_str("buy"),
            TradeAction::Sell { .. } if self.is_idle() => f.write_str("hold"),
            TradeAction::Sell { .. } => f.write_str("sell"),
        }
    }
}

impl Portfolio {
    pub fn new(invested_units: f64, available_money: f64) -> Result<Self, ConfigurationError> {
        for (name, value) in [
            ("invested_units", invested_units),
            ("available_money", available_money),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidPortfolio {
                    reason: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(Portfolio {
            invested_units,
            available_money,
        })
    }

    pub fn value(&self, price: f64) -> f64 {
        self.invested_units * price + self.available_money
    }

    /// Share of the portfolio held in the instrument at `price`; 0 for an
    /// empty portfolio.
    pub fn invested_proportion(&self, price: f64) -> f64 {
        let invested_money = self.invested_units * price;
        let total = invested_money + self.available_money;
        if total == 0.0 {
            0.0
        } else {
            invested_money / total
        }
    }

    /// Positive signals buy with cash, anything else sells held units. The
    /// magnitude is clamped to 1 so a step never leverages or over-liquidates.
    pub fn apply(&mut self, trade_proportion: f64, price: f64) -> TradeAction {
        if trade_proportion > 0.0 {
            let proportion = trade_proportion.min(1.0);
            self.invested_units += proportion * self.available_money / price;
            self.available_money *= 1.0 - proportion;
            TradeAction::Buy { proportion }
        } else {
            let proportion = if trade_proportion < 0.0 {
                (-trade_proportion).min(1.0)
            } else {
                0.0
            };
            self.available_money += proportion * self.invested_units * price;
            self.invested_units *= 1.0 - proportion;
            TradeAction::Sell { proportion }
        }
    }
}
