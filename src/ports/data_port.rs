//! Data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use crate::domain::rulebook::Rulebook;

pub trait DataPort {
    /// Full price history, oldest first.
    fn load_candles(&self) -> Result<Vec<Candle>, RuletraderError>;

    /// Decode the stored flat rulebook for `window` candlesticks per rule.
    fn load_rulebook(&self, window: usize, rule_count: usize) -> Result<Rulebook, RuletraderError>;
}
