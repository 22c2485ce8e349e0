//! OHLC candle representation.
//!
//! Candles are stored in the order the flat price buffer uses:
//! open, close, high, low.

use super::error::ConfigurationError;

/// Number of scalars per candle in a flat price buffer.
pub const CANDLE_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

/// One of the four candle fields, in flat-buffer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Open,
    Close,
    High,
    Low,
}

impl Attribute {
    pub const ALL: [Attribute; CANDLE_WIDTH] = [
        Attribute::Open,
        Attribute::Close,
        Attribute::High,
        Attribute::Low,
    ];

    /// Attribute tested by bound slot `slot` (slot mod 4).
    pub fn from_slot(slot: usize) -> Self {
        Self::ALL[slot % CANDLE_WIDTH]
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Attribute::Open => "open",
            Attribute::Close => "close",
            Attribute::High => "high",
            Attribute::Low => "low",
        };
        f.write_str(name)
    }
}

impl Candle {
    pub fn new(open: f64, close: f64, high: f64, low: f64) -> Self {
        Candle {
            open,
            close,
            high,
            low,
        }
    }

    /// Candle with all four fields at one price.
    pub fn flat(price: f64) -> Self {
        Candle::new(price, price, price, price)
    }

    pub fn get(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Open => self.open,
            Attribute::Close => self.close,
            Attribute::High => self.high,
            Attribute::Low => self.low,
        }
    }

    /// [open, close, high, low]
    pub fn attributes(&self) -> [f64; CANDLE_WIDTH] {
        [self.open, self.close, self.high, self.low]
    }
}

/// Split a flat `[open, close, high, low, ...]` buffer into candles.
pub fn candles_from_flat(prices: &[f64]) -> Result<Vec<Candle>, ConfigurationError> {
    if prices.len() % CANDLE_WIDTH != 0 {
        return Err(ConfigurationError::FlatPriceSeries { len: prices.len() });
    }
    Ok(prices
        .chunks_exact(CANDLE_WIDTH)
        .map(|c| Candle::new(c[0], c[1], c[2], c[3]))
        .collect())
}

/// Every field must be finite and every close strictly positive, since
/// buys divide by the close.
pub fn validate_candles(candles: &[Candle]) -> Result<(), ConfigurationError> {
    for (index, candle) in candles.iter().enumerate() {
        if let Some(attr) = Attribute::ALL
            .iter()
            .find(|&&a| !candle.get(a).is_finite())
        {
            return Err(ConfigurationError::InvalidCandle {
                index,
                reason: format!("{attr} is not finite"),
            });
        }
        if candle.close <= 0.0 {
            return Err(ConfigurationError::InvalidCandle {
                index,
                reason: format!("close must be positive, got {}", candle.close),
            });
        }
    }
    Ok(())
}
