//! Streaming exponential moving average of close prices.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA = close*k + EMA*(1-k) once per simulated step.

use super::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    value: f64,
    smoothing: f64,
}

/// 2 / (1 + width)
pub fn smoothing_factor(width: usize) -> f64 {
    2.0 / (1.0 + width as f64)
}

impl Ema {
    /// Seed from the mean close of the first `width` candles.
    ///
    /// Returns `None` when `width` is zero or exceeds the available candles.
    pub fn seed(candles: &[Candle], width: usize) -> Option<Self> {
        if width == 0 || candles.len() < width {
            return None;
        }
        let sum: f64 = candles[..width].iter().map(|c| c.close).sum();
        Some(Ema {
            value: sum / width as f64,
            smoothing: smoothing_factor(width),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn update(&mut self, close: f64) {
        self.value = close * self.smoothing + self.value * (1.0 - self.smoothing);
    }
}

/// EMA value observed by each step `i` in `width..candles.len()`, i.e. before
/// that step's own close is folded in. Reference for checking the kernel trace.
#[cfg(test)]
pub(crate) fn ema_series(candles: &[Candle], width: usize) -> Vec<f64> {
    let Some(mut ema) = Ema::seed(candles, width) else {
        return Vec::new();
    };
    candles[width..]
        .iter()
        .map(|c| {
            let seen = ema.value();
            ema.update(c.close);
            seen
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn closes(prices: &[f64]) -> Vec<Candle> {
        prices.iter().map(|&p| Candle::flat(p)).collect()
    }

    #[test]
    fn seed_is_sma() {
        let candles = closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ema = Ema::seed(&candles, 3).unwrap();
        assert_relative_eq!(ema.value(), 2.0);
    }

    #[test]
    fn seed_uses_close_only() {
        let candles = vec![
            Candle::new(100.0, 1.0, 200.0, 0.5),
            Candle::new(100.0, 3.0, 200.0, 0.5),
        ];
        let ema = Ema::seed(&candles, 2).unwrap();
        assert_relative_eq!(ema.value(), 2.0);
    }

    #[test]
    fn seed_rejects_short_series() {
        assert!(Ema::seed(&closes(&[1.0, 2.0]), 3).is_none());
        assert!(Ema::seed(&closes(&[1.0, 2.0]), 0).is_none());
    }

    #[test]
    fn smoothing() {
        assert_relative_eq!(smoothing_factor(10), 2.0 / 11.0);
        assert_relative_eq!(smoothing_factor(1), 1.0);
    }

    #[test]
    fn recursive_update() {
        let candles = closes(&[10.0, 20.0, 30.0]);
        let mut ema = Ema::seed(&candles, 3).unwrap();
        let k = 0.5;
        ema.update(40.0);
        let expected = 40.0 * k + 20.0 * (1.0 - k);
        assert_relative_eq!(ema.value(), expected);
        ema.update(50.0);
        assert_relative_eq!(ema.value(), 50.0 * k + expected * (1.0 - k));
    }

    #[test]
    fn width_one_tracks_close() {
        let candles = closes(&[10.0]);
        let mut ema = Ema::seed(&candles, 1).unwrap();
        ema.update(25.0);
        assert_relative_eq!(ema.value(), 25.0);
    }

    #[test]
    fn series_is_pre_update() {
        let candles = closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = ema_series(&candles, 3);
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series[0], 2.0);
        assert_relative_eq!(series[1], 4.0 * 0.5 + 2.0 * 0.5);
    }

    #[test]
    fn series_empty_when_no_steps() {
        let candles = closes(&[1.0, 2.0, 3.0]);
        assert!(ema_series(&candles, 3).is_empty());
        assert!(ema_series(&candles, 4).is_empty());
    }

    #[test]
    fn equal_prices_stay_flat() {
        let candles = closes(&[100.0; 8]);
        for v in ema_series(&candles, 3) {
            assert_relative_eq!(v, 100.0);
        }
    }
}
