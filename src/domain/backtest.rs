//! Simulation kernel and event loop.
//!
//! Streams forward from candle `ema_width` to the end, one trade decision per
//! candle. Each step reads the EMA and portfolio left by the previous step,
//! so steps run strictly in order. Profit is measured against a baseline
//! valued at the first candle's open.

use tracing::{debug, info};

use super::candle::{candles_from_flat, validate_candles, Candle};
use super::ema::Ema;
use super::error::ConfigurationError;
use super::portfolio::{Portfolio, TradeAction};
use super::rule_eval::{trade_proportion, FeatureVector};
use super::rulebook::{rulebook_length, Rulebook};

/// Shape parameters shared by the rulebook and the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Candles per rule window (`W`).
    pub window: usize,
    pub rule_count: usize,
    pub ema_width: usize,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ema_width < self.window {
            return Err(ConfigurationError::WindowExceedsEmaWidth {
                window: self.window,
                ema_width: self.ema_width,
            });
        }
        for (name, value) in [
            ("candlesticks_per_rule", self.window),
            ("rule_count", self.rule_count),
            ("ema_width", self.ema_width),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroParameter { name });
            }
        }
        rulebook_length(self.window, self.rule_count)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    /// EMA the step traded on (before folding in this step's close).
    pub ema: f64,
    pub invested_proportion: f64,
    /// Raw weight sum before clamping.
    pub trade_proportion: f64,
    pub action: TradeAction,
    pub close: f64,
    /// Post-trade holdings.
    pub invested_units: f64,
    pub available_money: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub baseline: f64,
    pub final_value: f64,
    pub profit: f64,
    pub portfolio: Portfolio,
    pub trace: Vec<StepRecord>,
}

/// Flat-buffer entry point: `prices` is `[open, close, high, low, ...]`,
/// `rulebook` is `rule_count` concatenated rules.
pub fn simulate_flat(
    prices: &[f64],
    rulebook: &[f64],
    invested_units: f64,
    available_money: f64,
    window: usize,
    rule_count: usize,
    ema_width: usize,
) -> Result<f64, ConfigurationError> {
    let config = SimulationConfig {
        window,
        rule_count,
        ema_width,
    };
    config.validate()?;
    let candles = candles_from_flat(prices)?;
    let rulebook = Rulebook::from_flat(rulebook, window, rule_count)?;
    let portfolio = Portfolio::new(invested_units, available_money)?;
    simulate(&candles, &rulebook, portfolio, &config)
}

pub fn simulate(
    candles: &[Candle],
    rulebook: &Rulebook,
    portfolio: Portfolio,
    config: &SimulationConfig,
) -> Result<f64, ConfigurationError> {
    run(candles, rulebook, portfolio, config, false).map(|r| r.profit)
}

/// Like [`simulate`] but keeps one [`StepRecord`] per step.
pub fn simulate_with_trace(
    candles: &[Candle],
    rulebook: &Rulebook,
    portfolio: Portfolio,
    config: &SimulationConfig,
) -> Result<SimulationResult, ConfigurationError> {
    run(candles, rulebook, portfolio, config, true)
}

fn validate_inputs(
    candles: &[Candle],
    rulebook: &Rulebook,
    portfolio: &Portfolio,
    config: &SimulationConfig,
) -> Result<(), ConfigurationError> {
    config.validate()?;
    if rulebook.window() != config.window {
        return Err(ConfigurationError::WindowMismatch {
            rulebook: rulebook.window(),
            config: config.window,
        });
    }
    if rulebook.rule_count() != config.rule_count {
        return Err(ConfigurationError::RuleCountMismatch {
            rulebook: rulebook.rule_count(),
            config: config.rule_count,
        });
    }
    if candles.len() < config.ema_width {
        return Err(ConfigurationError::InsufficientCandles {
            have: candles.len(),
            need: config.ema_width,
        });
    }
    validate_candles(candles)?;
    Portfolio::new(portfolio.invested_units, portfolio.available_money)?;
    Ok(())
}

fn run(
    candles: &[Candle],
    rulebook: &Rulebook,
    mut portfolio: Portfolio,
    config: &SimulationConfig,
    keep_trace: bool,
) -> Result<SimulationResult, ConfigurationError> {
    validate_inputs(candles, rulebook, &portfolio, config)?;

    let baseline = portfolio.value(candles[0].open);
    let mut ema = Ema::seed(candles, config.ema_width).ok_or(
        ConfigurationError::InsufficientCandles {
            have: candles.len(),
            need: config.ema_width,
        },
    )?;

    info!(
        candles = candles.len(),
        rules = rulebook.rule_count(),
        window = config.window,
        ema_width = config.ema_width,
        baseline,
        "starting simulation"
    );

    let steps = candles.len() - config.ema_width;
    let mut trace = Vec::with_capacity(if keep_trace { steps } else { 0 });

    for i in config.ema_width..candles.len() {
        let current = &candles[i];
        let invested_proportion = portfolio.invested_proportion(current.open);
        let features = FeatureVector::build(
            &candles[i + 1 - config.window..=i],
            ema.value(),
            invested_proportion,
        );
        let signal = trade_proportion(rulebook, &features, current);
        let action = portfolio.apply(signal, current.close);

        debug!(
            step = i,
            ema = ema.value(),
            signal,
            %action,
            units = portfolio.invested_units,
            money = portfolio.available_money,
            "step"
        );

        if keep_trace {
            trace.push(StepRecord {
                index: i,
                ema: ema.value(),
                invested_proportion,
                trade_proportion: signal,
                action,
                close: current.close,
                invested_units: portfolio.invested_units,
                available_money: portfolio.available_money,
            });
        }

        ema.update(current.close);
    }

    let last_close = candles[candles.len() - 1].close;
    let final_value = portfolio.value(last_close);
    let profit = final_value - baseline;

    info!(steps, final_value, profit, "simulation finished");

    Ok(SimulationResult {
        baseline,
        final_value,
        profit,
        portfolio,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rulebook::{feature_width, rule_length};
    use approx::assert_relative_eq;

    fn config(window: usize, rule_count: usize, ema_width: usize) -> SimulationConfig {
        SimulationConfig {
            window,
            rule_count,
            ema_width,
        }
    }

    /// One W=1 rule that always holds with the given weight.
    fn always_rule(weight: f64) -> Vec<f64> {
        let width = feature_width(1);
        let mut flat = vec![0.0; rule_length(1)];
        for slot in 0..4 {
            let base = 2 * width * slot;
            flat[base + width - 2] = -1e9;
            flat[base + width + width - 2] = 1e9;
        }
        flat[rule_length(1) - 1] = weight;
        flat
    }

    fn flat_prices(price: f64, count: usize) -> Vec<f64> {
        vec![price; 4 * count]
    }

    #[test]
    fn config_guard_window_exceeds_ema_width() {
        let err = simulate_flat(&[], &[], 1.0, 1.0, 5, 1, 2).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::WindowExceedsEmaWidth {
                window: 5,
                ema_width: 2,
            }
        );
    }

    #[test]
    fn config_guard_zero_rule_count() {
        let err = simulate_flat(&flat_prices(1.0, 3), &[], 1.0, 1.0, 1, 0, 1).unwrap_err();
        assert_eq!(err, ConfigurationError::ZeroParameter { name: "rule_count" });
    }

    #[test]
    fn config_guard_oversized_window() {
        let window = 1 << 30;
        let err = simulate_flat(&[], &[], 0.0, 0.0, window, 1, window).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::RulebookTooLarge {
                window,
                rule_count: 1,
            }
        );
    }

    #[test]
    fn rejects_short_series() {
        let err = simulate_flat(&flat_prices(10.0, 2), &always_rule(1.0), 1.0, 1.0, 1, 1, 3)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InsufficientCandles { have: 2, need: 3 }
        );
    }

    #[test]
    fn rejects_rulebook_shape() {
        let mut rulebook = always_rule(1.0);
        rulebook.push(0.0);
        let err = simulate_flat(&flat_prices(10.0, 4), &rulebook, 1.0, 1.0, 1, 1, 1).unwrap_err();
        assert!(matches!(err, ConfigurationError::RuleShape { .. }));
    }

    #[test]
    fn rejects_window_mismatch() {
        let candles = vec![Candle::flat(10.0); 4];
        let book = Rulebook::uniform(2, 1, 0.0, 1.0).unwrap();
        let err = simulate(
            &candles,
            &book,
            Portfolio::new(1.0, 1.0).unwrap(),
            &config(1, 1, 2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::WindowMismatch {
                rulebook: 2,
                config: 1,
            }
        );
    }

    #[test]
    fn flat_series_always_buy_breaks_even() {
        let profit =
            simulate_flat(&flat_prices(10.0, 20), &always_rule(1.0), 100.0, 1000.0, 1, 1, 1)
                .unwrap();
        assert_eq!(profit, 0.0);
    }

    #[test]
    fn no_steps_when_series_equals_ema_width() {
        let prices = [10.0, 12.0, 12.0, 9.0, 11.0, 15.0, 16.0, 10.0];
        let profit = simulate_flat(&prices, &always_rule(1.0), 2.0, 50.0, 1, 1, 2).unwrap();
        // valued at last close vs first open, no trades executed
        assert_relative_eq!(profit, (2.0 * 15.0 + 50.0) - (2.0 * 10.0 + 50.0));
    }

    #[test]
    fn buy_executes_at_close() {
        let candles = vec![
            Candle::new(10.0, 10.0, 10.0, 10.0),
            Candle::new(10.0, 20.0, 20.0, 10.0),
            Candle::new(20.0, 40.0, 40.0, 20.0),
        ];
        let book = Rulebook::from_flat(&always_rule(1.0), 1, 1).unwrap();
        let result = simulate_with_trace(
            &candles,
            &book,
            Portfolio::new(0.0, 100.0).unwrap(),
            &config(1, 1, 1),
        )
        .unwrap();

        // step 1 buys 100/20 = 5 units, step 2 has no cash left
        assert_relative_eq!(result.portfolio.invested_units, 5.0);
        assert_eq!(result.portfolio.available_money, 0.0);
        assert_relative_eq!(result.baseline, 100.0);
        assert_relative_eq!(result.final_value, 200.0);
        assert_relative_eq!(result.profit, 100.0);
        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.trace[0].action, TradeAction::Buy { proportion: 1.0 });
    }

    #[test]
    fn trace_records_pre_update_ema() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let candles: Vec<Candle> = closes.iter().map(|&c| Candle::flat(c)).collect();
        let book = Rulebook::uniform(1, 1, 0.0, 0.0).unwrap();
        let result = simulate_with_trace(
            &candles,
            &book,
            Portfolio::new(1.0, 0.0).unwrap(),
            &config(1, 1, 3),
        )
        .unwrap();

        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.trace[0].index, 3);
        assert_relative_eq!(result.trace[0].ema, 2.0);
        assert_relative_eq!(result.trace[1].ema, 4.0 * 0.5 + 2.0 * 0.5);
    }

    #[test]
    fn sell_signal_liquidates() {
        let candles = vec![Candle::flat(10.0), Candle::flat(12.0)];
        let book = Rulebook::from_flat(&always_rule(-5.0), 1, 1).unwrap();
        let result = simulate_with_trace(
            &candles,
            &book,
            Portfolio::new(10.0, 0.0).unwrap(),
            &config(1, 1, 1),
        )
        .unwrap();
        assert_eq!(result.portfolio.invested_units, 0.0);
        assert_relative_eq!(result.portfolio.available_money, 120.0);
        assert_relative_eq!(result.profit, 20.0);
    }

    #[test]
    fn empty_portfolio_guard() {
        let profit =
            simulate_flat(&flat_prices(10.0, 5), &always_rule(1.0), 0.0, 0.0, 1, 1, 2).unwrap();
        assert_eq!(profit, 0.0);
    }

    #[test]
    fn simulate_without_trace_matches_traced_profit() {
        let candles: Vec<Candle> = (0..12)
            .map(|i| Candle::new(10.0 + i as f64, 10.5 + i as f64, 11.0 + i as f64, 9.5 + i as f64))
            .collect();
        let book = Rulebook::from_flat(&always_rule(0.3), 1, 1).unwrap();
        let portfolio = Portfolio::new(3.0, 100.0).unwrap();
        let cfg = config(1, 1, 4);
        let profit = simulate(&candles, &book, portfolio, &cfg).unwrap();
        let traced = simulate_with_trace(&candles, &book, portfolio, &cfg).unwrap();
        assert_eq!(profit, traced.profit);
        assert_eq!(traced.trace.len(), 8);
    }

    #[test]
    fn trace_ema_matches_batch_series() {
        let candles: Vec<Candle> = [10.0, 12.0, 11.0, 15.0, 14.0, 18.0, 17.0]
            .iter()
            .map(|&p| Candle::flat(p))
            .collect();
        let book = Rulebook::from_flat(&always_rule(0.5), 1, 1).unwrap();
        let traced = simulate_with_trace(
            &candles,
            &book,
            Portfolio::new(1.0, 50.0).unwrap(),
            &config(1, 1, 3),
        )
        .unwrap();
        let series = crate::domain::ema::ema_series(&candles, 3);
        assert_eq!(traced.trace.len(), series.len());
        for (step, expected) in traced.trace.iter().zip(series) {
            assert_relative_eq!(step.ema, expected);
        }
    }
}
