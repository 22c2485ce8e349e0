//! Summary statistics over a simulation trace.

use super::backtest::{SimulationResult, StepRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub profit: f64,
    /// profit / baseline, 0 when the baseline is 0.
    pub total_return: f64,
    pub steps: usize,
    pub buy_steps: usize,
    pub sell_steps: usize,
    pub idle_steps: usize,
    /// Sells that liquidated the whole position.
    pub full_exits: usize,
    pub peak_value: f64,
    pub trough_value: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
}

impl Metrics {
    pub fn compute(result: &SimulationResult) -> Self {
        let total_return = if result.baseline != 0.0 {
            result.profit / result.baseline
        } else {
            0.0
        };

        let mut buy_steps = 0usize;
        let mut sell_steps = 0usize;
        let mut idle_steps = 0usize;
        let mut full_exits = 0usize;

        for step in &result.trace {
            if step.action.is_buy() {
                buy_steps += 1;
            } else if step.action.is_idle() {
                idle_steps += 1;
            } else {
                sell_steps += 1;
                if step.action.proportion() >= 1.0 {
                    full_exits += 1;
                }
            }
        }

        let values: Vec<f64> = result.trace.iter().map(step_value).collect();
        let peak_value = values.iter().copied().fold(result.baseline, f64::max);
        let trough_value = values.iter().copied().fold(result.baseline, f64::min);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(result.baseline, &values);

        Metrics {
            profit: result.profit,
            total_return,
            steps: result.trace.len(),
            buy_steps,
            sell_steps,
            idle_steps,
            full_exits,
            peak_value,
            trough_value,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

/// Post-trade portfolio value at the step's close.
pub fn step_value(step: &StepRecord) -> f64 {
    step.invested_units * step.close + step.available_money
}

/// Largest fractional fall from a running peak, and the longest run of steps
/// spent below it. The peak starts at the baseline.
fn compute_drawdown(baseline: f64, values: &[f64]) -> (f64, usize) {
    let mut peak = baseline;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &value in values {
        if value > peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            if dd > 0.0 {
                current_dd_duration += 1;
                max_dd_duration = max_dd_duration.max(current_dd_duration);
            }
        }
    }

    (max_dd, max_dd_duration)
}
