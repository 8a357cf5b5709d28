use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SignalAgent;
use crate::error::{AgentError, Result};
use crate::ml::TrainingReport;
use crate::types::{Column, OhlcvFrame};

pub const CUSUM_TREND: &str = "CUSUM_TREND";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CusumOptions {
    /// Saturation scale `h` of the output.
    pub threshold: f64,
    /// Allowance `k` subtracted from every step.
    pub drift: f64,
    /// Most recent log returns considered.
    pub window: usize,
    pub min_rows: usize,
}

impl Default for CusumOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0005,
            drift: 0.0,
            window: 250,
            min_rows: 5,
        }
    }
}

/// Two-sided CUSUM over recent log returns of close, squashed to [-1, 1].
/// Rule based: there is nothing to fit.
#[derive(Debug, Clone, Default)]
pub struct CusumTrendAgent {
    options: CusumOptions,
}

impl CusumTrendAgent {
    pub fn new(options: CusumOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CusumOptions {
        &self.options
    }

    /// The larger of the upper and lower cumulative sums, signed.
    pub fn dominant_sum(&self, returns: &[f64]) -> f64 {
        let k = self.options.drift;
        let mut upper: f64 = 0.0;
        let mut lower: f64 = 0.0;
        for &x in returns {
            upper = (upper + x - k).max(0.0);
            lower = (lower + x + k).min(0.0);
        }
        if upper.abs() > lower.abs() {
            upper
        } else {
            lower
        }
    }
}

/// One-bar log returns of `close`, skipping any that are not finite.
pub fn log_returns(close: &[f64]) -> Vec<f64> {
    close
        .windows(2)
        .map(|w| w[1].ln() - w[0].ln())
        .filter(|r| r.is_finite())
        .collect()
}

impl SignalAgent for CusumTrendAgent {
    fn name(&self) -> &str {
        CUSUM_TREND
    }

    fn fit(&mut self, _history: &OhlcvFrame) -> Result<TrainingReport> {
        Ok(TrainingReport::default())
    }

    fn predict(&self, _current_price: f64, history: &OhlcvFrame) -> Result<f64> {
        let close = history.require(Column::Close, CUSUM_TREND)?;
        if close.len() < self.options.min_rows {
            return Err(AgentError::InsufficientHistory {
                agent: CUSUM_TREND.to_string(),
                needed: self.options.min_rows,
                got: close.len(),
            });
        }

        let returns = log_returns(close);
        let recent = &returns[returns.len().saturating_sub(self.options.window)..];
        let c = self.dominant_sum(recent);
        let score = if c == 0.0 {
            0.0
        } else {
            c.signum() * (1.0 - (-c.abs() / self.options.threshold).exp())
        };
        debug!("{}: cusum {:.6} over {} returns -> {:.4}", CUSUM_TREND, c, recent.len(), score);
        Ok(score)
    }

    fn is_fitted(&self) -> bool {
        true
    }
}
