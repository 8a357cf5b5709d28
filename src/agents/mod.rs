pub mod classifier;
pub mod cusum;
pub mod fallback;

pub use classifier::{IndicatorAgent, ModelState};
pub use cusum::{CusumOptions, CusumTrendAgent};
pub use fallback::SafeStrategy;

use crate::error::{AgentError, Result};
use crate::ml::TrainingReport;
use crate::types::OhlcvFrame;

/// A directional signal in [-1, 1] for the bar after the end of `history`.
pub trait SignalAgent: Send + Sync {
    fn name(&self) -> &str;
    fn fit(&mut self, history: &OhlcvFrame) -> Result<TrainingReport>;
    /// Scores the most recent bar. Never fits implicitly.
    fn predict(&self, current_price: f64, history: &OhlcvFrame) -> Result<f64>;
    fn is_fitted(&self) -> bool;

    /// Fitted state as JSON, for agents that carry any.
    fn save_model(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn load_model(&mut self, _json: &str) -> Result<()> {
        Err(AgentError::Model(format!("{} has no model to load", self.name())))
    }
}

impl<A: SignalAgent + ?Sized> SignalAgent for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fit(&mut self, history: &OhlcvFrame) -> Result<TrainingReport> {
        (**self).fit(history)
    }

    fn predict(&self, current_price: f64, history: &OhlcvFrame) -> Result<f64> {
        (**self).predict(current_price, history)
    }

    fn is_fitted(&self) -> bool {
        (**self).is_fitted()
    }

    fn save_model(&self) -> Result<Option<String>> {
        (**self).save_model()
    }

    fn load_model(&mut self, json: &str) -> Result<()> {
        (**self).load_model(json)
    }
}
