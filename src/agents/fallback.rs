use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::warn;

use super::SignalAgent;
use crate::error::{AgentError, Result};
use crate::types::OhlcvFrame;

/// Opt-in wrapper that fits on first use, predicts, rounds, and degrades to a
/// neutral 0.0 on any failure. A fitted or loaded model is reused as is.
#[derive(Debug, Clone)]
pub struct SafeStrategy<A> {
    agent: A,
    decimals: u32,
}

impl<A: SignalAgent> SafeStrategy<A> {
    pub fn new(agent: A, decimals: u32) -> Self {
        Self { agent, decimals }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn into_inner(self) -> A {
        self.agent
    }

    pub fn strategy(&mut self, history: &OhlcvFrame) -> f64 {
        match self.try_strategy(history) {
            Ok(score) => score,
            Err(e) => {
                warn!("{} failed ({} error): {}; returning neutral score", self.agent.name(), e.kind(), e);
                0.0
            }
        }
    }

    /// Same as [`strategy`](Self::strategy) without the fallback.
    pub fn try_strategy(&mut self, history: &OhlcvFrame) -> Result<f64> {
        if !self.agent.is_fitted() {
            self.agent.fit(history)?;
        }
        let price = history.last_close().ok_or_else(|| AgentError::InsufficientHistory {
            agent: self.agent.name().to_string(),
            needed: 1,
            got: 0,
        })?;
        let raw = self.agent.predict(price, history)?;
        round_score(raw, self.decimals).ok_or_else(|| AgentError::Degenerate {
            agent: self.agent.name().to_string(),
            reason: format!("score {} cannot be rounded", raw),
        })
    }
}

/// Rounds half to even at `decimals` places.
pub fn round_score(value: f64, decimals: u32) -> Option<f64> {
    Decimal::from_f64(value)?.round_dp(decimals).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{CusumTrendAgent, IndicatorAgent};
    use crate::indicators::Overlap;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_score_half_even() {
        assert_eq!(round_score(0.123449, 4), Some(0.1234));
        assert_eq!(round_score(0.125, 2), Some(0.12));
        assert_eq!(round_score(0.375, 2), Some(0.38));
        assert_eq!(round_score(-0.99999, 4), Some(-1.0));
        assert_eq!(round_score(f64::NAN, 4), None);
        assert_eq!(Decimal::from_f64(0.987649).map(|d| d.round_dp(4)), Some(dec!(0.9876)));
    }

    #[test]
    fn test_failure_degrades_to_neutral() {
        let agent = IndicatorAgent::new(Box::new(Overlap::Ema { period: 20 }));
        let mut safe = SafeStrategy::new(agent, 4);
        let history = OhlcvFrame::from_close(vec![100.0; 10]);
        assert_eq!(safe.strategy(&history), 0.0);
        assert!(safe.try_strategy(&history).is_err());
    }

    #[test]
    fn test_success_is_rounded() {
        let close: Vec<f64> = (0..40).map(|i| 100.0 * 1.0002f64.powi(i)).collect();
        let mut safe = SafeStrategy::new(CusumTrendAgent::default(), 4);
        let score = safe.strategy(&OhlcvFrame::from_close(close));
        assert!(score > 0.0 && score <= 1.0);
        assert_eq!(score, (score * 10_000.0).round() / 10_000.0);
    }

    fn wavy_close(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.04 * i as f64 + 3.0 * (i as f64 * 0.41).sin()).collect()
    }

    #[test]
    fn test_loaded_model_is_not_refitted() {
        let train = OhlcvFrame::from_close(wavy_close(160));
        let mut trained = IndicatorAgent::new(Box::new(Overlap::Ema { period: 20 }));
        trained.fit(&train).unwrap();
        let json = trained.save_model().unwrap().unwrap();

        let mut loaded = IndicatorAgent::new(Box::new(Overlap::Ema { period: 20 }));
        loaded.load_model(&json).unwrap();
        let before = loaded.model().cloned();
        let mut safe = SafeStrategy::new(loaded, 6);

        // scoring on different bars keeps the loaded coefficients
        let live = OhlcvFrame::from_close(wavy_close(220));
        safe.strategy(&live);
        assert_eq!(safe.agent().model().cloned(), before);
    }

    #[test]
    fn test_first_call_fits_an_unfitted_agent() {
        let history = OhlcvFrame::from_close(wavy_close(160));
        let mut safe = SafeStrategy::new(IndicatorAgent::new(Box::new(Overlap::Ema { period: 20 })), 4);
        assert!(!safe.agent().is_fitted());
        let score = safe.try_strategy(&history).unwrap();
        assert!((-1.0..=1.0).contains(&score));
        assert!(safe.agent().is_fitted());
    }

    #[test]
    fn test_boxed_agents_can_be_wrapped() {
        let agent: Box<dyn SignalAgent> = Box::new(CusumTrendAgent::default());
        let mut safe = SafeStrategy::new(agent, 2);
        assert_eq!(safe.strategy(&OhlcvFrame::from_close(vec![10.0; 3])), 0.0);
        assert_eq!(safe.agent().name(), "CUSUM_TREND");
    }
}
