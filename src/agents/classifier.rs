use tracing::{debug, info};

use super::SignalAgent;
use crate::error::{AgentError, Result};
use crate::indicators::Indicator;
use crate::ml::{FeatureFrame, LogisticModel, SolverOptions, TrainingReport};
use crate::types::OhlcvFrame;

#[derive(Debug, Clone, Default)]
pub enum ModelState {
    #[default]
    Unfitted,
    Fitted(LogisticModel),
}

/// One indicator feeding a logistic classifier on "next close is higher".
#[derive(Debug)]
pub struct IndicatorAgent {
    indicator: Box<dyn Indicator>,
    options: SolverOptions,
    state: ModelState,
}

impl IndicatorAgent {
    pub fn new(indicator: Box<dyn Indicator>) -> Self {
        Self {
            indicator,
            options: SolverOptions::default(),
            state: ModelState::Unfitted,
        }
    }

    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn indicator(&self) -> &dyn Indicator {
        self.indicator.as_ref()
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn model(&self) -> Option<&LogisticModel> {
        match &self.state {
            ModelState::Fitted(model) => Some(model),
            ModelState::Unfitted => None,
        }
    }

    pub fn features(&self, history: &OhlcvFrame) -> Result<FeatureFrame> {
        FeatureFrame::extract(self.indicator.as_ref(), history)
    }

    /// Replaces the fitted state with a model built elsewhere.
    pub fn set_model(&mut self, model: LogisticModel) -> Result<()> {
        let expected = self.indicator.feature_names();
        let matches = model.feature_names().len() == expected.len()
            && model.feature_names().iter().zip(expected).all(|(a, b)| a == b);
        if !matches {
            return Err(AgentError::Model(format!(
                "{} expects features {:?}, model has {:?}",
                self.indicator.name(),
                expected,
                model.feature_names()
            )));
        }
        self.state = ModelState::Fitted(model);
        Ok(())
    }

    /// Enough finite feature rows to train on. A history long enough to
    /// cover warm-up plus the minimum that still falls short is degenerate.
    fn check_rows(&self, features: &FeatureFrame, history: &OhlcvFrame) -> Result<()> {
        // at least one labelled row
        let min_rows = self.indicator.min_rows().max(2);
        if features.len() >= min_rows {
            return Ok(());
        }
        let needed = self.indicator.warmup() + min_rows;
        if history.len() < needed {
            return Err(AgentError::InsufficientHistory {
                agent: self.name().to_string(),
                needed,
                got: history.len(),
            });
        }
        Err(AgentError::Degenerate {
            agent: self.name().to_string(),
            reason: format!("only {} finite feature rows, {} needed", features.len(), min_rows),
        })
    }
}

impl SignalAgent for IndicatorAgent {
    fn name(&self) -> &str {
        self.indicator.name()
    }

    fn fit(&mut self, history: &OhlcvFrame) -> Result<TrainingReport> {
        let features = self.features(history)?;
        self.check_rows(&features, history)?;

        let (x, labels) = features.training_set();
        let (model, report) = LogisticModel::fit(features.names(), &x, &labels, &self.options)?;
        info!(
            "{} model trained: {} samples, {:.1}% accuracy, {} up / {} down, {} iterations",
            self.name(),
            report.samples,
            report.accuracy * 100.0,
            report.ups_in_data,
            report.downs_in_data,
            report.iterations
        );

        self.state = ModelState::Fitted(model);
        Ok(report)
    }

    fn predict(&self, current_price: f64, history: &OhlcvFrame) -> Result<f64> {
        let features = self.features(history)?;
        if !self.is_fitted() {
            // a lazy caller would fit next, so report the data problem first
            self.check_rows(&features, history)?;
        }
        let warmup = self.indicator.warmup();
        let row = match features.last_row() {
            Some(row) => row,
            None if history.len() > warmup => {
                return Err(AgentError::Degenerate {
                    agent: self.name().to_string(),
                    reason: "no finite feature row".to_string(),
                })
            }
            None => {
                return Err(AgentError::InsufficientHistory {
                    agent: self.name().to_string(),
                    needed: warmup + 1,
                    got: history.len(),
                })
            }
        };

        let model = self.model().ok_or_else(|| AgentError::NotFitted {
            agent: self.name().to_string(),
        })?;
        let score = model.score(row.view());
        debug!("{} score {:.4} at price {}", self.name(), score, current_price);
        Ok(score)
    }

    fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fitted(_))
    }

    fn save_model(&self) -> Result<Option<String>> {
        self.model().map(|m| m.save_to_json()).transpose()
    }

    fn load_model(&mut self, json: &str) -> Result<()> {
        let model = LogisticModel::load_from_json(json)?;
        self.set_model(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::indicators::{Momentum, Overlap, Statistic};

    fn wavy_close(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.05 * i as f64 + 4.0 * (i as f64 * 0.37).sin() + 1.5 * (i as f64 * 1.9).cos())
            .collect()
    }

    fn ema_agent() -> IndicatorAgent {
        IndicatorAgent::new(Box::new(Overlap::Ema { period: 20 }))
    }

    #[test]
    fn test_predict_before_fit_is_rejected() {
        let history = OhlcvFrame::from_close(wavy_close(120));
        let agent = ema_agent();
        let err = agent.predict(100.0, &history).unwrap_err();
        assert!(matches!(err, AgentError::NotFitted { .. }));
        assert!(!agent.is_fitted());
    }

    #[test]
    fn test_fit_then_predict_is_bounded_and_repeatable() {
        let history = OhlcvFrame::from_close(wavy_close(200));
        let mut agent = ema_agent();
        let report = agent.fit(&history).unwrap();
        assert_eq!(report.samples, 200 - agent.indicator().warmup() - 1);
        assert_eq!(report.ups_in_data + report.downs_in_data, report.samples);

        let a = agent.predict(101.0, &history).unwrap();
        let b = agent.predict(101.0, &history).unwrap();
        assert!((-1.0..=1.0).contains(&a));
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_history_fails_both_paths() {
        let history = OhlcvFrame::from_close(wavy_close(20));
        let mut agent = IndicatorAgent::new(Box::new(Statistic::LinearReg { period: 30 }));

        match agent.fit(&history).unwrap_err() {
            AgentError::InsufficientHistory { needed, got, .. } => {
                assert_eq!(got, 20);
                assert_eq!(needed, agent.indicator().warmup() + agent.indicator().min_rows());
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = agent.predict(100.0, &history).unwrap_err();
        assert!(matches!(err, AgentError::InsufficientHistory { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unfitted_predict_reports_short_history_before_fit_state() {
        // past the warm-up, short of the minimum
        let history = OhlcvFrame::from_close(wavy_close(34));
        let agent = IndicatorAgent::new(Box::new(Statistic::LinearReg { period: 30 }));
        assert!(history.len() > agent.indicator().warmup());

        match agent.predict(100.0, &history).unwrap_err() {
            AgentError::InsufficientHistory { needed, got, .. } => {
                assert_eq!(got, 34);
                assert_eq!(needed, agent.indicator().warmup() + agent.indicator().min_rows());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_flat_prices_are_degenerate_not_short() {
        let n = 300;
        let flat = vec![50.0; n];
        let history =
            OhlcvFrame::from_ohlcv(flat.clone(), flat.clone(), flat.clone(), flat, vec![1_000.0; n]).unwrap();
        let mut agent = IndicatorAgent::new(Box::new(Momentum::WillR { period: 14 }));

        let err = agent.fit(&history).unwrap_err();
        assert!(matches!(err, AgentError::Degenerate { .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Degeneracy);

        let err = agent.predict(50.0, &history).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Degeneracy);
        assert!(!agent.is_fitted());
    }

    #[test]
    fn test_missing_column_is_a_schema_error() {
        let history = OhlcvFrame::from_close(wavy_close(100));
        let mut agent = IndicatorAgent::new(Box::new(Overlap::Sar { step: 0.02, max_step: 0.2 }));
        let err = agent.fit(&history).unwrap_err();
        assert!(matches!(err, AgentError::MissingColumn { .. }));
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let history = OhlcvFrame::from_close(wavy_close(150));
        let mut agent = ema_agent();
        agent.fit(&history).unwrap();
        let json = agent.save_model().unwrap().unwrap();

        let mut restored = ema_agent();
        restored.load_model(&json).unwrap();
        assert_eq!(
            agent.predict(0.0, &history).unwrap(),
            restored.predict(0.0, &history).unwrap()
        );
    }

    #[test]
    fn test_model_for_other_features_is_refused() {
        let history = OhlcvFrame::from_close(wavy_close(150));
        let mut agent = ema_agent();
        agent.fit(&history).unwrap();
        let json = agent.save_model().unwrap().unwrap();

        let mut other = IndicatorAgent::new(Box::new(Statistic::Var { period: 20 }));
        assert!(matches!(other.load_model(&json), Err(AgentError::Model(_))));
        assert!(!other.is_fitted());
    }

    #[test]
    fn test_unfitted_agent_has_nothing_to_save() {
        assert!(ema_agent().save_model().unwrap().is_none());
    }
}
