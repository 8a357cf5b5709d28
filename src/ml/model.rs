use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

/// Solver settings for the L2-regularised logistic regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    /// Largest coefficient step still counted as movement.
    pub tol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

/// Training report after model fit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub accuracy: f64,
    pub ups_in_data: usize,
    pub downs_in_data: usize,
    pub iterations: usize,
}

/// Model weights for persistence (logistic regression coefficients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub feature_means: Vec<f64>,
    pub feature_stds: Vec<f64>,
}

/// Binary "next close is higher" classifier on z-scored features.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    weights: ModelWeights,
}

impl LogisticModel {
    /// Fits the classifier on `x` (one row per bar) and the up/down labels.
    pub fn fit(
        feature_names: &[String],
        x: &Array2<f64>,
        labels: &[bool],
        options: &SolverOptions,
    ) -> Result<(Self, TrainingReport)> {
        let n = x.nrows();
        let num_features = x.ncols();
        if n == 0 || n != labels.len() {
            return Err(AgentError::Model(format!(
                "training table has {} rows and {} labels",
                n,
                labels.len()
            )));
        }
        if feature_names.len() != num_features {
            return Err(AgentError::Model(format!(
                "{} feature names for {} feature columns",
                feature_names.len(),
                num_features
            )));
        }

        // Compute feature means and stds for normalization
        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| AgentError::Model("empty feature table".to_string()))?;
        let stds = x
            .std_axis(Axis(0), 1.0)
            .mapv(|s| if s.is_finite() { s } else { 0.0 });

        let mut normalized = Array2::<f64>::zeros((n, num_features));
        for j in 0..num_features {
            if stds[j] > 1e-10 {
                for i in 0..n {
                    normalized[[i, j]] = (x[[i, j]] - means[j]) / stds[j];
                }
            }
        }

        let ups = labels.iter().filter(|&&up| up).count();
        let downs = n - ups;
        let y: Array1<f64> = labels.iter().map(|&up| if up { 1.0 } else { 0.0 }).collect();

        let (coefficients, intercept, iterations) = if ups == 0 || downs == 0 {
            let prior = (ups as f64 + 0.5) / (n as f64 + 1.0);
            warn!(
                "All {} training labels are {}; falling back to constant probability {:.4}",
                n,
                if ups == 0 { "down" } else { "up" },
                prior
            );
            (vec![0.0; num_features], logit(prior), 0)
        } else {
            let (beta, iterations) = newton_logistic(&normalized, &y, options)?;
            (beta.slice(ndarray::s![1..]).to_vec(), beta[0], iterations)
        };

        let model = Self {
            weights: ModelWeights {
                feature_names: feature_names.to_vec(),
                coefficients,
                intercept,
                feature_means: means.to_vec(),
                feature_stds: stds.to_vec(),
            },
        };

        let correct = (0..n)
            .filter(|&i| (model.probability(x.row(i)) >= 0.5) == labels[i])
            .count();
        let report = TrainingReport {
            samples: n,
            accuracy: correct as f64 / n as f64,
            ups_in_data: ups,
            downs_in_data: downs,
            iterations,
        };
        Ok((model, report))
    }

    /// Probability that the next close is higher, for a raw feature row.
    pub fn probability(&self, row: ArrayView1<f64>) -> f64 {
        let w = &self.weights;
        let mut z = w.intercept;
        for (j, &value) in row.iter().enumerate() {
            let std = w.feature_stds[j];
            let normalized = if std > 1e-10 {
                (value - w.feature_means[j]) / std
            } else {
                0.0
            };
            z += w.coefficients[j] * normalized;
        }
        sigmoid(z)
    }

    /// `2p - 1`, in [-1, 1].
    pub fn score(&self, row: ArrayView1<f64>) -> f64 {
        (2.0 * self.probability(row) - 1.0).clamp(-1.0, 1.0)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.weights.feature_names
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    /// Serialize model to JSON string for persistence
    pub fn save_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.weights)?)
    }

    /// Load model from JSON string
    pub fn load_from_json(json: &str) -> Result<Self> {
        let weights: ModelWeights = serde_json::from_str(json)?;
        let k = weights.feature_names.len();
        if weights.coefficients.len() != k || weights.feature_means.len() != k || weights.feature_stds.len() != k {
            return Err(AgentError::Model(format!(
                "inconsistent weights: {} names, {} coefficients, {} means, {} stds",
                k,
                weights.coefficients.len(),
                weights.feature_means.len(),
                weights.feature_stds.len()
            )));
        }
        Ok(Self { weights })
    }
}

/// Newton iterations (IRLS) for the penalised log-likelihood with an
/// unpenalised intercept. Returns `[intercept, coefficients..]` and the
/// number of iterations run.
fn newton_logistic(x: &Array2<f64>, y: &Array1<f64>, options: &SolverOptions) -> Result<(Array1<f64>, usize)> {
    let n = x.nrows();
    let k = x.ncols() + 1;
    let lambda = 1.0 / options.c;

    let mut design = Array2::<f64>::ones((n, k));
    design.slice_mut(ndarray::s![.., 1..]).assign(x);

    let mut beta = Array1::<f64>::zeros(k);
    let mut objective = penalised_loss(&design, y, &beta, lambda);

    for iteration in 1..=options.max_iter {
        let p = design.dot(&beta).mapv(sigmoid);
        let mut grad = design.t().dot(&(&p - y));
        let s = p.mapv(|pi| pi * (1.0 - pi));
        let mut hess = (&design.t() * &s).dot(&design);
        for j in 1..k {
            grad[j] += lambda * beta[j];
            hess[[j, j]] += lambda;
        }

        let step = solve(hess, grad)?;

        // halve the step until the objective stops getting worse
        let mut t = 1.0;
        let mut candidate = &beta - &(&step * t);
        let mut candidate_loss = penalised_loss(&design, y, &candidate, lambda);
        while candidate_loss > objective && t > 1e-10 {
            t *= 0.5;
            candidate = &beta - &(&step * t);
            candidate_loss = penalised_loss(&design, y, &candidate, lambda);
        }

        let moved = step.iter().fold(0.0f64, |m, v| m.max((v * t).abs()));
        beta = candidate;
        objective = candidate_loss;
        if moved < options.tol {
            debug!("Logistic solver converged after {} iterations", iteration);
            return Ok((beta, iteration));
        }
    }

    warn!("Logistic solver stopped at the iteration cap ({})", options.max_iter);
    Ok((beta, options.max_iter))
}

fn penalised_loss(design: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>, lambda: f64) -> f64 {
    let z = design.dot(beta);
    let log_loss: f64 = z.iter().zip(y.iter()).map(|(&zi, &yi)| softplus(zi) - yi * zi).sum();
    let penalty: f64 = beta.iter().skip(1).map(|b| b * b).sum();
    log_loss + 0.5 * lambda * penalty
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(AgentError::Model("singular Hessian in logistic solver".to_string()));
        }
        if pivot != col {
            for j in 0..n {
                a.swap([col, j], [pivot, j]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|j| a[[row, j]] * x[j]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}
