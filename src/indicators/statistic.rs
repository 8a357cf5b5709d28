use serde::{Deserialize, Serialize};

use super::series::{self, LineFit, NAN};
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// Rolling statistics and least-squares regression over the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Beta { period: usize },
    Correl { period: usize },
    LinearReg { period: usize },
    LinearRegAngle { period: usize },
    LinearRegIntercept { period: usize },
    LinearRegSlope { period: usize },
    StdDev { period: usize },
    Tsf { period: usize },
    Var { period: usize },
}

impl Statistic {
    pub fn all() -> Vec<Statistic> {
        vec![
            Statistic::Beta { period: 30 },
            Statistic::Correl { period: 30 },
            Statistic::LinearReg { period: 30 },
            Statistic::LinearRegAngle { period: 30 },
            Statistic::LinearRegIntercept { period: 30 },
            Statistic::LinearRegSlope { period: 30 },
            Statistic::StdDev { period: 20 },
            Statistic::Tsf { period: 30 },
            Statistic::Var { period: 20 },
        ]
    }

    fn period(&self) -> usize {
        match *self {
            Statistic::Beta { period }
            | Statistic::Correl { period }
            | Statistic::LinearReg { period }
            | Statistic::LinearRegAngle { period }
            | Statistic::LinearRegIntercept { period }
            | Statistic::LinearRegSlope { period }
            | Statistic::StdDev { period }
            | Statistic::Tsf { period }
            | Statistic::Var { period } => period,
        }
    }
}

impl Indicator for Statistic {
    fn name(&self) -> &'static str {
        match self {
            Statistic::Beta { .. } => "BETA",
            Statistic::Correl { .. } => "CORREL",
            Statistic::LinearReg { .. } => "LINEARREG",
            Statistic::LinearRegAngle { .. } => "LINEARREG_ANGLE",
            Statistic::LinearRegIntercept { .. } => "LINEARREG_INTERCEPT",
            Statistic::LinearRegSlope { .. } => "LINEARREG_SLOPE",
            Statistic::StdDev { .. } => "STDDEV",
            Statistic::Tsf { .. } => "TSF",
            Statistic::Var { .. } => "VAR",
        }
    }

    fn family(&self) -> Family {
        Family::Statistic
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            Statistic::Beta { .. } | Statistic::Correl { .. } => &[Column::Open, Column::Close],
            _ => &[Column::Close],
        }
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Statistic::Beta { .. } => &["beta", "beta_slope"],
            Statistic::Correl { .. } => &["corr", "abs_corr_slope"],
            Statistic::LinearReg { .. } => &["linreg", "residual"],
            Statistic::LinearRegAngle { .. } => &["angle", "angle_slope"],
            Statistic::LinearRegIntercept { .. } => &["intercept", "intercept_slope"],
            Statistic::LinearRegSlope { .. } => &["slope", "acceleration"],
            Statistic::StdDev { .. } => &["std", "zscore"],
            Statistic::Tsf { .. } => &["forecast", "residual"],
            Statistic::Var { .. } => &["variance", "variance_slope"],
        }
    }

    fn warmup(&self) -> usize {
        let n = self.period();
        match self {
            Statistic::LinearReg { .. } | Statistic::StdDev { .. } | Statistic::Tsf { .. } => n - 1,
            _ => n,
        }
    }

    fn min_rows(&self) -> usize {
        let n = self.period();
        match self {
            Statistic::StdDev { .. } | Statistic::Tsf { .. } | Statistic::Var { .. } => n + 5,
            _ => n + 10,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let close = data.require(Column::Close, self.name())?;
        let n = self.period();

        // One value per rolling line fit, undefined where the window is short.
        let from_fits = |f: &dyn Fn(&LineFit) -> f64| -> Vec<f64> {
            series::rolling_line(close, n)
                .iter()
                .map(|fit| fit.as_ref().map_or(NAN, f))
                .collect()
        };
        let with_diff = |value: Vec<f64>| -> Vec<Vec<f64>> {
            let slope = series::diff(&value, 1);
            vec![value, slope]
        };
        let with_residual = |value: Vec<f64>| -> Vec<Vec<f64>> {
            let resid = series::zip_map(close, &value, |c, v| c - v);
            vec![value, resid]
        };

        let columns = match self {
            Statistic::Beta { .. } => {
                let open = data.require(Column::Open, self.name())?;
                let cov = series::rolling_cov(close, open, n);
                let var = series::rolling_variance(open, n, 1);
                with_diff(series::zip_map(&cov, &var, |c, v| c / v))
            }
            Statistic::Correl { .. } => {
                let open = data.require(Column::Open, self.name())?;
                let corr = series::rolling_corr(close, open, n);
                let abs: Vec<f64> = corr.iter().map(|r| r.abs()).collect();
                vec![corr, series::diff(&abs, 1)]
            }
            Statistic::LinearReg { .. } => with_residual(from_fits(&|fit| fit.at((n - 1) as f64))),
            Statistic::LinearRegAngle { .. } => with_diff(from_fits(&|fit| fit.slope.atan().to_degrees())),
            Statistic::LinearRegIntercept { .. } => with_diff(from_fits(&|fit| fit.intercept)),
            Statistic::LinearRegSlope { .. } => with_diff(from_fits(&|fit| fit.slope)),
            Statistic::StdDev { .. } => {
                let std = series::stddev(close, n, 0);
                let mean = series::sma(close, n);
                let z = (0..close.len()).map(|t| (close[t] - mean[t]) / std[t]).collect();
                vec![std, z]
            }
            Statistic::Tsf { .. } => with_residual(from_fits(&|fit| fit.at(n as f64))),
            Statistic::Var { .. } => with_diff(series::rolling_variance(close, n, 0)),
        };
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linearreg_on_straight_line() {
        let close: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64).collect();
        let frame = OhlcvFrame::from_close(close.clone());

        let lr = Statistic::LinearReg { period: 30 }.compute(&frame).unwrap();
        assert!(lr[0][28].is_nan());
        assert!((lr[0][40] - close[40]).abs() < 1e-9);
        assert!(lr[1][40].abs() < 1e-9);

        let tsf = Statistic::Tsf { period: 30 }.compute(&frame).unwrap();
        assert!((tsf[0][40] - (close[40] + 2.0)).abs() < 1e-9);

        let slope = Statistic::LinearRegSlope { period: 30 }.compute(&frame).unwrap();
        assert!((slope[0][40] - 2.0).abs() < 1e-9);
        assert!(slope[1][40].abs() < 1e-9);

        let angle = Statistic::LinearRegAngle { period: 30 }.compute(&frame).unwrap();
        assert!((angle[0][40] - 2.0f64.atan().to_degrees()).abs() < 1e-9);
    }

    #[test]
    fn test_beta_of_identical_series_is_one() {
        let close: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin()).collect();
        let frame = OhlcvFrame::from_close(close.clone())
            .with_column(Column::Open, close)
            .unwrap();
        let beta = Statistic::Beta { period: 30 }.compute(&frame).unwrap();
        assert!((beta[0][35] - 1.0).abs() < 1e-9);
        let corr = Statistic::Correl { period: 30 }.compute(&frame).unwrap();
        assert!((corr[0][35] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stddev_population() {
        let close = vec![1.0, 3.0, 1.0, 3.0];
        let frame = OhlcvFrame::from_close(close);
        let cols = Statistic::StdDev { period: 4 }.compute(&frame).unwrap();
        assert!((cols[0][3] - 1.0).abs() < 1e-12);
        assert!((cols[1][3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_beta_requires_open() {
        let frame = OhlcvFrame::from_close(vec![1.0; 50]);
        assert!(Statistic::Beta { period: 30 }.compute(&frame).is_err());
    }
}
