use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::Result;
use crate::indicators::Indicator;
use crate::types::{Column, OhlcvFrame};

/// Indicator features aligned with the bars they describe, trimmed to the
/// rows where every feature is defined.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    names: Vec<String>,
    rows: Array2<f64>,
    close: Vec<f64>,
    start: usize,
}

impl FeatureFrame {
    /// Runs `indicator` over `data` and cleans the result: infinities become
    /// missing, gaps are forward-filled, and leading rows that are still
    /// undefined (or inside the warm-up) are dropped.
    pub fn extract(indicator: &dyn Indicator, data: &OhlcvFrame) -> Result<Self> {
        for &column in indicator.columns() {
            data.require(column, indicator.name())?;
        }
        let close = data.require(Column::Close, indicator.name())?;

        let mut columns = indicator.compute(data)?;
        for column in columns.iter_mut() {
            sanitise(column);
        }

        let defined_from = columns
            .iter()
            .map(|c| c.iter().position(|v| v.is_finite()).unwrap_or(data.len()))
            .max()
            .unwrap_or(0);
        let start = indicator.warmup().max(defined_from).min(data.len());
        let n = data.len() - start;

        let mut rows = Array2::<f64>::zeros((n, columns.len()));
        for (j, column) in columns.iter().enumerate() {
            for i in 0..n {
                rows[[i, j]] = column[start + i];
            }
        }

        debug!(
            "{}: {} feature rows from {} bars (first kept row {})",
            indicator.name(),
            n,
            data.len(),
            start
        );

        Ok(Self {
            names: indicator.feature_names().iter().map(|s| s.to_string()).collect(),
            rows,
            close: close[start..].to_vec(),
            start,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &Array2<f64> {
        &self.rows
    }

    /// Index in the source bars of the first feature row.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Whether the next close is higher, for every row but the last.
    pub fn labels(&self) -> Vec<bool> {
        self.close.windows(2).map(|w| w[1] > w[0]).collect()
    }

    /// Feature rows paired with their labels. The final row has no next
    /// close and is left out.
    pub fn training_set(&self) -> (Array2<f64>, Vec<bool>) {
        let labels = self.labels();
        let n = labels.len();
        let x = self.rows.slice(ndarray::s![..n, ..]).to_owned();
        (x, labels)
    }

    /// The most recent feature row.
    pub fn last_row(&self) -> Option<Array1<f64>> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        Some(self.rows.row(n - 1).to_owned())
    }
}

/// Infinite values become NaN, then every NaN after the first defined
/// value takes the previous defined value. Leading NaNs stay.
pub fn sanitise(column: &mut [f64]) {
    let mut last: Option<f64> = None;
    for v in column.iter_mut() {
        if v.is_infinite() {
            *v = f64::NAN;
        }
        if v.is_nan() {
            if let Some(prev) = last {
                *v = prev;
            }
        } else {
            last = Some(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{Overlap, Statistic};

    #[test]
    fn test_sanitise_forward_fills_only() {
        let mut col = vec![f64::NAN, 1.0, f64::INFINITY, f64::NAN, 2.0, f64::NEG_INFINITY];
        sanitise(&mut col);
        assert!(col[0].is_nan());
        assert_eq!(&col[1..], &[1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_extract_trims_warmup() {
        let close: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let frame = OhlcvFrame::from_close(close);
        let ema = Overlap::Ema { period: 21 };
        let features = FeatureFrame::extract(&ema, &frame).unwrap();
        assert_eq!(features.len(), 80 - ema.warmup());
        assert_eq!(features.start(), ema.warmup());
        assert!(features.rows().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_labels_exclude_last_row() {
        let close = vec![1.0, 2.0, 1.5, 1.5, 3.0, 4.0, 3.0, 5.0, 6.0, 7.0, 8.0];
        let frame = OhlcvFrame::from_close(close);
        let features = FeatureFrame::extract(&Statistic::Var { period: 3 }, &frame).unwrap();
        let (x, y) = features.training_set();
        assert_eq!(x.nrows(), features.len() - 1);
        assert_eq!(y.len(), features.len() - 1);
        // starts at row 3: 1.5 -> 3.0 -> 4.0 -> 3.0 ...
        assert_eq!(&y[..3], &[true, true, false]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let frame = OhlcvFrame::from_close(vec![1.0; 50]);
        let err = FeatureFrame::extract(&Overlap::Sar { step: 0.02, max_step: 0.2 }, &frame).unwrap_err();
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn test_short_history_gives_empty_frame() {
        let frame = OhlcvFrame::from_close(vec![1.0, 2.0, 3.0]);
        let features = FeatureFrame::extract(&Overlap::Ema { period: 21 }, &frame).unwrap();
        assert!(features.is_empty());
        assert!(features.last_row().is_none());
    }
}
