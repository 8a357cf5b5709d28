use serde::{Deserialize, Serialize};

use super::series;
use super::{divergence, Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// True-range based volatility, normalised by price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Volatility {
    Atr { period: usize },
    Natr { period: usize },
    Trange,
}

impl Volatility {
    pub fn all() -> Vec<Volatility> {
        vec![
            Volatility::Atr { period: 14 },
            Volatility::Natr { period: 14 },
            Volatility::Trange,
        ]
    }
}

impl Indicator for Volatility {
    fn name(&self) -> &'static str {
        match self {
            Volatility::Atr { .. } => "ATR",
            Volatility::Natr { .. } => "NATR",
            Volatility::Trange => "TRANGE",
        }
    }

    fn family(&self) -> Family {
        Family::Volatility
    }

    fn columns(&self) -> &'static [Column] {
        &[Column::High, Column::Low, Column::Close]
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Volatility::Atr { .. } => &["atr_pct", "atr_pct_change", "roc_3"],
            Volatility::Natr { .. } => &["natr", "natr_slope", "roc_3"],
            Volatility::Trange => &["tr_pct", "tr_slope", "roc_3"],
        }
    }

    fn warmup(&self) -> usize {
        match *self {
            Volatility::Atr { period } | Volatility::Natr { period } => period.max(3),
            Volatility::Trange => 3,
        }
    }

    fn min_rows(&self) -> usize {
        match *self {
            Volatility::Atr { period } | Volatility::Natr { period } => period + 10,
            Volatility::Trange => 30,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let high = data.require(Column::High, self.name())?;
        let low = data.require(Column::Low, self.name())?;
        let close = data.require(Column::Close, self.name())?;
        let tr = series::true_range(high, low, close);
        let roc3 = series::pct_change(close, 3);

        let columns = match *self {
            Volatility::Atr { period } => {
                let atr_pct = series::zip_map(&series::sma(&tr, period), close, |a, c| a / c);
                let change = series::pct_change(&atr_pct, 1);
                vec![atr_pct, change, roc3]
            }
            Volatility::Natr { period } => {
                // NATR is 100 * ATR / close, kept on a 0-1 scale
                let natr = series::zip_map(&series::sma(&tr, period), close, |a, c| 100.0 * a / c / 100.0);
                let slope = series::diff(&natr, 1);
                vec![natr, slope, roc3]
            }
            Volatility::Trange => {
                let tr_pct = series::zip_map(&tr, close, |r, c| r / c);
                let slope = series::diff(&tr_pct, 1);
                vec![tr_pct, slope, roc3]
            }
        };
        Ok(columns)
    }
}

/// Average price `(open + high + low + close) / 4` and the close's distance
/// from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvgPrice;

impl Indicator for AvgPrice {
    fn name(&self) -> &'static str {
        "AVGPRICE"
    }

    fn family(&self) -> Family {
        Family::PriceTransform
    }

    fn columns(&self) -> &'static [Column] {
        &[Column::Open, Column::High, Column::Low, Column::Close]
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["divergence", "avg_price_change", "roc_3"]
    }

    fn warmup(&self) -> usize {
        3
    }

    fn min_rows(&self) -> usize {
        30
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let candles = data.candles(self.name())?;
        let close = data.require(Column::Close, self.name())?;
        let avg: Vec<f64> = candles.iter().map(|c| c.ohlc4()).collect();
        Ok(vec![
            divergence(close, &avg),
            series::pct_change(&avg, 1),
            series::pct_change(close, 3),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> OhlcvFrame {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.3).sin() * 3.0).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let open: Vec<f64> = close.iter().map(|c| c - 0.2).collect();
        let volume = vec![1_000.0; n];
        OhlcvFrame::from_ohlcv(open, high, low, close, volume).unwrap()
    }

    #[test]
    fn test_atr_and_natr_agree() {
        let data = frame(60);
        let atr = Volatility::Atr { period: 14 }.compute(&data).unwrap();
        let natr = Volatility::Natr { period: 14 }.compute(&data).unwrap();
        assert!(atr[0][12].is_nan());
        for t in 14..60 {
            assert!((atr[0][t] - natr[0][t]).abs() < 1e-12);
            assert!(atr[0][t] > 0.0);
        }
    }

    #[test]
    fn test_trange_uses_previous_close() {
        let data = OhlcvFrame::from_ohlcv(
            vec![10.0, 12.0],
            vec![10.5, 12.5],
            vec![9.5, 11.5],
            vec![10.0, 12.0],
            vec![1.0, 1.0],
        )
        .unwrap();
        let cols = Volatility::Trange.compute(&data).unwrap();
        assert!((cols[0][0] - 0.1).abs() < 1e-12);
        // |12.5 - 10.0| dominates the bar's own range
        assert!((cols[0][1] - 2.5 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_avgprice_divergence() {
        let data = OhlcvFrame::from_ohlcv(
            vec![9.0; 4],
            vec![11.0; 4],
            vec![8.0; 4],
            vec![12.0; 4],
            vec![1.0; 4],
        )
        .unwrap();
        let cols = AvgPrice.compute(&data).unwrap();
        assert!((cols[0][3] - 0.2).abs() < 1e-12);
        assert_eq!(cols[1][3], 0.0);
        assert_eq!(cols[2][3], 0.0);
    }

    #[test]
    fn test_volatility_needs_high_low() {
        let data = OhlcvFrame::from_close(vec![1.0; 40]);
        assert!(Volatility::Atr { period: 14 }.compute(&data).is_err());
        assert!(AvgPrice.compute(&data).is_err());
    }
}
