use serde::{Deserialize, Serialize};

use super::series::{self, NAN};
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// Cumulative volume-flow lines, normalised by cumulative volume or price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeFlow {
    Ad,
    AdOsc { fast: usize, slow: usize },
    Obv,
}

impl VolumeFlow {
    pub fn all() -> Vec<VolumeFlow> {
        vec![VolumeFlow::Ad, VolumeFlow::AdOsc { fast: 3, slow: 10 }, VolumeFlow::Obv]
    }
}

impl Indicator for VolumeFlow {
    fn name(&self) -> &'static str {
        match self {
            VolumeFlow::Ad => "AD",
            VolumeFlow::AdOsc { .. } => "ADOSC",
            VolumeFlow::Obv => "OBV",
        }
    }

    fn family(&self) -> Family {
        Family::Volume
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            VolumeFlow::Obv => &[Column::Close, Column::Volume],
            _ => &[Column::High, Column::Low, Column::Close, Column::Volume],
        }
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            VolumeFlow::Ad => &["ad_norm", "ad_slope", "roc_3"],
            VolumeFlow::AdOsc { .. } => &["adosc_norm", "adosc_slope", "roc_3"],
            VolumeFlow::Obv => &["obv_norm", "obv_slope", "roc_3"],
        }
    }

    fn warmup(&self) -> usize {
        3
    }

    fn min_rows(&self) -> usize {
        30
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let close = data.require(Column::Close, self.name())?;
        let volume = data.require(Column::Volume, self.name())?;
        let roc3 = series::pct_change(close, 3);
        let cum_volume = series::cumsum(volume);

        let columns = match *self {
            VolumeFlow::Ad => {
                let ad = accumulation_distribution(data, self.name())?;
                let norm = series::ratio(&ad, &cum_volume);
                let slope = series::diff(&norm, 1);
                vec![norm, slope, roc3]
            }
            VolumeFlow::AdOsc { fast, slow } => {
                let ad = accumulation_distribution(data, self.name())?;
                let osc = series::zip_map(
                    &series::ema_adjusted(&ad, fast),
                    &series::ema_adjusted(&ad, slow),
                    |f, s| f - s,
                );
                let norm = series::zip_map(&osc, close, |o, c| o / c);
                let slope = series::diff(&osc, 1);
                vec![norm, slope, roc3]
            }
            VolumeFlow::Obv => {
                let obv = on_balance_volume(close, volume);
                let norm = series::ratio(&obv, &cum_volume);
                let slope = series::diff(&norm, 1);
                vec![norm, slope, roc3]
            }
        };
        Ok(columns)
    }
}

/// Chaikin accumulation/distribution line. Bars with no range contribute an
/// undefined money-flow multiplier.
pub fn accumulation_distribution(data: &OhlcvFrame, indicator: &str) -> Result<Vec<f64>> {
    let high = data.require(Column::High, indicator)?;
    let low = data.require(Column::Low, indicator)?;
    let close = data.require(Column::Close, indicator)?;
    let volume = data.require(Column::Volume, indicator)?;

    let flow: Vec<f64> = (0..close.len())
        .map(|t| {
            let range = high[t] - low[t];
            if range == 0.0 {
                return NAN;
            }
            let multiplier = ((close[t] - low[t]) - (high[t] - close[t])) / range;
            multiplier * volume[t]
        })
        .collect();
    Ok(series::cumsum(&flow))
}

/// Running sum of volume signed by the close-to-close direction. The first
/// bar has no direction and adds nothing.
pub fn on_balance_volume(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let signed: Vec<f64> = (0..close.len())
        .map(|t| {
            let direction = if t == 0 { 0.0 } else { sign(close[t] - close[t - 1]) };
            direction * volume[t]
        })
        .collect();
    series::cumsum(&signed)
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_direction() {
        let close = vec![10.0, 11.0, 11.0, 10.5];
        let volume = vec![100.0, 200.0, 300.0, 400.0];
        assert_eq!(on_balance_volume(&close, &volume), vec![0.0, 200.0, 200.0, -200.0]);
    }

    #[test]
    fn test_obv_normalised_by_cumulative_volume() {
        let frame = OhlcvFrame::from_close(vec![10.0, 11.0, 12.0, 13.0, 14.0])
            .with_column(Column::Volume, vec![10.0; 5])
            .unwrap();
        let cols = VolumeFlow::Obv.compute(&frame).unwrap();
        assert!((cols[0][4] - 40.0 / 50.0).abs() < 1e-12);
        assert!((cols[1][4] - (0.8 - 0.75)).abs() < 1e-12);
    }

    #[test]
    fn test_ad_closing_at_high_accumulates() {
        let frame = OhlcvFrame::from_ohlcv(
            vec![1.0; 4],
            vec![2.0; 4],
            vec![1.0; 4],
            vec![2.0; 4],
            vec![5.0; 4],
        )
        .unwrap();
        let ad = accumulation_distribution(&frame, "AD").unwrap();
        assert_eq!(ad, vec![5.0, 10.0, 15.0, 20.0]);
        let cols = VolumeFlow::Ad.compute(&frame).unwrap();
        assert!((cols[0][3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_bar_is_undefined() {
        let frame = OhlcvFrame::from_ohlcv(
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![5.0, 5.0],
        )
        .unwrap();
        let ad = accumulation_distribution(&frame, "AD").unwrap();
        assert_eq!(ad[0], 5.0);
        assert!(ad[1].is_nan());
    }

    #[test]
    fn test_adosc_flat_line_is_zero() {
        let n = 20;
        let frame = OhlcvFrame::from_ohlcv(
            vec![1.0; n],
            vec![2.0; n],
            vec![1.0; n],
            vec![1.5; n],
            vec![5.0; n],
        )
        .unwrap();
        let cols = VolumeFlow::AdOsc { fast: 3, slow: 10 }.compute(&frame).unwrap();
        assert!(cols[0][10].abs() < 1e-12);
    }
}
