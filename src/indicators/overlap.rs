use serde::{Deserialize, Serialize};

use super::series::{self, NAN};
use super::{divergence, Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// Moving-average style studies that sit on top of price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Overlap {
    Bbands { period: usize, k: f64 },
    Dema { period: usize },
    Ema { period: usize },
    HtTrendline { alpha: f64 },
    Kama { er_period: usize, fast: usize, slow: usize },
    Ma { period: usize },
    Mama { fast: f64, slow: f64 },
    Mavp { min_period: usize, max_period: usize },
    Midpoint { period: usize },
    Sar { step: f64, max_step: f64 },
    T3 { period: usize, v_factor: f64 },
    Tema { period: usize },
    Trima { period: usize },
    Wma { period: usize },
}

const DIV_SLOPE_ROC5: &[&str] = &["div", "slope", "roc_5"];

impl Overlap {
    pub fn all() -> Vec<Overlap> {
        vec![
            Overlap::Bbands { period: 20, k: 2.0 },
            Overlap::Dema { period: 20 },
            Overlap::Ema { period: 20 },
            Overlap::HtTrendline { alpha: 0.07 },
            Overlap::Kama { er_period: 10, fast: 2, slow: 30 },
            Overlap::Ma { period: 20 },
            Overlap::Mama { fast: 0.5, slow: 0.05 },
            Overlap::Mavp { min_period: 10, max_period: 50 },
            Overlap::Midpoint { period: 14 },
            Overlap::Sar { step: 0.02, max_step: 0.2 },
            Overlap::T3 { period: 20, v_factor: 0.7 },
            Overlap::Tema { period: 20 },
            Overlap::Trima { period: 20 },
            Overlap::Wma { period: 20 },
        ]
    }

    /// Window lengths of the two stacked SMAs.
    fn trima_windows(period: usize) -> (usize, usize) {
        if period % 2 == 0 {
            (period / 2, period / 2 + 1)
        } else {
            ((period + 1) / 2, (period + 1) / 2)
        }
    }
}

impl Indicator for Overlap {
    fn name(&self) -> &'static str {
        match self {
            Overlap::Bbands { .. } => "BBANDS",
            Overlap::Dema { .. } => "DEMA",
            Overlap::Ema { .. } => "EMA",
            Overlap::HtTrendline { .. } => "HT_TRENDLINE",
            Overlap::Kama { .. } => "KAMA",
            Overlap::Ma { .. } => "MA",
            Overlap::Mama { .. } => "MAMA",
            Overlap::Mavp { .. } => "MAVP",
            Overlap::Midpoint { .. } => "MIDPOINT",
            Overlap::Sar { .. } => "SAR",
            Overlap::T3 { .. } => "T3",
            Overlap::Tema { .. } => "TEMA",
            Overlap::Trima { .. } => "TRIMA",
            Overlap::Wma { .. } => "WMA",
        }
    }

    fn family(&self) -> Family {
        Family::Overlap
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            Overlap::Mavp { .. } => &[Column::Close, Column::Volume],
            Overlap::Midpoint { .. } => &[Column::High, Column::Low, Column::Close],
            Overlap::Sar { .. } => &[Column::High, Column::Low, Column::Close],
            _ => &[Column::Close],
        }
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Overlap::Bbands { .. } => &["pct_b", "band_width", "sma_slope"],
            Overlap::HtTrendline { .. } => &["it_div", "it_slope", "cross_flag"],
            Overlap::Kama { .. } => &["kama_div", "kama_slope", "efficiency_ratio"],
            Overlap::Mama { .. } => &["mama_div", "mama_slope", "mama_fama_spread"],
            Overlap::Sar { .. } => &["sar_div", "sar_slope", "trend_flag"],
            _ => DIV_SLOPE_ROC5,
        }
    }

    fn warmup(&self) -> usize {
        match *self {
            Overlap::Bbands { period, .. } => period,
            Overlap::Dema { .. } | Overlap::Ema { .. } | Overlap::T3 { .. } | Overlap::Tema { .. } => 5,
            Overlap::HtTrendline { .. } | Overlap::Mama { .. } | Overlap::Sar { .. } => 1,
            Overlap::Kama { er_period, .. } => er_period,
            Overlap::Ma { period } | Overlap::Wma { period } | Overlap::Midpoint { period } => period.max(5),
            Overlap::Mavp { max_period, .. } => max_period.max(5),
            Overlap::Trima { period } => {
                let (a, b) = Self::trima_windows(period);
                (a + b - 1).max(5)
            }
        }
    }

    fn min_rows(&self) -> usize {
        match *self {
            Overlap::Bbands { .. } => 2,
            Overlap::Dema { .. } | Overlap::Ema { .. } => 30,
            Overlap::HtTrendline { .. } | Overlap::Kama { .. } | Overlap::Mama { .. } | Overlap::Sar { .. } => 50,
            Overlap::Mavp { max_period, .. } => max_period + 20,
            Overlap::T3 { period, .. } => period + 15,
            Overlap::Ma { period }
            | Overlap::Midpoint { period }
            | Overlap::Tema { period }
            | Overlap::Trima { period }
            | Overlap::Wma { period } => period + 10,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let close = data.require(Column::Close, self.name())?;
        let roc5 = series::pct_change(close, 5);

        let line_features = |line: Vec<f64>| -> Vec<Vec<f64>> {
            vec![divergence(close, &line), series::pct_change(&line, 1), roc5.clone()]
        };

        let columns = match *self {
            Overlap::Bbands { period, k } => {
                let mid = series::sma(close, period);
                let sd = series::stddev(close, period, 1);
                let pct_b = (0..close.len())
                    .map(|t| {
                        let lower = mid[t] - k * sd[t];
                        (close[t] - lower) / (2.0 * k * sd[t])
                    })
                    .collect();
                let width = series::zip_map(&mid, &sd, |m, s| 2.0 * k * s / m);
                let slope = series::zip_map(&series::diff(&mid, 1), &mid, |d, m| d / m);
                vec![pct_b, width, slope]
            }
            Overlap::Dema { period } => {
                let e1 = series::ema(close, period);
                let e2 = series::ema(&e1, period);
                line_features(series::zip_map(&e1, &e2, |a, b| 2.0 * a - b))
            }
            Overlap::Ema { period } => line_features(series::ema(close, period)),
            Overlap::HtTrendline { alpha } => {
                let it = instantaneous_trendline(close, alpha);
                let cross = series::zip_map(close, &it, |c, x| if c > x { 1.0 } else { -1.0 });
                vec![divergence(close, &it), series::pct_change(&it, 1), cross]
            }
            Overlap::Kama { er_period, fast, slow } => {
                let (kama, er) = kama(close, er_period, fast, slow);
                vec![divergence(close, &kama), series::pct_change(&kama, 1), er]
            }
            Overlap::Ma { period } => line_features(series::sma(close, period)),
            Overlap::Mama { fast, slow } => {
                let (mama, fama) = mesa_adaptive(close, fast, slow);
                let spread = series::zip_map(&mama, &fama, |m, f| (m - f) / m);
                vec![divergence(close, &mama), series::pct_change(&mama, 1), spread]
            }
            Overlap::Mavp { min_period, max_period } => {
                let volume = data.require(Column::Volume, self.name())?;
                line_features(variable_period_sma(close, volume, min_period, max_period))
            }
            Overlap::Midpoint { period } => {
                let high = data.require(Column::High, self.name())?;
                let low = data.require(Column::Low, self.name())?;
                let mid = series::zip_map(
                    &series::highest(high, period),
                    &series::lowest(low, period),
                    |h, l| (h + l) / 2.0,
                );
                line_features(mid)
            }
            Overlap::Sar { step, max_step } => {
                let high = data.require(Column::High, self.name())?;
                let low = data.require(Column::Low, self.name())?;
                let sar = ParabolicSar::new(step, step, max_step).series(high, low);
                sar_features(close, &sar)
            }
            Overlap::T3 { period, v_factor } => line_features(t3(close, period, v_factor)),
            Overlap::Tema { period } => {
                let e1 = series::ema(close, period);
                let e2 = series::ema(&e1, period);
                let e3 = series::ema(&e2, period);
                let tema = (0..close.len()).map(|t| 3.0 * e1[t] - 3.0 * e2[t] + e3[t]).collect();
                line_features(tema)
            }
            Overlap::Trima { period } => {
                let (a, b) = Self::trima_windows(period);
                line_features(series::sma(&series::sma(close, a), b))
            }
            Overlap::Wma { period } => line_features(series::wma(close, period)),
        };
        Ok(columns)
    }
}

/// SAR divergence, SAR percent slope and which side of price the SAR sits on.
pub(crate) fn sar_features(close: &[f64], sar: &[f64]) -> Vec<Vec<f64>> {
    let div = series::zip_map(close, sar, |c, s| (c - s) / c);
    let flag = series::zip_map(close, sar, |c, s| if s < c { 1.0 } else { -1.0 });
    vec![div, series::pct_change(sar, 1), flag]
}

/// Ehlers' instantaneous trendline, seeded with the first two prices.
pub fn instantaneous_trendline(close: &[f64], alpha: f64) -> Vec<f64> {
    let a1 = alpha - alpha.powi(2) / 4.0;
    let a2 = alpha.powi(2) / 2.0;
    let a3 = alpha - 3.0 * alpha.powi(2) / 4.0;
    let k1 = 2.0 * (1.0 - alpha);
    let k2 = (1.0 - alpha).powi(2);

    let mut it = close.to_vec();
    for t in 2..close.len() {
        it[t] = a1 * close[t] + a2 * close[t - 1] - a3 * close[t - 2] + k1 * it[t - 1] - k2 * it[t - 2];
    }
    it
}

/// Kaufman adaptive MA and its efficiency ratio. The MA is seeded with the
/// mean of the first `er_period` closes.
pub fn kama(close: &[f64], er_period: usize, fast: usize, slow: usize) -> (Vec<f64>, Vec<f64>) {
    let n = close.len();
    let mut kama = vec![NAN; n];
    let mut er = vec![NAN; n];
    if er_period == 0 || n < er_period {
        return (kama, er);
    }
    let fast_sc = 2.0 / (fast as f64 + 1.0);
    let slow_sc = 2.0 / (slow as f64 + 1.0);

    kama[er_period - 1] = series::mean(&close[..er_period]);
    for i in er_period..n {
        let change = (close[i] - close[i - er_period]).abs();
        let volatility: f64 = close[i - er_period..=i].windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        let ratio = if volatility == 0.0 { 0.0 } else { change / volatility };
        let sc = (ratio * (fast_sc - slow_sc) + slow_sc).powi(2);
        kama[i] = kama[i - 1] + sc * (close[i] - kama[i - 1]);
        er[i] = ratio;
    }
    (kama, er)
}

/// MAMA / FAMA pair with alpha driven by the absolute bar-to-bar change.
pub fn mesa_adaptive(close: &[f64], fast: f64, slow: f64) -> (Vec<f64>, Vec<f64>) {
    let mut mama = close.to_vec();
    let mut fama = close.to_vec();
    for i in 1..close.len() {
        let delta = (close[i] - close[i - 1]).abs();
        let alpha = slow + (fast - slow) * delta / (delta + 1e-10);
        mama[i] = alpha * close[i] + (1.0 - alpha) * mama[i - 1];
        fama[i] = 0.5 * alpha * mama[i] + (1.0 - 0.5 * alpha) * fama[i - 1];
    }
    (mama, fama)
}

/// SMA whose length follows the volume's position inside its running range.
pub fn variable_period_sma(close: &[f64], volume: &[f64], min_period: usize, max_period: usize) -> Vec<f64> {
    let mut out = vec![NAN; close.len()];
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for t in 0..close.len() {
        lo = lo.min(volume[t]);
        hi = hi.max(volume[t]);
        let norm = (volume[t] - lo) / (hi - lo + 1e-9);
        let period = (min_period as f64 + norm * (max_period - min_period) as f64).round_ties_even() as usize;
        if period > 0 && t + 1 >= period {
            out[t] = series::mean(&close[t + 1 - period..=t]);
        }
    }
    out
}

/// Tillson T3 over six cascaded EMAs.
pub fn t3(close: &[f64], period: usize, v: f64) -> Vec<f64> {
    let mut stages = Vec::with_capacity(6);
    let mut current = close.to_vec();
    for _ in 0..6 {
        current = series::ema(&current, period);
        stages.push(current.clone());
    }
    let c1 = -v.powi(3);
    let c2 = 3.0 * v.powi(2) + 3.0 * v.powi(3);
    let c3 = -6.0 * v.powi(2) - 3.0 * v - 3.0 * v.powi(3);
    let c4 = 1.0 + 3.0 * v + 3.0 * v.powi(2) + v.powi(3);
    (0..close.len())
        .map(|t| c1 * stages[5][t] + c2 * stages[4][t] + c3 * stages[3][t] + c4 * stages[2][t])
        .collect()
}

/// Wilder's parabolic stop-and-reverse. Starts long with the extreme point
/// at the first low.
#[derive(Debug, Clone, Copy)]
pub struct ParabolicSar {
    start: f64,
    step: f64,
    max: f64,
}

impl ParabolicSar {
    pub fn new(start: f64, step: f64, max: f64) -> Self {
        Self { start, step, max }
    }

    pub fn series(&self, high: &[f64], low: &[f64]) -> Vec<f64> {
        let n = high.len().min(low.len());
        let mut sar = vec![NAN; n];
        if n == 0 {
            return sar;
        }
        let mut bull = true;
        let mut af = self.start;
        let mut ep = low[0];
        sar[0] = low[0];

        for i in 1..n {
            let prev = sar[i - 1];
            let mut value = prev + af * (ep - prev);
            let back = if i > 1 { i - 2 } else { i - 1 };
            if bull {
                value = value.min(low[i - 1]).min(low[back]);
            } else {
                value = value.max(high[i - 1]).max(high[back]);
            }

            if bull && low[i] < value {
                bull = false;
                value = ep;
                ep = high[i];
                af = self.start;
            } else if !bull && high[i] > value {
                bull = true;
                value = ep;
                ep = low[i];
                af = self.start;
            } else if bull && high[i] > ep {
                ep = high[i];
                af = (af + self.step).min(self.max);
            } else if !bull && low[i] < ep {
                ep = low[i];
                af = (af + self.step).min(self.max);
            }
            sar[i] = value;
        }
        sar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_ma_divergence_positive_on_uptrend() {
        let close = rising(60);
        let frame = OhlcvFrame::from_close(close.clone());
        let cols = Overlap::Ma { period: 20 }.compute(&frame).unwrap();
        let ma = series::sma(&close, 20);
        for t in 20..60 {
            assert!(cols[0][t] > 0.0);
            assert!((cols[0][t] - (close[t] - ma[t]) / ma[t]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_trendline_has_unit_gain() {
        let close = vec![50.0; 200];
        let it = instantaneous_trendline(&close, 0.07);
        assert!((it[199] - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_kama_seed_and_flat_efficiency() {
        let close = vec![10.0; 30];
        let (k, er) = kama(&close, 10, 2, 30);
        assert!(k[8].is_nan());
        assert_eq!(k[9], 10.0);
        assert_eq!(er[15], 0.0);
        assert_eq!(k[29], 10.0);
    }

    #[test]
    fn test_trima_windows() {
        assert_eq!(Overlap::trima_windows(20), (10, 11));
        assert_eq!(Overlap::trima_windows(9), (5, 5));
        assert_eq!(Overlap::Trima { period: 20 }.warmup(), 20);
    }

    #[test]
    fn test_t3_constant_series() {
        let out = t3(&vec![7.0; 40], 5, 0.7);
        assert!((out[39] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_sar_follows_uptrend() {
        let high: Vec<f64> = (0..40).map(|i| 101.0 + i as f64).collect();
        let low: Vec<f64> = (0..40).map(|i| 99.0 + i as f64).collect();
        let sar = ParabolicSar::new(0.02, 0.02, 0.2).series(&high, &low);
        for t in 1..40 {
            assert!(sar[t] < low[t]);
        }
    }

    #[test]
    fn test_mavp_uses_min_period_for_flat_volume() {
        let close = rising(30);
        let out = variable_period_sma(&close, &vec![5.0; 30], 10, 50);
        assert!(out[8].is_nan());
        assert!((out[9] - series::mean(&close[..10])).abs() < 1e-12);
    }

    #[test]
    fn test_bbands_pct_b_midline() {
        let close: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
        let frame = OhlcvFrame::from_close(close);
        let cols = Overlap::Bbands { period: 20, k: 2.0 }.compute(&frame).unwrap();
        assert!(cols[0][39] > 0.5 && cols[0][39] < 1.0);
        assert!(cols[1][39] > 0.0);
    }
}
