use serde::{Deserialize, Serialize};

use super::overlap::{sar_features, ParabolicSar};
use super::series::{self, NAN};
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// Smoothing used by each leg of MACDEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaType {
    Sma,
    Ema,
    Wma,
}

impl MaType {
    pub fn apply(&self, values: &[f64], period: usize) -> Vec<f64> {
        match self {
            MaType::Sma => series::sma(values, period),
            MaType::Ema => series::ema(values, period),
            MaType::Wma => series::wma(values, period),
        }
    }

    /// Rows consumed before the first output, given defined input.
    fn lag(&self, period: usize) -> usize {
        match self {
            MaType::Ema => 0,
            MaType::Sma | MaType::Wma => period.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Momentum {
    Adx { period: usize },
    Adxr { period: usize },
    Apo { fast: usize, slow: usize },
    Aroon { period: usize },
    AroonOsc { period: usize },
    Bop,
    Cci { period: usize },
    Cmo { period: usize },
    Dx { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    MacdExt { fast: usize, slow: usize, signal: usize, fast_ma: MaType, slow_ma: MaType, signal_ma: MaType },
    MacdFix { signal: usize },
    Mfi { period: usize },
    MinusDi { period: usize },
    MinusDm { period: usize },
    Mom { period: usize },
    PlusDm { period: usize },
    Ppo { fast: usize, slow: usize },
    Roc { period: usize },
    Rocp { period: usize },
    Rocr { period: usize },
    Rsi { period: usize },
    SarExt { start: f64, step: f64, max_step: f64 },
    Stoch { period: usize, d_period: usize },
    StochF { period: usize, d_period: usize },
    StochRsi { rsi_period: usize, stoch_period: usize },
    Trix { period: usize },
    UltOsc { short: usize, medium: usize, long: usize },
    WillR { period: usize },
}

const HLC: &[Column] = &[Column::High, Column::Low, Column::Close];

impl Momentum {
    pub fn all() -> Vec<Momentum> {
        vec![
            Momentum::Adx { period: 14 },
            Momentum::Adxr { period: 14 },
            Momentum::Apo { fast: 12, slow: 26 },
            Momentum::Aroon { period: 25 },
            Momentum::AroonOsc { period: 25 },
            Momentum::Bop,
            Momentum::Cci { period: 20 },
            Momentum::Cmo { period: 14 },
            Momentum::Dx { period: 14 },
            Momentum::Macd { fast: 12, slow: 26, signal: 9 },
            Momentum::MacdExt {
                fast: 12,
                slow: 26,
                signal: 9,
                fast_ma: MaType::Ema,
                slow_ma: MaType::Ema,
                signal_ma: MaType::Sma,
            },
            Momentum::MacdFix { signal: 9 },
            Momentum::Mfi { period: 14 },
            Momentum::MinusDi { period: 14 },
            Momentum::MinusDm { period: 14 },
            Momentum::Mom { period: 10 },
            Momentum::PlusDm { period: 14 },
            Momentum::Ppo { fast: 12, slow: 26 },
            Momentum::Roc { period: 10 },
            Momentum::Rocp { period: 10 },
            Momentum::Rocr { period: 10 },
            Momentum::Rsi { period: 14 },
            Momentum::SarExt { start: 0.02, step: 0.02, max_step: 0.2 },
            Momentum::Stoch { period: 14, d_period: 3 },
            Momentum::StochF { period: 14, d_period: 3 },
            Momentum::StochRsi { rsi_period: 14, stoch_period: 14 },
            Momentum::Trix { period: 15 },
            Momentum::UltOsc { short: 7, medium: 14, long: 28 },
            Momentum::WillR { period: 14 },
        ]
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &'static str {
        match self {
            Momentum::Adx { .. } => "ADX",
            Momentum::Adxr { .. } => "ADXR",
            Momentum::Apo { .. } => "APO",
            Momentum::Aroon { .. } => "AROON",
            Momentum::AroonOsc { .. } => "AROONOSC",
            Momentum::Bop => "BOP",
            Momentum::Cci { .. } => "CCI",
            Momentum::Cmo { .. } => "CMO",
            Momentum::Dx { .. } => "DX",
            Momentum::Macd { .. } => "MACD",
            Momentum::MacdExt { .. } => "MACDEXT",
            Momentum::MacdFix { .. } => "MACDFIX",
            Momentum::Mfi { .. } => "MFI",
            Momentum::MinusDi { .. } => "MINUS_DI",
            Momentum::MinusDm { .. } => "MINUS_DM",
            Momentum::Mom { .. } => "MOM",
            Momentum::PlusDm { .. } => "PLUS_DM",
            Momentum::Ppo { .. } => "PPO",
            Momentum::Roc { .. } => "ROC",
            Momentum::Rocp { .. } => "ROCP",
            Momentum::Rocr { .. } => "ROCR",
            Momentum::Rsi { .. } => "RSI",
            Momentum::SarExt { .. } => "SAREXT",
            Momentum::Stoch { .. } => "STOCH",
            Momentum::StochF { .. } => "STOCHF",
            Momentum::StochRsi { .. } => "STOCHRSI",
            Momentum::Trix { .. } => "TRIX",
            Momentum::UltOsc { .. } => "ULTOSC",
            Momentum::WillR { .. } => "WILLR",
        }
    }

    fn family(&self) -> Family {
        Family::Momentum
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            Momentum::Adx { .. }
            | Momentum::Adxr { .. }
            | Momentum::Aroon { .. }
            | Momentum::AroonOsc { .. }
            | Momentum::Cci { .. }
            | Momentum::Dx { .. }
            | Momentum::MinusDi { .. }
            | Momentum::MinusDm { .. }
            | Momentum::PlusDm { .. }
            | Momentum::SarExt { .. }
            | Momentum::Stoch { .. }
            | Momentum::StochF { .. }
            | Momentum::UltOsc { .. }
            | Momentum::WillR { .. } => HLC,
            Momentum::Bop => &[Column::Open, Column::High, Column::Low, Column::Close],
            Momentum::Mfi { .. } => &[Column::High, Column::Low, Column::Close, Column::Volume],
            _ => &[Column::Close],
        }
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Momentum::Adx { .. } => &["adx", "di_spread", "dx"],
            Momentum::Adxr { .. } => &["adxr", "di_spread", "dx"],
            Momentum::Apo { .. } => &["apo_norm", "apo_slope", "roc_5"],
            Momentum::Aroon { .. } => &["aroon_up", "aroon_down", "aroon_osc"],
            Momentum::AroonOsc { .. } => &["aroon_osc", "osc_slope", "roc_3"],
            Momentum::Bop => &["bop", "bop_sma5", "bop_slope"],
            Momentum::Cci { .. } => &["cci", "cci_slope", "roc_3"],
            Momentum::Cmo { .. } => &["cmo", "cmo_slope", "roc_3"],
            Momentum::Dx { .. } => &["dx", "di_spread", "prev_adx"],
            Momentum::Macd { .. } => &["hist_norm", "hist_slope", "roc_5"],
            Momentum::MacdExt { .. } => &["hist_norm", "macd_slope", "roc_5"],
            Momentum::MacdFix { .. } => &["hist_norm", "signal_norm", "roc_5"],
            Momentum::Mfi { .. } => &["mfi", "mfi_slope", "roc_3"],
            Momentum::MinusDi { .. } => &["minus_di", "minus_di_slope", "roc_3"],
            Momentum::MinusDm { .. } => &["minus_dm", "minus_dm_slope", "roc_3"],
            Momentum::Mom { .. } => &["mom_norm", "mom_slope", "roc_3"],
            Momentum::PlusDm { .. } => &["plus_dm", "plus_dm_slope", "roc_3"],
            Momentum::Ppo { .. } => &["ppo", "ppo_slope", "roc_5"],
            Momentum::Roc { .. } => &["roc", "roc_slope", "roc_3"],
            Momentum::Rocp { .. } => &["rocp", "rocp_slope", "roc_3"],
            Momentum::Rocr { .. } => &["rocr", "rocr_slope", "roc_3"],
            Momentum::Rsi { .. } => &["rsi", "rsi_slope", "roc_3"],
            Momentum::SarExt { .. } => &["sarx_div", "sarx_slope", "trend_flag"],
            Momentum::Stoch { .. } | Momentum::StochF { .. } => &["k", "d", "k_d_spread"],
            Momentum::StochRsi { .. } => &["stoch_rsi", "stoch_rsi_slope", "roc_3"],
            Momentum::Trix { .. } => &["trix", "trix_slope", "roc_3"],
            Momentum::UltOsc { .. } => &["ultosc", "ultosc_slope", "roc_3"],
            Momentum::WillR { .. } => &["willr", "willr_slope", "roc_3"],
        }
    }

    fn warmup(&self) -> usize {
        match *self {
            Momentum::Adx { period } => 2 * period - 2,
            Momentum::Adxr { period } => 3 * period - 2,
            Momentum::Dx { period } | Momentum::Cci { period } => 2 * period - 1,
            Momentum::Apo { .. }
            | Momentum::Macd { .. }
            | Momentum::MacdFix { .. }
            | Momentum::Ppo { .. } => 5,
            Momentum::MacdExt { fast, slow, signal, fast_ma, slow_ma, signal_ma } => {
                let macd = fast_ma.lag(fast).max(slow_ma.lag(slow));
                (macd + signal_ma.lag(signal)).max(macd + 1).max(5)
            }
            Momentum::Aroon { period }
            | Momentum::Mfi { period }
            | Momentum::MinusDi { period }
            | Momentum::MinusDm { period }
            | Momentum::PlusDm { period }
            | Momentum::WillR { period } => period.max(3),
            Momentum::AroonOsc { period }
            | Momentum::Cmo { period }
            | Momentum::Mom { period }
            | Momentum::Roc { period }
            | Momentum::Rocp { period }
            | Momentum::Rocr { period } => (period + 1).max(3),
            Momentum::Bop => 4,
            Momentum::Rsi { .. } | Momentum::Trix { .. } => 3,
            Momentum::SarExt { .. } => 1,
            Momentum::Stoch { period, d_period } | Momentum::StochF { period, d_period } => {
                (period + d_period - 2).max(3)
            }
            Momentum::StochRsi { stoch_period, .. } => (stoch_period + 1).max(3),
            Momentum::UltOsc { long, .. } => long + 1,
        }
    }

    fn min_rows(&self) -> usize {
        match *self {
            Momentum::Adx { period }
            | Momentum::Adxr { period }
            | Momentum::Mfi { period }
            | Momentum::MinusDi { period }
            | Momentum::MinusDm { period }
            | Momentum::PlusDm { period }
            | Momentum::Mom { period }
            | Momentum::Roc { period }
            | Momentum::Rocp { period }
            | Momentum::Rocr { period }
            | Momentum::Rsi { period }
            | Momentum::Stoch { period, .. }
            | Momentum::WillR { period } => period + 10,
            Momentum::Cci { period } | Momentum::Cmo { period } | Momentum::Dx { period } => period + 11,
            Momentum::Apo { slow, .. } | Momentum::Ppo { slow, .. } => slow + 10,
            Momentum::Aroon { period } | Momentum::AroonOsc { period } | Momentum::StochF { period, .. } => period + 5,
            Momentum::Bop => 31,
            Momentum::Macd { slow, signal, .. } | Momentum::MacdExt { slow, signal, .. } => slow + signal + 10,
            Momentum::MacdFix { .. } | Momentum::SarExt { .. } => 50,
            Momentum::StochRsi { rsi_period, stoch_period } => rsi_period.max(stoch_period) + 10,
            Momentum::Trix { period } => 3 * period + 10,
            Momentum::UltOsc { .. } => 40,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let name = self.name();
        let close = data.require(Column::Close, name)?;
        let roc3 = series::pct_change(close, 3);
        let roc5 = series::pct_change(close, 5);

        // value, first difference of value, 3-bar close ROC
        let with_slope = |value: Vec<f64>| -> Vec<Vec<f64>> {
            let slope = series::diff(&value, 1);
            vec![value, slope, roc3.clone()]
        };

        let columns = match *self {
            Momentum::Adx { period } => {
                let dm = directional(data, name, period)?;
                vec![
                    series::scale(&dm.adx, 0.01),
                    dm.di_spread(),
                    series::scale(&dm.dx, 0.01),
                ]
            }
            Momentum::Adxr { period } => {
                let dm = directional(data, name, period)?;
                let lagged = series::shift(&dm.adx, period);
                let adxr = series::zip_map(&dm.adx, &lagged, |a, b| (a + b) / 200.0);
                vec![adxr, dm.di_spread(), series::scale(&dm.dx, 0.01)]
            }
            Momentum::Dx { period } => {
                let dm = directional(data, name, period)?;
                vec![
                    series::scale(&dm.dx, 0.01),
                    dm.di_spread(),
                    series::scale(&series::shift(&dm.adx, 1), 0.01),
                ]
            }
            Momentum::MinusDi { period } => {
                with_slope(series::scale(&directional(data, name, period)?.minus_di, 0.01))
            }
            Momentum::MinusDm { period } => with_slope(directional(data, name, period)?.minus_dm_ratio),
            Momentum::PlusDm { period } => with_slope(directional(data, name, period)?.plus_dm_ratio),
            Momentum::Apo { fast, slow } => {
                let apo = series::zip_map(&series::ema(close, fast), &series::ema(close, slow), |f, s| f - s);
                vec![series::zip_map(&apo, close, |a, c| a / c), series::pct_change(&apo, 1), roc5]
            }
            Momentum::Aroon { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let (up, down) = aroon(high, low, period);
                let osc = series::zip_map(&up, &down, |u, d| (u - d) / 100.0);
                vec![series::scale(&up, 0.01), series::scale(&down, 0.01), osc]
            }
            Momentum::AroonOsc { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let (up, down) = aroon(high, low, period);
                with_slope(series::zip_map(&up, &down, |u, d| (u - d) / 100.0))
            }
            Momentum::Bop => {
                let open = data.require(Column::Open, name)?;
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let bop: Vec<f64> = (0..close.len())
                    .map(|t| {
                        let range = high[t] - low[t];
                        if range == 0.0 {
                            NAN
                        } else {
                            (close[t] - open[t]) / range
                        }
                    })
                    .collect();
                let smoothed = series::sma(&bop, 5);
                let slope = series::diff(&bop, 1);
                vec![bop, smoothed, slope]
            }
            Momentum::Cci { period } => {
                let tp = typical_price(data, name)?;
                let mid = series::sma(&tp, period);
                let deviation: Vec<f64> = series::zip_map(&tp, &mid, |p, m| (p - m).abs());
                let mean_dev = series::sma(&deviation, period);
                let cci = (0..tp.len())
                    .map(|t| (tp[t] - mid[t]) / (0.015 * mean_dev[t]) / 200.0)
                    .collect();
                with_slope(cci)
            }
            Momentum::Cmo { period } => {
                let (gains, losses) = split_changes(close);
                let up = series::rolling_sum(&gains, period);
                let dn = series::rolling_sum(&losses, period);
                let cmo = series::zip_map(&up, &dn, |u, d| {
                    let denom = u + d;
                    if denom == 0.0 {
                        0.0
                    } else {
                        (u - d) / denom
                    }
                });
                with_slope(cmo)
            }
            Momentum::Macd { fast, slow, signal } => {
                let (macd, sig) = macd_lines(close, fast, slow, signal, MaType::Ema, MaType::Ema, MaType::Ema);
                let hist = series::zip_map(&macd, &sig, |m, s| m - s);
                vec![
                    series::zip_map(&hist, close, |h, c| h / c),
                    series::zip_map(&series::diff(&hist, 1), close, |d, c| d / c),
                    roc5,
                ]
            }
            Momentum::MacdExt { fast, slow, signal, fast_ma, slow_ma, signal_ma } => {
                let (macd, sig) = macd_lines(close, fast, slow, signal, fast_ma, slow_ma, signal_ma);
                let hist = series::zip_map(&macd, &sig, |m, s| m - s);
                vec![
                    series::zip_map(&hist, close, |h, c| h / c),
                    series::zip_map(&series::diff(&macd, 1), close, |d, c| d / c),
                    roc5,
                ]
            }
            Momentum::MacdFix { signal } => {
                let (macd, sig) = macd_lines(close, 12, 26, signal, MaType::Ema, MaType::Ema, MaType::Ema);
                let hist = series::zip_map(&macd, &sig, |m, s| m - s);
                vec![
                    series::zip_map(&hist, close, |h, c| h / c),
                    series::zip_map(&sig, close, |s, c| s / c),
                    roc5,
                ]
            }
            Momentum::Mfi { period } => {
                let volume = data.require(Column::Volume, name)?;
                let tp = typical_price(data, name)?;
                let mut pos = vec![0.0; tp.len()];
                let mut neg = vec![0.0; tp.len()];
                for t in 1..tp.len() {
                    let flow = tp[t] * volume[t];
                    if tp[t] > tp[t - 1] {
                        pos[t] = flow;
                    } else if tp[t] < tp[t - 1] {
                        neg[t] = flow;
                    }
                }
                let mfi = series::zip_map(&series::rolling_sum(&pos, period), &series::rolling_sum(&neg, period), |p, n| {
                    if p + n == 0.0 {
                        0.0
                    } else {
                        p / (p + n)
                    }
                });
                with_slope(mfi)
            }
            Momentum::Mom { period } => {
                let mom = series::diff(close, period);
                vec![
                    series::zip_map(&mom, close, |m, c| m / c),
                    series::zip_map(&series::diff(&mom, 1), close, |d, c| d / c),
                    roc3,
                ]
            }
            Momentum::Ppo { fast, slow } => {
                let ppo = series::zip_map(&series::ema(close, fast), &series::ema(close, slow), |f, s| (f - s) / s);
                let slope = series::diff(&ppo, 1);
                vec![ppo, slope, roc5]
            }
            Momentum::Roc { period } | Momentum::Rocp { period } => with_slope(series::pct_change(close, period)),
            Momentum::Rocr { period } => with_slope(series::ratio(close, &series::shift(close, period))),
            Momentum::Rsi { period } => with_slope(series::scale(&rsi(close, period, true), 0.01)),
            Momentum::SarExt { start, step, max_step } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let sar = ParabolicSar::new(start, step, max_step).series(high, low);
                sar_features(close, &sar)
            }
            Momentum::Stoch { period, d_period } | Momentum::StochF { period, d_period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let hh = series::highest(high, period);
                let ll = series::lowest(low, period);
                let k: Vec<f64> = (0..close.len()).map(|t| (close[t] - ll[t]) / (hh[t] - ll[t])).collect();
                let d = series::sma(&k, d_period);
                let spread = series::zip_map(&k, &d, |a, b| a - b);
                vec![k, d, spread]
            }
            Momentum::StochRsi { rsi_period, stoch_period } => {
                let r = rsi(close, rsi_period, true);
                let lo = series::lowest(&r, stoch_period);
                let hi = series::highest(&r, stoch_period);
                // a flat RSI window sits mid-range
                let k = (0..r.len())
                    .map(|t| {
                        let span = hi[t] - lo[t];
                        if span == 0.0 {
                            0.5
                        } else {
                            (r[t] - lo[t]) / span
                        }
                    })
                    .collect();
                with_slope(k)
            }
            Momentum::Trix { period } => {
                let e3 = series::ema(&series::ema(&series::ema(close, period), period), period);
                with_slope(series::pct_change(&e3, 1))
            }
            Momentum::UltOsc { short, medium, long } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let prev = series::shift(close, 1);
                let floor: Vec<f64> = series::zip_map(low, &prev, |l, p| if p.is_nan() { NAN } else { l.min(p) });
                let ceil: Vec<f64> = series::zip_map(high, &prev, |h, p| if p.is_nan() { NAN } else { h.max(p) });
                let bp = series::zip_map(close, &floor, |c, f| c - f);
                let tr = series::zip_map(&ceil, &floor, |c, f| c - f);
                let avg = |n: usize| series::zip_map(&series::rolling_sum(&bp, n), &series::rolling_sum(&tr, n), |b, t| b / t);
                let (a1, a2, a3) = (avg(short), avg(medium), avg(long));
                let uo = (0..close.len()).map(|t| (4.0 * a1[t] + 2.0 * a2[t] + a3[t]) / 7.0).collect();
                with_slope(uo)
            }
            Momentum::WillR { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let hh = series::highest(high, period);
                let ll = series::lowest(low, period);
                with_slope((0..close.len()).map(|t| (hh[t] - close[t]) / (hh[t] - ll[t])).collect())
            }
        };
        Ok(columns)
    }
}

fn typical_price(data: &OhlcvFrame, name: &str) -> Result<Vec<f64>> {
    let high = data.require(Column::High, name)?;
    let low = data.require(Column::Low, name)?;
    let close = data.require(Column::Close, name)?;
    Ok((0..close.len()).map(|t| (high[t] + low[t] + close[t]) / 3.0).collect())
}

/// MACD line and its signal line.
fn macd_lines(
    close: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
    fast_ma: MaType,
    slow_ma: MaType,
    signal_ma: MaType,
) -> (Vec<f64>, Vec<f64>) {
    let macd = series::zip_map(&fast_ma.apply(close, fast), &slow_ma.apply(close, slow), |f, s| f - s);
    let sig = signal_ma.apply(&macd, signal);
    (macd, sig)
}

/// Bar-to-bar gains and losses (both non-negative), undefined on the first bar.
fn split_changes(close: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let change = series::diff(close, 1);
    let gains = change.iter().map(|d| if d.is_nan() { NAN } else { d.max(0.0) }).collect();
    let losses = change.iter().map(|d| if d.is_nan() { NAN } else { (-d).max(0.0) }).collect();
    (gains, losses)
}

/// Wilder RSI on a 0..100 scale. With no average loss the value is 100 when
/// `saturate` is set and undefined otherwise.
pub fn rsi(close: &[f64], period: usize, saturate: bool) -> Vec<f64> {
    let (up, dn) = split_changes(close);
    let avg_up = series::wilder(&up, period);
    let avg_dn = series::wilder(&dn, period);
    series::zip_map(&avg_up, &avg_dn, |u, d| {
        if u.is_nan() || d.is_nan() {
            NAN
        } else if d == 0.0 {
            if saturate {
                100.0
            } else {
                NAN
            }
        } else {
            100.0 - 100.0 / (1.0 + u / d)
        }
    })
}

/// Aroon up/down over an `period + 1` bar window. The most recent extreme
/// wins ties.
pub fn aroon(high: &[f64], low: &[f64], period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut up = vec![NAN; n];
    let mut down = vec![NAN; n];
    if period == 0 {
        return (up, down);
    }
    for t in period..n {
        let start = t - period;
        let mut hi_idx = start;
        let mut lo_idx = start;
        for i in start..=t {
            if high[i] >= high[hi_idx] {
                hi_idx = i;
            }
            if low[i] <= low[lo_idx] {
                lo_idx = i;
            }
        }
        up[t] = 100.0 * (period - (t - hi_idx)) as f64 / period as f64;
        down[t] = 100.0 * (period - (t - lo_idx)) as f64 / period as f64;
    }
    (up, down)
}

/// Directional movement system with simple-mean smoothing.
#[derive(Debug, Clone)]
pub struct DirectionalMovement {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub plus_dm_ratio: Vec<f64>,
    pub minus_dm_ratio: Vec<f64>,
    pub dx: Vec<f64>,
    pub adx: Vec<f64>,
}

impl DirectionalMovement {
    pub fn compute(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Self {
        let n = close.len();
        let mut plus_dm = vec![0.0; n];
        let mut minus_dm = vec![0.0; n];
        for t in 1..n {
            let up = high[t] - high[t - 1];
            let down = low[t - 1] - low[t];
            if up > down && up > 0.0 {
                plus_dm[t] = up;
            }
            if down > up && down > 0.0 {
                minus_dm[t] = down;
            }
        }

        let atr: Vec<f64> = series::sma(&series::true_range(high, low, close), period)
            .into_iter()
            .map(|a| if a == 0.0 { NAN } else { a })
            .collect();
        let plus_dm_ratio = series::zip_map(&series::rolling_sum(&plus_dm, period), &atr, |s, a| s / a);
        let minus_dm_ratio = series::zip_map(&series::rolling_sum(&minus_dm, period), &atr, |s, a| s / a);
        let plus_di = series::scale(&plus_dm_ratio, 100.0);
        let minus_di = series::scale(&minus_dm_ratio, 100.0);

        let dx = series::zip_map(&plus_di, &minus_di, |p, m| {
            let den = p + m;
            if den == 0.0 {
                0.0
            } else {
                (p - m).abs() / den * 100.0
            }
        });
        let adx = series::sma(&dx, period);

        Self { plus_di, minus_di, plus_dm_ratio, minus_dm_ratio, dx, adx }
    }

    fn di_spread(&self) -> Vec<f64> {
        series::zip_map(&self.plus_di, &self.minus_di, |p, m| (p - m) / 100.0)
    }
}

fn directional(data: &OhlcvFrame, name: &str, period: usize) -> Result<DirectionalMovement> {
    let high = data.require(Column::High, name)?;
    let low = data.require(Column::Low, name)?;
    let close = data.require(Column::Close, name)?;
    Ok(DirectionalMovement::compute(high, low, close, period))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_frame(n: usize) -> OhlcvFrame {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 + (i as f64 * 0.7).sin()).collect();
        let open: Vec<f64> = close.iter().map(|c| c - 0.3).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.5).collect();
        let volume: Vec<f64> = (0..n).map(|i| 1000.0 + (i % 7) as f64 * 10.0).collect();
        OhlcvFrame::from_ohlcv(open, high, low, close, volume).unwrap()
    }

    #[test]
    fn test_rsi_saturates_without_losses() {
        let close: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&close, 14, true);
        assert!(out[0].is_nan());
        assert_eq!(out[10], 100.0);
        assert!(rsi(&close, 14, false)[10].is_nan());
    }

    #[test]
    fn test_rsi_range() {
        let frame = trending_frame(80);
        let close = frame.column(Column::Close).unwrap();
        for v in rsi(close, 14, true).into_iter().skip(1) {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_aroon_recent_high() {
        let high: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let low = high.clone();
        let (up, down) = aroon(&high, &low, 25);
        assert!(up[24].is_nan());
        assert_eq!(up[29], 100.0);
        assert_eq!(down[29], 0.0);
    }

    #[test]
    fn test_directional_uptrend() {
        let frame = trending_frame(80);
        let dm = DirectionalMovement::compute(
            frame.column(Column::High).unwrap(),
            frame.column(Column::Low).unwrap(),
            frame.column(Column::Close).unwrap(),
            14,
        );
        assert!(dm.adx[25].is_nan());
        assert!(dm.adx[26].is_finite());
        assert!(dm.plus_di[60] > dm.minus_di[60]);
    }

    #[test]
    fn test_stoch_bounds() {
        let frame = trending_frame(60);
        let cols = Momentum::Stoch { period: 14, d_period: 3 }.compute(&frame).unwrap();
        for t in 15..60 {
            assert!((0.0..=1.0).contains(&cols[0][t]));
            assert!((0.0..=1.0).contains(&cols[1][t]));
        }
    }

    #[test]
    fn test_macdext_warmup_counts_signal_sma() {
        let ind = Momentum::all().into_iter().find(|m| m.name() == "MACDEXT").unwrap();
        assert_eq!(ind.warmup(), 8);
        let frame = trending_frame(60);
        let cols = ind.compute(&frame).unwrap();
        assert!(cols[0][7].is_nan());
        assert!(cols[0][8].is_finite());
    }

    #[test]
    fn test_bop_zero_range_undefined() {
        let frame = OhlcvFrame::from_ohlcv(
            vec![1.0, 1.0],
            vec![1.0, 2.0],
            vec![1.0, 0.5],
            vec![1.0, 1.5],
            vec![1.0, 1.0],
        )
        .unwrap();
        let cols = Momentum::Bop.compute(&frame).unwrap();
        assert!(cols[0][0].is_nan());
        assert!((cols[0][1] - 0.5 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_stoch_rsi_defined_from_warmup_after_early_gains() {
        // a run of gains before the first loss
        let mut close: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        close.extend((0..40).map(|i| 125.0 + (i as f64 * 0.9).sin() * 3.0));
        let frame = OhlcvFrame::from_close(close);
        let ind = Momentum::StochRsi { rsi_period: 14, stoch_period: 14 };
        let cols = ind.compute(&frame).unwrap();
        assert!(cols[0][13].is_nan());
        assert_eq!(cols[0][14], 0.5);
        assert!(cols[1][ind.warmup()].is_finite());
        assert!(cols[0][30..].iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mfi_requires_volume() {
        let frame = OhlcvFrame::from_close(vec![1.0; 40]);
        assert!(Momentum::Mfi { period: 14 }.compute(&frame).is_err());
    }
}
