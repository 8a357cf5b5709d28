//! Second indicator collection: textbook formulas on plain rolling windows
//! and unadjusted EMAs, grouped as momentum, money flow, trend, risk and
//! price-derived agents. Names already taken by the TA-Lib set carry a
//! `_CLASSIC` suffix.

use serde::{Deserialize, Serialize};

use super::series::{self, NAN};
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Classic {
    // momentum
    AwesomeOscillator { fast: usize, slow: usize },
    Ppo { fast: usize, slow: usize, signal: usize },
    Pvo { fast: usize, slow: usize, signal: usize },
    Roc { period: usize },
    Rsi { period: usize },
    StochOsc { period: usize, d_period: usize },
    StochRsi { rsi_period: usize, stoch_period: usize, d_period: usize },
    Tsi { long: usize, short: usize },
    UltimateOsc { short: usize, medium: usize, long: usize },
    // money flow
    Adi,
    Cmf { period: usize },
    Eom { period: usize },
    ForceIndex { span: usize },
    Mfi { period: usize },
    Nvi,
    Obv,
    Vpt,
    Vwap { period: usize },
    // trend
    Aroon { period: usize },
    Cci { period: usize },
    Dpo { period: usize },
    Ichimoku { conversion: usize, base: usize, span_b: usize, shift: usize },
    Kst,
    MassIndex { ema_period: usize, sum_period: usize },
    Stc,
    Trix { period: usize },
    Vortex { period: usize },
    // risk
    DonchianChannel { period: usize },
    KeltnerChannel { period: usize, mult: f64 },
    UlcerIndex { period: usize },
    // price derived
    CumulativeReturn,
    DailyLogReturn { z_period: usize },
}

const CLOSE: &[Column] = &[Column::Close];
const HLC: &[Column] = &[Column::High, Column::Low, Column::Close];
const CV: &[Column] = &[Column::Close, Column::Volume];
const HLCV: &[Column] = &[Column::High, Column::Low, Column::Close, Column::Volume];

const NVI_START: f64 = 1000.0;

impl Classic {
    pub fn all() -> Vec<Classic> {
        vec![
            Classic::AwesomeOscillator { fast: 5, slow: 34 },
            Classic::Ppo { fast: 12, slow: 26, signal: 9 },
            Classic::Pvo { fast: 12, slow: 26, signal: 9 },
            Classic::Roc { period: 14 },
            Classic::Rsi { period: 14 },
            Classic::StochOsc { period: 14, d_period: 3 },
            Classic::StochRsi { rsi_period: 14, stoch_period: 14, d_period: 3 },
            Classic::Tsi { long: 25, short: 13 },
            Classic::UltimateOsc { short: 7, medium: 14, long: 28 },
            Classic::Adi,
            Classic::Cmf { period: 20 },
            Classic::Eom { period: 14 },
            Classic::ForceIndex { span: 13 },
            Classic::Mfi { period: 14 },
            Classic::Nvi,
            Classic::Obv,
            Classic::Vpt,
            Classic::Vwap { period: 30 },
            Classic::Aroon { period: 25 },
            Classic::Cci { period: 20 },
            Classic::Dpo { period: 20 },
            Classic::Ichimoku { conversion: 9, base: 26, span_b: 52, shift: 26 },
            Classic::Kst,
            Classic::MassIndex { ema_period: 9, sum_period: 25 },
            Classic::Stc,
            Classic::Trix { period: 15 },
            Classic::Vortex { period: 14 },
            Classic::DonchianChannel { period: 20 },
            Classic::KeltnerChannel { period: 20, mult: 2.0 },
            Classic::UlcerIndex { period: 14 },
            Classic::CumulativeReturn,
            Classic::DailyLogReturn { z_period: 20 },
        ]
    }
}

impl Indicator for Classic {
    fn name(&self) -> &'static str {
        match self {
            Classic::AwesomeOscillator { .. } => "AWESOME_OSCILLATOR",
            Classic::Ppo { .. } => "PPO_CLASSIC",
            Classic::Pvo { .. } => "PVO",
            Classic::Roc { .. } => "ROC_CLASSIC",
            Classic::Rsi { .. } => "RSI_CLASSIC",
            Classic::StochOsc { .. } => "STOCH_OSC",
            Classic::StochRsi { .. } => "STOCH_RSI_CLASSIC",
            Classic::Tsi { .. } => "TSI",
            Classic::UltimateOsc { .. } => "ULTIMATE_OSC",
            Classic::Adi => "ADI",
            Classic::Cmf { .. } => "CMF",
            Classic::Eom { .. } => "EOM",
            Classic::ForceIndex { .. } => "FORCE_INDEX",
            Classic::Mfi { .. } => "MFI_CLASSIC",
            Classic::Nvi => "NVI",
            Classic::Obv => "OBV_CLASSIC",
            Classic::Vpt => "VPT",
            Classic::Vwap { .. } => "VWAP",
            Classic::Aroon { .. } => "AROON_CLASSIC",
            Classic::Cci { .. } => "CCI_CLASSIC",
            Classic::Dpo { .. } => "DPO",
            Classic::Ichimoku { .. } => "ICHIMOKU",
            Classic::Kst => "KST",
            Classic::MassIndex { .. } => "MASS_INDEX",
            Classic::Stc => "STC",
            Classic::Trix { .. } => "TRIX_CLASSIC",
            Classic::Vortex { .. } => "VORTEX",
            Classic::DonchianChannel { .. } => "DONCHIAN_CHANNEL",
            Classic::KeltnerChannel { .. } => "KELTNER_CHANNEL",
            Classic::UlcerIndex { .. } => "ULCER_INDEX",
            Classic::CumulativeReturn => "CUMULATIVE_RETURN",
            Classic::DailyLogReturn { .. } => "DAILY_LOG_RETURN",
        }
    }

    fn family(&self) -> Family {
        match self {
            Classic::AwesomeOscillator { .. }
            | Classic::Ppo { .. }
            | Classic::Pvo { .. }
            | Classic::Roc { .. }
            | Classic::Rsi { .. }
            | Classic::StochOsc { .. }
            | Classic::StochRsi { .. }
            | Classic::Tsi { .. }
            | Classic::UltimateOsc { .. } => Family::Momentum,
            Classic::Adi
            | Classic::Cmf { .. }
            | Classic::Eom { .. }
            | Classic::ForceIndex { .. }
            | Classic::Mfi { .. }
            | Classic::Nvi
            | Classic::Obv
            | Classic::Vpt
            | Classic::Vwap { .. } => Family::MoneyFlow,
            Classic::DonchianChannel { .. } | Classic::KeltnerChannel { .. } | Classic::UlcerIndex { .. } => {
                Family::Risk
            }
            Classic::CumulativeReturn | Classic::DailyLogReturn { .. } => Family::PriceDerived,
            _ => Family::Trend,
        }
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            Classic::AwesomeOscillator { .. }
            | Classic::StochOsc { .. }
            | Classic::UltimateOsc { .. }
            | Classic::Aroon { .. }
            | Classic::Cci { .. }
            | Classic::Ichimoku { .. }
            | Classic::MassIndex { .. }
            | Classic::Vortex { .. }
            | Classic::DonchianChannel { .. }
            | Classic::KeltnerChannel { .. } => HLC,
            Classic::Pvo { .. }
            | Classic::ForceIndex { .. }
            | Classic::Nvi
            | Classic::Obv
            | Classic::Vpt
            | Classic::Vwap { .. } => CV,
            Classic::Adi | Classic::Cmf { .. } | Classic::Eom { .. } | Classic::Mfi { .. } => HLCV,
            _ => CLOSE,
        }
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Classic::AwesomeOscillator { .. } => &["ao", "ao_slope"],
            Classic::Ppo { .. } => &["ppo_norm", "sig", "hist"],
            Classic::Pvo { .. } => &["pvo_norm", "sig", "hist"],
            Classic::Roc { .. } => &["roc_norm", "roc_slope"],
            Classic::Rsi { .. } => &["rsi", "rsi_slope"],
            Classic::StochOsc { .. } | Classic::StochRsi { .. } => &["k", "d", "diff"],
            Classic::Tsi { .. } => &["tsi", "tsi_slope"],
            Classic::UltimateOsc { .. } => &["ult", "ult_slope"],
            Classic::Adi => &["adi_norm", "adi_slope"],
            Classic::Cmf { .. } => &["cmf", "cmf_slope"],
            Classic::Eom { .. } => &["eom_sma", "eom_slope"],
            Classic::ForceIndex { .. } => &["fi", "fi_slope"],
            Classic::Mfi { .. } => &["mfi", "mfi_slope"],
            Classic::Nvi => &["nvi_norm", "nvi_slope"],
            Classic::Obv => &["obv_norm", "obv_slope"],
            Classic::Vpt => &["vpt_norm", "vpt_slope"],
            Classic::Vwap { .. } => &["vwap_diff", "vwap_slope"],
            Classic::Aroon { .. } => &["up", "down", "diff"],
            Classic::Cci { .. } => &["cci_scaled", "cci_slope"],
            Classic::Dpo { .. } => &["dpo_norm", "dpo_slope"],
            Classic::Ichimoku { .. } => &["span_diff", "price_span_a", "price_span_b"],
            Classic::Kst => &["kst", "kst_sig", "kst_diff"],
            Classic::MassIndex { .. } => &["mass", "mass_slope"],
            Classic::Stc => &["stc", "stc_slope"],
            Classic::Trix { .. } => &["trix", "trix_slope"],
            Classic::Vortex { .. } => &["vi_pos", "vi_neg", "vi_diff"],
            Classic::DonchianChannel { .. } | Classic::KeltnerChannel { .. } => &["pct_b", "width", "pct_b_slope"],
            Classic::UlcerIndex { .. } => &["ui", "ui_slope"],
            Classic::CumulativeReturn => &["cum_ret", "cum_slope"],
            Classic::DailyLogReturn { .. } => &["lr", "lr_z"],
        }
    }

    fn warmup(&self) -> usize {
        match *self {
            Classic::Ppo { .. } | Classic::Pvo { .. } => 0,
            Classic::Adi | Classic::Nvi | Classic::Obv | Classic::CumulativeReturn => 1,
            Classic::Tsi { .. } | Classic::ForceIndex { .. } | Classic::Vpt | Classic::Trix { .. } => 2,
            Classic::AwesomeOscillator { fast, slow } => fast.max(slow),
            Classic::Roc { period } | Classic::Rsi { period } | Classic::Eom { period } => period + 1,
            Classic::StochOsc { period, d_period } => period + d_period - 2,
            Classic::StochRsi { rsi_period, stoch_period, d_period } => rsi_period + stoch_period + d_period - 2,
            Classic::UltimateOsc { short, medium, long } => short.max(medium).max(long),
            Classic::Cmf { period }
            | Classic::Mfi { period }
            | Classic::Vwap { period }
            | Classic::Dpo { period }
            | Classic::Vortex { period }
            | Classic::DonchianChannel { period }
            | Classic::KeltnerChannel { period, .. } => period,
            Classic::Aroon { period } => period - 1,
            Classic::Cci { period } | Classic::UlcerIndex { period } => 2 * period - 1,
            Classic::Ichimoku { conversion, base, span_b, shift } => conversion.max(base).max(span_b) - 1 + shift,
            // longest smoothed ROC (30 + 15 - 1) plus the 9-bar signal
            Classic::Kst => 52,
            Classic::MassIndex { sum_period, .. } => sum_period,
            // 10-bar stochastic of the histogram, 3-bar mean, slope
            Classic::Stc => 12,
            Classic::DailyLogReturn { z_period } => z_period,
        }
    }

    fn min_rows(&self) -> usize {
        match *self {
            Classic::AwesomeOscillator { .. } | Classic::Obv => 40,
            Classic::Ppo { slow, .. } | Classic::Pvo { slow, .. } => slow + 10,
            Classic::StochOsc { .. } | Classic::StochRsi { .. } | Classic::Adi | Classic::Vpt => 50,
            Classic::Tsi { .. } | Classic::UltimateOsc { .. } | Classic::Nvi => 60,
            Classic::Kst | Classic::Stc => 100,
            Classic::CumulativeReturn => 30,
            Classic::ForceIndex { span } => span + 10,
            Classic::MassIndex { sum_period, .. } => sum_period + 10,
            Classic::Ichimoku { span_b, shift, .. } => span_b + shift + 10,
            Classic::DailyLogReturn { z_period } => z_period + 10,
            Classic::Roc { period }
            | Classic::Rsi { period }
            | Classic::Cmf { period }
            | Classic::Eom { period }
            | Classic::Mfi { period }
            | Classic::Vwap { period }
            | Classic::Aroon { period }
            | Classic::Cci { period }
            | Classic::Dpo { period }
            | Classic::Trix { period }
            | Classic::Vortex { period }
            | Classic::DonchianChannel { period }
            | Classic::KeltnerChannel { period, .. }
            | Classic::UlcerIndex { period } => period + 10,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let name = self.name();
        let close = data.require(Column::Close, name)?;

        let with_slope = |value: Vec<f64>| -> Vec<Vec<f64>> {
            let slope = series::diff(&value, 1);
            vec![value, slope]
        };

        let columns = match *self {
            Classic::AwesomeOscillator { fast, slow } => {
                let mid = median_price(data, name)?;
                with_slope(series::zip_map(&series::sma(&mid, fast), &series::sma(&mid, slow), |f, s| f - s))
            }
            Classic::Ppo { fast, slow, signal } => percentage_oscillator(close, fast, slow, signal),
            Classic::Pvo { fast, slow, signal } => {
                percentage_oscillator(data.require(Column::Volume, name)?, fast, slow, signal)
            }
            Classic::Roc { period } => with_slope(series::pct_change(close, period)),
            Classic::Rsi { period } => with_slope(series::scale(&rolling_rsi(close, period), 0.01)),
            Classic::StochOsc { period, d_period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let hh = series::highest(high, period);
                let ll = series::lowest(low, period);
                let k = (0..close.len()).map(|t| (close[t] - ll[t]) / (hh[t] - ll[t])).collect();
                k_d_diff(k, d_period)
            }
            Classic::StochRsi { rsi_period, stoch_period, d_period } => {
                let r = rolling_rsi(close, rsi_period);
                let lo = series::lowest(&r, stoch_period);
                let hi = series::highest(&r, stoch_period);
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
                k_d_diff(k, d_period)
            }
            Classic::Tsi { long, short } => {
                let delta = series::diff(close, 1);
                let magnitude: Vec<f64> = delta.iter().map(|d| d.abs()).collect();
                let num = series::ema(&series::ema(&delta, short), long);
                let den = series::ema(&series::ema(&magnitude, short), long);
                with_slope(series::ratio(&num, &den))
            }
            Classic::UltimateOsc { short, medium, long } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let prev = series::shift(close, 1);
                // no previous close on the first bar: fall back to the bar's own low
                let floor = series::zip_map(low, &prev, |l, p| if p.is_nan() { l } else { l.min(p) });
                let bp = series::zip_map(close, &floor, |c, f| c - f);
                let tr = series::true_range(high, low, close);
                let avg = |n: usize| series::ratio(&series::rolling_sum(&bp, n), &series::rolling_sum(&tr, n));
                let (a1, a2, a3) = (avg(short), avg(medium), avg(long));
                with_slope((0..close.len()).map(|t| (4.0 * a1[t] + 2.0 * a2[t] + a3[t]) / 7.0).collect())
            }
            Classic::Adi => {
                let volume = data.require(Column::Volume, name)?;
                let adi = series::cumsum(&money_flow_volume(data, name)?);
                with_slope(series::ratio(&adi, &series::cumsum(volume)))
            }
            Classic::Cmf { period } => {
                let volume = data.require(Column::Volume, name)?;
                let mfv = money_flow_volume(data, name)?;
                with_slope(series::ratio(&series::rolling_sum(&mfv, period), &series::rolling_sum(volume, period)))
            }
            Classic::Eom { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let volume = data.require(Column::Volume, name)?;
                let dist = series::diff(&median_price(data, name)?, 1);
                let eom: Vec<f64> = (0..close.len())
                    .map(|t| {
                        let boxes = volume[t] / 1_000_000.0;
                        if boxes == 0.0 {
                            NAN
                        } else {
                            (high[t] - low[t]) * dist[t] / boxes
                        }
                    })
                    .collect();
                with_slope(series::sma(&eom, period))
            }
            Classic::ForceIndex { span } => {
                let volume = data.require(Column::Volume, name)?;
                let raw = series::zip_map(volume, &series::diff(close, 1), |v, d| v * d);
                with_slope(series::ema(&raw, span))
            }
            Classic::Mfi { period } => {
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
                let mfi = series::zip_map(
                    &series::rolling_sum(&pos, period),
                    &series::rolling_sum(&neg, period),
                    |p, n| if n == 0.0 { 1.0 } else { 1.0 - 1.0 / (1.0 + p / n) },
                );
                with_slope(mfi)
            }
            Classic::Nvi => {
                let volume = data.require(Column::Volume, name)?;
                let nvi = negative_volume_index(close, volume);
                with_slope(nvi.iter().map(|v| v / NVI_START - 1.0).collect())
            }
            Classic::Obv => {
                let volume = data.require(Column::Volume, name)?;
                let signed: Vec<f64> = (0..close.len())
                    .map(|t| {
                        let change = if t == 0 { 0.0 } else { close[t] - close[t - 1] };
                        if change > 0.0 {
                            volume[t]
                        } else if change < 0.0 {
                            -volume[t]
                        } else {
                            0.0
                        }
                    })
                    .collect();
                with_slope(series::ratio(&series::cumsum(&signed), &series::cumsum(volume)))
            }
            Classic::Vpt => {
                let volume = data.require(Column::Volume, name)?;
                let flow = series::zip_map(volume, &series::pct_change(close, 1), |v, p| v * p);
                with_slope(series::ratio(&series::cumsum(&flow), &series::cumsum(volume)))
            }
            Classic::Vwap { period } => {
                let volume = data.require(Column::Volume, name)?;
                let pv = series::zip_map(close, volume, |c, v| c * v);
                let vwap = series::ratio(&series::rolling_sum(&pv, period), &series::rolling_sum(volume, period));
                with_slope(series::zip_map(close, &vwap, |c, w| (c - w) / w))
            }
            Classic::Aroon { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let n = period as f64;
                // first extreme in the window wins ties
                let up = series::rolling(high, period, |w| (first_extreme(w, |a, b| a > b) + 1) as f64 / n);
                let down = series::rolling(low, period, |w| (first_extreme(w, |a, b| a < b) + 1) as f64 / n);
                let diff = series::zip_map(&up, &down, |u, d| u - d);
                vec![up, down, diff]
            }
            Classic::Cci { period } => {
                let tp = typical_price(data, name)?;
                let mid = series::sma(&tp, period);
                let deviation = series::zip_map(&tp, &mid, |p, m| (p - m).abs());
                let mean_dev = series::sma(&deviation, period);
                let cci = (0..tp.len())
                    .map(|t| (tp[t] - mid[t]) / (0.015 * mean_dev[t]) / 200.0)
                    .collect();
                with_slope(cci)
            }
            Classic::Dpo { period } => {
                let lagged = series::shift(close, period / 2 + 1);
                let dpo = series::zip_map(&lagged, &series::sma(close, period), |l, m| l - m);
                with_slope(series::zip_map(&dpo, close, |d, c| d / c))
            }
            Classic::Ichimoku { conversion, base, span_b, shift } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let mid_range = |n: usize| {
                    series::zip_map(&series::highest(high, n), &series::lowest(low, n), |h, l| (h + l) / 2.0)
                };
                let conv = mid_range(conversion);
                let base_line = mid_range(base);
                let span_a = series::shift(&series::zip_map(&conv, &base_line, |c, b| (c + b) / 2.0), shift);
                let span_b = series::shift(&mid_range(span_b), shift);
                vec![
                    series::zip_map(&span_a, &span_b, |a, b| a - b),
                    series::zip_map(close, &span_a, |c, a| c - a),
                    series::zip_map(close, &span_b, |c, b| c - b),
                ]
            }
            Classic::Kst => {
                let smoothed_roc = |roc: usize, window: usize| {
                    series::sma(&series::scale(&series::pct_change(close, roc), 100.0), window)
                };
                let r1 = smoothed_roc(10, 10);
                let r2 = smoothed_roc(15, 10);
                let r3 = smoothed_roc(20, 10);
                let r4 = smoothed_roc(30, 15);
                let kst: Vec<f64> = (0..close.len())
                    .map(|t| r1[t] + 2.0 * r2[t] + 3.0 * r3[t] + 4.0 * r4[t])
                    .collect();
                let signal = series::sma(&kst, 9);
                let diff = series::zip_map(&kst, &signal, |k, s| k - s);
                vec![kst, signal, diff]
            }
            Classic::MassIndex { ema_period, sum_period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let range = series::zip_map(high, low, |h, l| (h - l).abs());
                let single = series::ema(&range, ema_period);
                let double = series::ema(&single, ema_period);
                with_slope(series::rolling_sum(&series::ratio(&single, &double), sum_period))
            }
            Classic::Stc => {
                let macd = series::zip_map(&series::ema(close, 23), &series::ema(close, 50), |f, s| f - s);
                let hist = series::zip_map(&macd, &series::ema(&macd, 10), |m, s| m - s);
                let lo = series::lowest(&hist, 10);
                let hi = series::highest(&hist, 10);
                let k: Vec<f64> = (0..hist.len()).map(|t| (hist[t] - lo[t]) / (hi[t] - lo[t])).collect();
                with_slope(series::sma(&k, 3))
            }
            Classic::Trix { period } => {
                let e3 = series::ema(&series::ema(&series::ema(close, period), period), period);
                with_slope(series::scale(&series::pct_change(&e3, 1), 100.0))
            }
            Classic::Vortex { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let up_move = series::zip_map(high, &series::shift(low, 1), |h, l| (h - l).abs());
                let down_move = series::zip_map(low, &series::shift(high, 1), |l, h| (l - h).abs());
                let tr_sum = series::rolling_sum(&series::true_range(high, low, close), period);
                let vi_pos = series::ratio(&series::rolling_sum(&up_move, period), &tr_sum);
                let vi_neg = series::ratio(&series::rolling_sum(&down_move, period), &tr_sum);
                let vi_diff = series::zip_map(&vi_pos, &vi_neg, |p, n| p - n);
                vec![vi_pos, vi_neg, vi_diff]
            }
            Classic::DonchianChannel { period } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let upper = series::highest(high, period);
                let lower = series::lowest(low, period);
                let middle = series::zip_map(&upper, &lower, |u, l| (u + l) / 2.0);
                channel_features(close, &upper, &lower, &middle)
            }
            Classic::KeltnerChannel { period, mult } => {
                let high = data.require(Column::High, name)?;
                let low = data.require(Column::Low, name)?;
                let mid = mask_leading(series::ema(close, period), period);
                let atr = series::sma(&series::true_range(high, low, close), period);
                let upper = series::zip_map(&mid, &atr, |m, a| m + mult * a);
                let lower = series::zip_map(&mid, &atr, |m, a| m - mult * a);
                channel_features(close, &upper, &lower, &mid)
            }
            Classic::UlcerIndex { period } => {
                let peak = series::highest(close, period);
                let squared: Vec<f64> = series::zip_map(close, &peak, |c, p| ((c - p) / p * 100.0).powi(2));
                let ui: Vec<f64> = series::sma(&squared, period).into_iter().map(|v| v.sqrt() / 100.0).collect();
                with_slope(ui)
            }
            Classic::CumulativeReturn => {
                let base = close.first().copied().unwrap_or(NAN);
                with_slope(close.iter().map(|c| c / base - 1.0).collect())
            }
            Classic::DailyLogReturn { z_period } => {
                let lr: Vec<f64> = series::ratio(close, &series::shift(close, 1)).iter().map(|r| r.ln()).collect();
                let mean = series::sma(&lr, z_period);
                let std = series::stddev(&lr, z_period, 1);
                let z: Vec<f64> = (0..lr.len()).map(|t| (lr[t] - mean[t]) / std[t]).collect();
                vec![lr, z]
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

fn median_price(data: &OhlcvFrame, name: &str) -> Result<Vec<f64>> {
    let high = data.require(Column::High, name)?;
    let low = data.require(Column::Low, name)?;
    Ok(series::zip_map(high, low, |h, l| (h + l) / 2.0))
}

/// Close location value times volume, undefined on zero-range bars.
fn money_flow_volume(data: &OhlcvFrame, name: &str) -> Result<Vec<f64>> {
    let high = data.require(Column::High, name)?;
    let low = data.require(Column::Low, name)?;
    let close = data.require(Column::Close, name)?;
    let volume = data.require(Column::Volume, name)?;
    Ok((0..close.len())
        .map(|t| {
            let range = high[t] - low[t];
            if range == 0.0 {
                NAN
            } else {
                ((close[t] - low[t]) - (high[t] - close[t])) / range * volume[t]
            }
        })
        .collect())
}

/// Simple-mean RSI on a 0..100 scale. A window without losses reads 100.
pub fn rolling_rsi(close: &[f64], period: usize) -> Vec<f64> {
    let change = series::diff(close, 1);
    let gains: Vec<f64> = change.iter().map(|d| if d.is_nan() { NAN } else { d.max(0.0) }).collect();
    let losses: Vec<f64> = change.iter().map(|d| if d.is_nan() { NAN } else { (-d).max(0.0) }).collect();
    series::zip_map(&series::sma(&gains, period), &series::sma(&losses, period), |g, l| {
        if g.is_nan() || l.is_nan() {
            NAN
        } else if l == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + g / l)
        }
    })
}

/// Oscillator line, its EMA signal and the histogram, all as fractions.
fn percentage_oscillator(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<Vec<f64>> {
    let slow_ema = series::ema(values, slow);
    let line = series::zip_map(&series::ema(values, fast), &slow_ema, |f, s| (f - s) / s);
    let sig = series::ema(&line, signal);
    let hist = series::zip_map(&line, &sig, |l, s| l - s);
    vec![line, sig, hist]
}

fn k_d_diff(k: Vec<f64>, d_period: usize) -> Vec<Vec<f64>> {
    let d = series::sma(&k, d_period);
    let diff = series::zip_map(&k, &d, |a, b| a - b);
    vec![k, d, diff]
}

/// Compounds only the bars where volume fell.
pub fn negative_volume_index(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(close.len());
    let mut level = NVI_START;
    for t in 0..close.len() {
        if t > 0 && volume[t] < volume[t - 1] {
            level *= close[t] / close[t - 1];
        }
        out.push(level);
    }
    out
}

/// Index of the first occurrence of the window's extreme.
fn first_extreme(window: &[f64], beats: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in window.iter().enumerate().skip(1) {
        if beats(v, window[best]) {
            best = i;
        }
    }
    best
}

fn mask_leading(mut values: Vec<f64>, period: usize) -> Vec<f64> {
    for v in values.iter_mut().take(period.saturating_sub(1)) {
        *v = NAN;
    }
    values
}

/// %B inside a band, band width over the middle line, and the %B slope.
fn channel_features(close: &[f64], upper: &[f64], lower: &[f64], middle: &[f64]) -> Vec<Vec<f64>> {
    let pct_b = (0..close.len())
        .map(|t| (close[t] - lower[t]) / (upper[t] - lower[t]))
        .collect::<Vec<f64>>();
    let width: Vec<f64> = (0..close.len())
        .map(|t| (upper[t] - lower[t]) / middle[t])
        .collect();
    let slope = series::diff(&pct_b, 1);
    vec![pct_b, width, slope]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn swinging_frame(n: usize) -> OhlcvFrame {
        let close: Vec<f64> = (0..n)
            .map(|i| 100.0 + 0.1 * i as f64 + 3.0 * (i as f64 * 0.45).sin())
            .collect();
        let open: Vec<f64> = close.iter().map(|c| c - 0.2).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 1.2).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 0.9).collect();
        let volume: Vec<f64> = (0..n).map(|i| 900.0 + ((i * 37) % 11) as f64 * 25.0).collect();
        OhlcvFrame::from_ohlcv(open, high, low, close, volume).unwrap()
    }

    #[test]
    fn test_collection_layout() {
        let all = Classic::all();
        assert_eq!(all.len(), 32);
        let names: HashSet<_> = all.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), 32);

        let count = |f: Family| all.iter().filter(|c| c.family() == f).count();
        assert_eq!(count(Family::Momentum), 9);
        assert_eq!(count(Family::MoneyFlow), 9);
        assert_eq!(count(Family::Trend), 9);
        assert_eq!(count(Family::Risk), 3);
        assert_eq!(count(Family::PriceDerived), 2);
    }

    #[test]
    fn test_features_defined_exactly_from_warmup() {
        let frame = swinging_frame(260);
        for ind in Classic::all() {
            let cols = ind.compute(&frame).unwrap();
            assert_eq!(cols.len(), ind.feature_names().len(), "{}", ind.name());
            let w = ind.warmup();
            for (j, col) in cols.iter().enumerate() {
                assert!(col[w].is_finite(), "{} feature {} undefined at warm-up", ind.name(), j);
            }
            if w > 0 {
                assert!(
                    cols.iter().any(|c| !c[w - 1].is_finite()),
                    "{} is fully defined before its warm-up",
                    ind.name()
                );
            }
        }
    }

    #[test]
    fn test_vpt_normalised_by_cumulative_volume() {
        let close = vec![10.0, 11.0, 9.9, 9.9];
        let volume = vec![100.0, 200.0, 100.0, 50.0];
        let frame = OhlcvFrame::from_ohlcv(close.clone(), close.clone(), close.clone(), close, volume).unwrap();
        let cols = Classic::Vpt.compute(&frame).unwrap();
        assert!(cols[0][0].is_nan());
        // 200 * 10% over 300 shares
        assert!((cols[0][1] - 20.0 / 300.0).abs() < 1e-12);
        assert!((cols[0][2] - (20.0 - 10.0) / 400.0).abs() < 1e-12);
        assert!((cols[1][3] - (10.0 / 450.0 - 10.0 / 400.0)).abs() < 1e-12);
    }

    #[test]
    fn test_nvi_moves_only_on_falling_volume() {
        let close = [100.0, 110.0, 121.0, 60.5];
        let volume = [10.0, 20.0, 5.0, 5.0];
        let nvi = negative_volume_index(&close, &volume);
        assert_eq!(nvi[0], 1000.0);
        assert_eq!(nvi[1], 1000.0);
        assert!((nvi[2] - 1100.0).abs() < 1e-9);
        assert!((nvi[3] - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_rsi_without_losses_is_full_scale() {
        let close: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        let r = rolling_rsi(&close, 14);
        assert!(r[13].is_nan());
        assert_eq!(r[14], 100.0);

        let zigzag: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let r = rolling_rsi(&zigzag, 14);
        assert!((r[29] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_aroon_window_prefers_first_extreme() {
        assert_eq!(first_extreme(&[1.0, 3.0, 3.0, 2.0], |a, b| a > b), 1);
        assert_eq!(first_extreme(&[4.0, 1.0, 1.0], |a, b| a < b), 1);

        let high: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let frame =
            OhlcvFrame::from_ohlcv(high.clone(), high.clone(), high.clone(), high, vec![1.0; 30]).unwrap();
        let cols = Classic::Aroon { period: 25 }.compute(&frame).unwrap();
        assert!(cols[0][23].is_nan());
        assert_eq!(cols[0][24], 1.0);
        assert!((cols[1][24] - 1.0 / 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_ichimoku_spans_are_shifted_forward() {
        let frame = swinging_frame(120);
        let ind = Classic::Ichimoku { conversion: 9, base: 26, span_b: 52, shift: 26 };
        assert_eq!(ind.warmup(), 77);
        let cols = ind.compute(&frame).unwrap();
        assert!(cols[1][50].is_nan());
        assert!(cols[1][51].is_finite());
        assert!(cols[2][76].is_nan());
        assert!(cols[2][77].is_finite());
    }

    #[test]
    fn test_keltner_midline_waits_for_a_full_window() {
        let frame = swinging_frame(60);
        let cols = Classic::KeltnerChannel { period: 20, mult: 2.0 }.compute(&frame).unwrap();
        assert!(cols[0][18].is_nan());
        assert!(cols[0][19].is_finite());
        assert!(cols[1][19] > 0.0);
    }

    #[test]
    fn test_volume_oscillator_needs_volume() {
        let frame = OhlcvFrame::from_close(vec![1.0; 50]);
        assert!(Classic::Pvo { fast: 12, slow: 26, signal: 9 }.compute(&frame).is_err());
        assert!(Classic::Ppo { fast: 12, slow: 26, signal: 9 }.compute(&frame).is_ok());
    }
}
