use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::series;
use super::{Family, Indicator};
use crate::error::Result;
use crate::types::{Column, OhlcvFrame};

/// Hilbert-transform cycle measures, all derived from the analytic signal of
/// the close series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cycle {
    DcPeriod,
    DcPhase,
    Phasor,
    Sine,
    TrendMode,
}

/// Bars averaged when smoothing the dominant-cycle period.
const PERIOD_SMOOTHING: usize = 10;
/// Bars averaged when judging whether phase has stalled.
const TREND_WINDOW: usize = 7;
/// Mean absolute phase advance (degrees) below which price is trending.
const TREND_THRESHOLD_DEG: f64 = 20.0;

impl Cycle {
    pub fn all() -> Vec<Cycle> {
        vec![Cycle::DcPeriod, Cycle::DcPhase, Cycle::Phasor, Cycle::Sine, Cycle::TrendMode]
    }
}

impl Indicator for Cycle {
    fn name(&self) -> &'static str {
        match self {
            Cycle::DcPeriod => "HT_DCPERIOD",
            Cycle::DcPhase => "HT_DCPHASE",
            Cycle::Phasor => "HT_PHASOR",
            Cycle::Sine => "HT_SINE",
            Cycle::TrendMode => "HT_TRENDMODE",
        }
    }

    fn family(&self) -> Family {
        Family::Cycle
    }

    fn columns(&self) -> &'static [Column] {
        &[Column::Close]
    }

    fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Cycle::DcPeriod => &["period", "period_slope", "roc_3"],
            Cycle::DcPhase => &["phase", "phase_slope", "roc_3"],
            Cycle::Phasor => &["in_phase", "quadrature", "magnitude"],
            Cycle::Sine => &["sine", "lead_sine", "sine_spread"],
            Cycle::TrendMode => &["trend_flag", "period", "roc_3"],
        }
    }

    fn warmup(&self) -> usize {
        match self {
            Cycle::DcPeriod => PERIOD_SMOOTHING,
            Cycle::DcPhase => 3,
            Cycle::Phasor | Cycle::Sine => 0,
            Cycle::TrendMode => PERIOD_SMOOTHING - 1,
        }
    }

    fn min_rows(&self) -> usize {
        match self {
            Cycle::TrendMode => 40,
            _ => 30,
        }
    }

    fn compute(&self, data: &OhlcvFrame) -> Result<Vec<Vec<f64>>> {
        let close = data.require(Column::Close, self.name())?;
        let signal = analytic_signal(close);
        let phase: Vec<f64> = signal.iter().map(|z| phase_degrees(*z)).collect();
        let roc3 = series::pct_change(close, 3);

        let columns = match self {
            Cycle::DcPeriod => {
                let period = series::scale(&dominant_period(&phase), 1.0 / 50.0);
                let slope = series::diff(&period, 1);
                vec![period, slope, roc3]
            }
            Cycle::DcPhase => {
                let ph = series::scale(&phase, 1.0 / 360.0);
                let slope = series::diff(&ph, 1);
                vec![ph, slope, roc3]
            }
            Cycle::Phasor => {
                let i: Vec<f64> = signal.iter().zip(close).map(|(z, c)| z.re / c).collect();
                let q: Vec<f64> = signal.iter().zip(close).map(|(z, c)| z.im / c).collect();
                let mag: Vec<f64> = signal.iter().zip(close).map(|(z, c)| z.norm() / c).collect();
                vec![i, q, mag]
            }
            Cycle::Sine => {
                let sine: Vec<f64> = phase.iter().map(|p| p.to_radians().sin()).collect();
                let lead: Vec<f64> = phase.iter().map(|p| (p.to_radians() + PI / 4.0).sin()).collect();
                let spread = series::zip_map(&sine, &lead, |s, l| s - l);
                vec![sine, lead, spread]
            }
            Cycle::TrendMode => {
                let advance: Vec<f64> = series::diff(&phase, 1).iter().map(|d| d.abs()).collect();
                let flag = series::sma(&advance, TREND_WINDOW)
                    .into_iter()
                    .map(|m| {
                        if m.is_nan() {
                            m
                        } else if m < TREND_THRESHOLD_DEG {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();
                let period = series::scale(&dominant_period(&phase), 1.0 / 50.0);
                vec![flag, period, roc3]
            }
        };
        Ok(columns)
    }
}

/// Analytic signal of a real series: negative frequencies removed, positive
/// ones doubled, DC (and Nyquist for even lengths) kept once.
pub fn analytic_signal(values: &[f64]) -> Vec<Complex<f64>> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&x| Complex::new(x, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut buffer);

    let positive_end = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    for (k, z) in buffer.iter_mut().enumerate() {
        let h = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < positive_end {
            2.0
        } else {
            0.0
        };
        *z *= h;
    }

    planner.plan_fft_inverse(n).process(&mut buffer);
    // rustfft leaves the inverse unnormalised
    let scale = 1.0 / n as f64;
    buffer.into_iter().map(|z| z * scale).collect()
}

/// Instantaneous phase in degrees, wrapped into [0, 360).
pub fn phase_degrees(z: Complex<f64>) -> f64 {
    (z.im.atan2(z.re).to_degrees() + 360.0) % 360.0
}

/// Smoothed 360 / phase-advance. Non-positive advances are unwrapped by one
/// full turn and tiny advances are floored.
fn dominant_period(phase: &[f64]) -> Vec<f64> {
    let mut raw = Vec::with_capacity(phase.len());
    for t in 0..phase.len() {
        let prev = if t == 0 { phase[0] } else { phase[t - 1] };
        let mut advance = phase[t] - prev;
        if advance <= 0.0 {
            advance += 360.0;
        }
        raw.push(360.0 / advance.max(1e-3));
    }
    series::sma(&raw, PERIOD_SMOOTHING)
}
