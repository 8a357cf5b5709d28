//! Whole-series numeric helpers. Undefined values are NaN and propagate
//! through every window that touches them.

pub const NAN: f64 = f64::NAN;

/// Applies `f` to every full window of `n` values. Windows holding a NaN
/// (and the first `n - 1` positions) yield NaN.
pub fn rolling(values: &[f64], n: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![NAN; values.len()];
    if n == 0 {
        return out;
    }
    for t in (n - 1)..values.len() {
        let window = &values[t + 1 - n..=t];
        if window.iter().all(|v| !v.is_nan()) {
            out[t] = f(window);
        }
    }
    out
}

/// Two-series version of [`rolling`].
pub fn rolling_pair(a: &[f64], b: &[f64], n: usize, f: impl Fn(&[f64], &[f64]) -> f64) -> Vec<f64> {
    let len = a.len().min(b.len());
    let mut out = vec![NAN; len];
    if n == 0 {
        return out;
    }
    for t in (n - 1)..len {
        let wa = &a[t + 1 - n..=t];
        let wb = &b[t + 1 - n..=t];
        if wa.iter().chain(wb).all(|v| !v.is_nan()) {
            out[t] = f(wa, wb);
        }
    }
    out
}

pub fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (1 = sample).
pub fn variance(window: &[f64], ddof: usize) -> f64 {
    if window.len() <= ddof {
        return NAN;
    }
    let m = mean(window);
    window.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (window.len() - ddof) as f64
}

pub fn sma(values: &[f64], n: usize) -> Vec<f64> {
    rolling(values, n, mean)
}

pub fn rolling_sum(values: &[f64], n: usize) -> Vec<f64> {
    rolling(values, n, |w| w.iter().sum())
}

pub fn highest(values: &[f64], n: usize) -> Vec<f64> {
    rolling(values, n, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn lowest(values: &[f64], n: usize) -> Vec<f64> {
    rolling(values, n, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn stddev(values: &[f64], n: usize, ddof: usize) -> Vec<f64> {
    rolling(values, n, |w| variance(w, ddof).sqrt())
}

pub fn rolling_variance(values: &[f64], n: usize, ddof: usize) -> Vec<f64> {
    rolling(values, n, |w| variance(w, ddof))
}

/// Sample covariance over each window.
pub fn rolling_cov(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    rolling_pair(a, b, n, |wa, wb| {
        if wa.len() < 2 {
            return NAN;
        }
        let (ma, mb) = (mean(wa), mean(wb));
        wa.iter().zip(wb).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / (wa.len() - 1) as f64
    })
}

/// Pearson correlation over each window; NaN when either side is flat.
pub fn rolling_corr(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    rolling_pair(a, b, n, |wa, wb| {
        let (ma, mb) = (mean(wa), mean(wb));
        let mut sab = 0.0;
        let mut saa = 0.0;
        let mut sbb = 0.0;
        for (x, y) in wa.iter().zip(wb) {
            sab += (x - ma) * (y - mb);
            saa += (x - ma).powi(2);
            sbb += (y - mb).powi(2);
        }
        let den = (saa * sbb).sqrt();
        if den > 0.0 {
            sab / den
        } else {
            NAN
        }
    })
}

/// Linearly weighted moving average, weights 1..=n with the newest heaviest.
pub fn wma(values: &[f64], n: usize) -> Vec<f64> {
    let denom = (n * (n + 1)) as f64 / 2.0;
    rolling(values, n, |w| {
        w.iter().enumerate().map(|(i, v)| v * (i + 1) as f64).sum::<f64>() / denom
    })
}

/// Exponential smoothing seeded with the first defined value.
/// NaN inputs after the seed carry the previous value forward.
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        if v.is_nan() {
            out.push(prev.unwrap_or(NAN));
            continue;
        }
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        prev = Some(next);
        out.push(next);
    }
    out
}

/// EMA with `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    ewm(values, 2.0 / (span as f64 + 1.0))
}

/// Wilder smoothing, `alpha = 1 / n`.
pub fn wilder(values: &[f64], n: usize) -> Vec<f64> {
    ewm(values, 1.0 / n as f64)
}

/// Bias-corrected EMA: weighted mean of all history with weights
/// `(1 - alpha)^age`. NaN inputs still age the older weights.
pub fn ema_adjusted(values: &[f64], span: usize) -> Vec<f64> {
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut num = 0.0;
    let mut den = 0.0;
    let mut out = Vec::with_capacity(values.len());
    for &v in values {
        num *= decay;
        den *= decay;
        if !v.is_nan() {
            num += v;
            den += 1.0;
        }
        out.push(if den > 0.0 { num / den } else { NAN });
    }
    out
}

pub fn shift(values: &[f64], k: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t >= k { values[t - k] } else { NAN })
        .collect()
}

pub fn diff(values: &[f64], k: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t >= k { values[t] - values[t - k] } else { NAN })
        .collect()
}

/// `x[t] / x[t-k] - 1`; a zero base gives an infinite value.
pub fn pct_change(values: &[f64], k: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t >= k { values[t] / values[t - k] - 1.0 } else { NAN })
        .collect()
}

/// Running sum that skips NaN inputs but reports NaN at those rows.
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                NAN
            } else {
                acc += v;
                acc
            }
        })
        .collect()
}

pub fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

/// `a / b` elementwise with a zero denominator treated as undefined.
pub fn ratio(a: &[f64], b: &[f64]) -> Vec<f64> {
    zip_map(a, b, |x, y| if y == 0.0 { NAN } else { x / y })
}

pub fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

/// True range. The first bar has no previous close and uses `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|t| {
            let hl = high[t] - low[t];
            if t == 0 {
                return hl;
            }
            let prev = close[t - 1];
            hl.max((high[t] - prev).abs()).max((low[t] - prev).abs())
        })
        .collect()
}

/// Least-squares line over one window with x = 0..n-1.
#[derive(Debug, Clone, Copy)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn fit_line(window: &[f64]) -> LineFit {
    let n = window.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = mean(window);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    LineFit { slope, intercept: mean_y - slope * mean_x }
}

/// Rolling least-squares fit, `None` where the window is incomplete.
pub fn rolling_line(values: &[f64], n: usize) -> Vec<Option<LineFit>> {
    let mut out = vec![None; values.len()];
    if n < 2 {
        return out;
    }
    for t in (n - 1)..values.len() {
        let window = &values[t + 1 - n..=t];
        if window.iter().all(|v| !v.is_nan()) {
            out[t] = Some(fit_line(window));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert!(approx(out[2], 2.0));
        assert!(approx(out[3], 3.0));
    }

    #[test]
    fn test_rolling_skips_nan_windows() {
        let out = rolling_sum(&[1.0, NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan() && out[2].is_nan());
        assert!(approx(out[3], 7.0));
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let out = ema(&[10.0, 20.0], 3);
        assert!(approx(out[0], 10.0));
        assert!(approx(out[1], 15.0));
    }

    #[test]
    fn test_ema_adjusted_weights() {
        // span 3 -> alpha 0.5; second value = (20 + 0.5 * 10) / 1.5
        let out = ema_adjusted(&[10.0, 20.0], 3);
        assert!(approx(out[1], 25.0 / 1.5));
    }

    #[test]
    fn test_wma() {
        let out = wma(&[1.0, 2.0, 3.0], 3);
        assert!(approx(out[2], (1.0 + 4.0 + 9.0) / 6.0));
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let tr = true_range(&[10.0, 12.0], &[9.0, 11.0], &[9.5, 11.5]);
        assert!(approx(tr[0], 1.0));
        assert!(approx(tr[1], 2.5));
    }

    #[test]
    fn test_fit_line_exact() {
        let fit = fit_line(&[1.0, 3.0, 5.0, 7.0]);
        assert!(approx(fit.slope, 2.0));
        assert!(approx(fit.intercept, 1.0));
        assert!(approx(fit.at(3.0), 7.0));
    }

    #[test]
    fn test_corr_and_cov() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!(approx(rolling_corr(&a, &b, 4)[3], 1.0));
        assert!(approx(rolling_cov(&a, &b, 4)[3], 2.0 * variance(&a, 1)));
    }

    #[test]
    fn test_pct_change_zero_base_is_infinite() {
        let out = pct_change(&[0.0, 1.0], 1);
        assert!(out[1].is_infinite());
    }

    #[test]
    fn test_cumsum_skips_nan() {
        let out = cumsum(&[1.0, NAN, 2.0]);
        assert!(approx(out[0], 1.0));
        assert!(out[1].is_nan());
        assert!(approx(out[2], 3.0));
    }
}
