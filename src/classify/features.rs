//! Fixed-layout feature vector for the statistical classifier.
//!
//! The classifier was trained on this exact ordering, so positions must never
//! move:
//!
//! | index   | block                                             |
//! |---------|---------------------------------------------------|
//! | 0..5    | band powers (delta, theta, alpha, beta, gamma)     |
//! | 5..10   | band share of total, percent                      |
//! | 10      | total power                                       |
//! | 11..25  | band ratios                                       |
//! | 25      | focus score                                       |
//! | 26..31  | `ln(1 + power)`                                   |
//! | 31..36  | `sqrt(share)`                                     |
//! | 36..41  | low / mid / high frequency group ratios           |
//! | 41..46  | band differences                                  |
//! | 46..51  | band products                                     |
//! | 51..56  | power relative to the strongest band              |
//! | 56..71  | raw buffer statistics (zeros when unavailable)    |
//! | 71..86  | spectral interaction terms                        |
//! | 86..106 | `0.1 * focus^k`, k = 1..=20                       |
//! | 106..148| zero padding                                      |
use log::warn;
use ndarray::Array1;

use crate::drivers::BandPowers;

pub const FEATURE_LEN: usize = 148;
/// Buffer statistics need strictly more samples than this.
const MIN_STATS_LEN: usize = 10;
const FOCUS_POWERS: usize = 20;
/// Stand-in for a zero total so shares stay defined.
const MIN_TOTAL_POWER: f64 = 1e-10;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Builds the 148-element vector. Never fails: any non-finite entry turns
/// the whole vector into zeros.
pub fn extract_features(bands: &BandPowers, focus: f64, raw_buffer: Option<&[f64]>) -> Array1<f64> {
    let features = build(bands, focus, raw_buffer);
    if features.iter().any(|v| !v.is_finite()) {
        warn!("feature vector has non-finite entries, substituting zeros");
        return Array1::zeros(FEATURE_LEN);
    }
    features
}

fn build(bands: &BandPowers, focus: f64, raw_buffer: Option<&[f64]>) -> Array1<f64> {
    let BandPowers {
        delta,
        theta,
        alpha,
        beta,
        gamma,
    } = *bands;
    let mut total = bands.total();
    if total == 0.0 {
        total = MIN_TOTAL_POWER;
    }
    let mut f: Vec<f64> = Vec::with_capacity(FEATURE_LEN);

    f.extend([delta, theta, alpha, beta, gamma]);
    f.extend(bands.values().map(|v| v / total * 100.0));
    f.push(total);

    f.extend([
        ratio(beta, theta),
        ratio(beta, alpha),
        ratio(alpha, theta),
        ratio(beta + gamma, alpha + theta),
        ratio(delta, theta),
        ratio(gamma, beta),
        ratio(alpha + theta, beta),
        ratio(beta, alpha + theta),
        ratio(theta + alpha, beta + gamma),
        ratio(alpha, delta),
        ratio(gamma, theta),
        ratio(beta, delta),
        ratio(beta + alpha, theta + delta),
        ratio(gamma, alpha),
    ]);

    f.push(focus);
    f.extend(bands.values().map(f64::ln_1p));
    f.extend(bands.values().map(|v| ratio(v, total).sqrt()));

    let low = delta + theta;
    let mid = alpha;
    let high = beta + gamma;
    f.extend([
        ratio(high, low),
        ratio(low, high),
        ratio(mid, low),
        ratio(mid, high),
        ratio(high + mid, low),
    ]);

    f.extend([beta - theta, beta - alpha, alpha - theta, gamma - beta, beta - delta]);
    f.extend([beta * alpha, theta * delta, gamma * beta, alpha * theta, beta * gamma]);

    let max_power = bands.max();
    f.extend(bands.values().map(|v| ratio(v, max_power)));

    match raw_buffer {
        Some(raw) if raw.len() > MIN_STATS_LEN => f.extend(buffer_statistics(raw)),
        _ => f.extend([0.0; 15]),
    }

    f.extend([
        ratio(beta + gamma, total),
        ratio(delta + theta, total),
        ratio(alpha, total),
        ratio(beta, delta + theta + alpha),
        ratio(gamma, delta + theta + alpha + beta),
        ratio((beta * alpha).sqrt(), theta),
        ratio(beta * beta, alpha * theta),
        if theta > 0.0 { (beta / theta).ln_1p() } else { 0.0 },
        if delta > 0.0 { (alpha / delta).ln_1p() } else { 0.0 },
        ratio(beta + alpha + gamma, theta + delta),
        ratio(beta * gamma, alpha * theta),
        ratio(beta - theta, beta + theta),
        ratio(alpha - delta, alpha + delta),
        ratio(gamma, beta + alpha),
        ratio(theta + delta + alpha, beta + gamma),
    ]);

    let remaining = FEATURE_LEN.saturating_sub(f.len());
    f.extend((1..=remaining.min(FOCUS_POWERS) as i32).map(|k| focus.powi(k) * 0.1));
    f.resize(FEATURE_LEN, 0.0);
    Array1::from_vec(f)
}

/// Fifteen descriptors of the raw window, population statistics throughout.
fn buffer_statistics(raw: &[f64]) -> [f64; 15] {
    let n = raw.len() as f64;
    let mean = raw.iter().sum::<f64>() / n;
    let variance = raw.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut sorted = raw.to_vec();
    sorted.sort_by(f64::total_cmp);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let diffs: Vec<f64> = raw.windows(2).map(|w| w[1] - w[0]).collect();
    let diff_abs_mean = diffs.iter().map(|d| d.abs()).sum::<f64>() / diffs.len() as f64;
    let diff_mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let diff_std = (diffs.iter().map(|d| (d - diff_mean).powi(2)).sum::<f64>()
        / diffs.len() as f64)
        .sqrt();

    [
        mean,
        variance.sqrt(),
        variance,
        percentile(&sorted, 50.0),
        max,
        min,
        max - min,
        percentile(&sorted, 25.0),
        percentile(&sorted, 75.0),
        percentile(&sorted, 90.0),
        diff_abs_mean,
        diff_std,
        n,
        raw.iter().filter(|&&v| v > 0.0).count() as f64,
        raw.iter().filter(|&&v| v < 0.0).count() as f64,
    ]
}

/// Linear-interpolation percentile over an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
