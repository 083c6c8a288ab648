use log::warn;

use crate::drivers::BandPowers;

/// Score returned when the band powers cannot be scored.
pub const FOCUS_FALLBACK: f64 = 0.3;

/// Attention score in [0, 1] from the NASA engagement index, nudged by gamma
/// (up) and delta (down) shares, then refined with band-share thresholds.
pub fn focus_score(bands: &BandPowers) -> f64 {
    if !bands.is_finite() {
        warn!("non-finite band powers, focus falls back to {FOCUS_FALLBACK}");
        return FOCUS_FALLBACK;
    }
    let base = (bands.engagement_index() / 2.0).min(1.0);
    let beta_theta = if bands.theta > 0.01 {
        bands.beta / bands.theta
    } else {
        0.0
    };
    let total = bands.total();
    let (gamma_factor, delta_penalty) = if total > 0.0 {
        (bands.gamma / total * 2.0, bands.delta / total * 1.5)
    } else {
        (0.0, 0.0)
    };
    let mut score = (base + gamma_factor - delta_penalty).clamp(0.0, 1.0);

    if total > 0.0 {
        let beta_pct = bands.beta / total * 100.0;
        let theta_pct = bands.theta / total * 100.0;
        let alpha_pct = bands.alpha / total * 100.0;
        if beta_pct > 30.0 && theta_pct < 20.0 && beta_theta > 2.0 {
            score = (score + 0.15).min(1.0);
        } else if beta_pct < 15.0 || theta_pct > 40.0 || beta_theta < 0.5 {
            score = (score - 0.2).max(0.0);
        } else if alpha_pct > 40.0 {
            score = score.min(0.65);
        }
    }
    if score.is_finite() {
        score
    } else {
        FOCUS_FALLBACK
    }
}
