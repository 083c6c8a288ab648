use log::warn;

use crate::classify::MentalState;
use crate::drivers::BandPowers;

/// Deterministic state from band-share rules. The first matching rule wins:
///
/// 1. focused: beta% > 25, theta% < 25, delta% < 25, beta/theta > 1.5, engagement > 0.8
/// 2. drowsy: delta% > 30, or theta% > 35 with beta% < 15 and engagement < 0.4
/// 3. distracted: theta% > 30, beta% < 20, beta/theta < 0.7, delta% < 30
/// 4. relaxed: alpha% > 35, beta% < 30, theta% < 25
/// 5. engagement alone: > 1.0 focused, > 0.5 relaxed, > 0.3 distracted, else drowsy
///
/// Zero total power and non-finite input both yield `Distracted`.
pub fn classify_state(bands: &BandPowers) -> MentalState {
    if !bands.is_finite() {
        warn!("non-finite band powers, rule classifier defaults to distracted");
        return MentalState::Distracted;
    }
    let Some(pct) = bands.percentages() else {
        return MentalState::Distracted;
    };
    let beta_theta = if pct.theta > 0.0 {
        pct.beta / pct.theta
    } else {
        0.0
    };
    let engagement = bands.engagement_index();

    if pct.beta > 25.0
        && pct.theta < 25.0
        && pct.delta < 25.0
        && beta_theta > 1.5
        && engagement > 0.8
    {
        MentalState::Focused
    } else if pct.delta > 30.0 || (pct.theta > 35.0 && pct.beta < 15.0 && engagement < 0.4) {
        MentalState::Drowsy
    } else if pct.theta > 30.0 && pct.beta < 20.0 && beta_theta < 0.7 && pct.delta < 30.0 {
        MentalState::Distracted
    } else if pct.alpha > 35.0 && pct.beta < 30.0 && pct.theta < 25.0 {
        MentalState::Relaxed
    } else if engagement > 1.0 {
        MentalState::Focused
    } else if engagement > 0.5 {
        MentalState::Relaxed
    } else if engagement > 0.3 {
        MentalState::Distracted
    } else {
        MentalState::Drowsy
    }
}
