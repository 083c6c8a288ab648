use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest power any band may report; keeps downstream ratios defined.
pub const BAND_POWER_FLOOR: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}
impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];
    /// Inclusive frequency range in Hz.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (0.5, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 45.0),
        }
    }
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }
}
impl FromStr for Band {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::ALL
            .into_iter()
            .find(|band| band.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown band '{s}', expected one of delta/theta/alpha/beta/gamma"))
    }
}

/// Spectral power per EEG band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}
impl BandPowers {
    pub fn new(delta: f64, theta: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }
    /// Returned when the window is too short for a spectrum.
    pub fn short_window_fallback() -> Self {
        Self::new(0.1, 0.1, 0.1, 0.1, 0.1)
    }
    /// Returned when a whole processing call has to be abandoned.
    pub fn processing_fallback() -> Self {
        Self::new(0.2, 0.15, 0.3, 0.25, 0.1)
    }
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }
    pub fn values(&self) -> [f64; 5] {
        [self.delta, self.theta, self.alpha, self.beta, self.gamma]
    }
    /// Sum in delta..gamma order.
    pub fn total(&self) -> f64 {
        self.values().iter().sum()
    }
    pub fn max(&self) -> f64 {
        self.values().iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }
    /// Share of total power per band, in percent. `None` when total is zero.
    pub fn percentages(&self) -> Option<BandPowers> {
        let total = self.total();
        if total == 0.0 {
            return None;
        }
        let pct = |v: f64| v / total * 100.0;
        Some(BandPowers::new(
            pct(self.delta),
            pct(self.theta),
            pct(self.alpha),
            pct(self.beta),
            pct(self.gamma),
        ))
    }
    /// NASA engagement index, beta / (alpha + theta); 0 when the denominator is tiny.
    pub fn engagement_index(&self) -> f64 {
        let denominator = self.alpha + self.theta;
        if denominator > 0.01 {
            self.beta / denominator
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn percentages_sum_to_hundred() {
        let bands = BandPowers::new(0.45, 0.30, 0.12, 0.08, 0.05);
        let pct = bands.percentages().unwrap();
        assert!((pct.total() - 100.0).abs() < 1e-9);
        assert!((pct.delta - 45.0).abs() < 1e-9);
        assert!(BandPowers::new(0.0, 0.0, 0.0, 0.0, 0.0).percentages().is_none());
    }
    #[test]
    fn engagement_needs_meaningful_denominator() {
        assert_eq!(BandPowers::new(0.1, 0.004, 0.004, 0.5, 0.1).engagement_index(), 0.0);
        let bands = BandPowers::new(0.1, 0.2, 0.3, 0.5, 0.1);
        assert!((bands.engagement_index() - 1.0).abs() < 1e-12);
    }
    #[test]
    fn parses_band_names() {
        assert_eq!("Alpha".parse::<Band>(), Ok(Band::Alpha));
        assert!("mu".parse::<Band>().is_err());
    }
    #[test]
    fn serializes_with_band_names() {
        let json = serde_json::to_value(BandPowers::short_window_fallback()).unwrap();
        for band in Band::ALL {
            assert_eq!(json[band.name()], 0.1);
        }
    }
}
