//! Configuration for the processing pipeline.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main configuration; every field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sampling rate of the headset
    pub sample_rate_hz: f64,
    /// Samples kept per device (500 = 2 s at 250 Hz)
    pub buffer_capacity: usize,
    /// ADC code that corresponds to 0 V
    pub adc_midpoint: f64,
    pub filter: FilterConfig,
    /// Windows shorter than this get the fallback band powers
    pub min_spectrum_len: usize,
    pub hybrid: HybridThresholds,
    /// Deadline for a remote classifier; `None` calls it inline
    pub classifier_timeout_ms: Option<u64>,
}
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            buffer_capacity: 500,
            adc_midpoint: 2048.0,
            filter: FilterConfig::default(),
            min_spectrum_len: 50,
            hybrid: HybridThresholds::default(),
            classifier_timeout_ms: None,
        }
    }
}
impl EngineConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
    pub fn classifier_timeout(&self) -> Option<Duration> {
        self.classifier_timeout_ms.map(Duration::from_millis)
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("buffer_capacity must be at least 1".into()));
        }
        if self.adc_midpoint <= 0.0 {
            return Err(ConfigError::Invalid("adc_midpoint must be positive".into()));
        }
        let nyquist = self.sample_rate_hz / 2.0;
        let f = &self.filter;
        if !(f.band_low_hz > 0.0 && f.band_low_hz < f.band_high_hz) {
            return Err(ConfigError::Invalid(format!(
                "pass band {}..{} Hz is inverted or empty",
                f.band_low_hz, f.band_high_hz
            )));
        }
        if f.band_high_hz >= nyquist || f.notch_hz >= nyquist {
            return Err(ConfigError::Invalid(format!(
                "filter frequencies must stay below Nyquist ({nyquist} Hz)"
            )));
        }
        if f.notch_q <= 0.0 {
            return Err(ConfigError::Invalid("notch_q must be positive".into()));
        }
        let h = &self.hybrid;
        if !(0.0..=1.0).contains(&h.medium_confidence)
            || !(0.0..=1.0).contains(&h.high_confidence)
            || h.medium_confidence > h.high_confidence
        {
            return Err(ConfigError::Invalid(format!(
                "confidence thresholds must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                h.medium_confidence, h.high_confidence
            )));
        }
        Ok(())
    }
}

/// Notch and band-limiting filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Mains frequency to suppress
    pub notch_hz: f64,
    pub notch_q: f64,
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    /// Each filter stage is skipped below this many samples
    pub min_filter_len: usize,
    /// Filtering only runs on windows longer than this
    pub filter_above_len: usize,
}
impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            notch_hz: 50.0,
            notch_q: 10.0,
            band_low_hz: 0.5,
            band_high_hz: 48.0,
            min_filter_len: 10,
            filter_above_len: 50,
        }
    }
}

/// Confidence bands of the hybrid decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridThresholds {
    /// Above this the external label wins outright
    pub high_confidence: f64,
    /// At or below this the rule-based label wins
    pub medium_confidence: f64,
}
impl Default for HybridThresholds {
    fn default() -> Self {
        Self {
            high_confidence: 0.75,
            medium_confidence: 0.55,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity, 500);
        assert_eq!(config.classifier_timeout(), None);
    }
    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"sample_rate_hz": 500.0, "filter": {"notch_hz": 60.0}}"#)
                .unwrap();
        assert_eq!(config.sample_rate_hz, 500.0);
        assert_eq!(config.filter.notch_hz, 60.0);
        assert_eq!(config.filter.notch_q, 10.0);
        assert_eq!(config.buffer_capacity, 500);
    }
    #[test]
    fn rejects_out_of_order_thresholds() {
        let mut config = EngineConfig::default();
        config.hybrid.medium_confidence = 0.9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
    #[test]
    fn rejects_band_above_nyquist() {
        let config = EngineConfig {
            sample_rate_hz: 80.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("neurofocus-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"buffer_capacity": 250, "classifier_timeout_ms": 40}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.buffer_capacity, 250);
        assert_eq!(config.classifier_timeout(), Some(Duration::from_millis(40)));
        assert!(EngineConfig::load(Path::new("/nonexistent/neurofocus.json")).is_err());
    }
}
