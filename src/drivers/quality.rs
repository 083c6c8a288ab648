//! Contact / signal-quality checks on the latest raw ADC batch.
//!
//! A headset that is off the scalp or has a loose lead shows up as rails:
//! - all zeros: electrode disconnected,
//! - all 4095: amplifier saturated,
//! - only 0 / 4095: intermittent contact.
//!
//! Normal EEG codes sit well inside the range, roughly 500..3500.
use serde::{Deserialize, Serialize};

/// Lowest ADC code the 12-bit front end can report.
pub const ADC_MIN: f64 = 0.0;
/// Highest ADC code the 12-bit front end can report.
pub const ADC_MAX: f64 = 4095.0;
const NORMAL_LOW: f64 = 100.0;
const NORMAL_HIGH: f64 = 4000.0;
/// Share of samples that must sit in the normal range for a `Good` verdict.
const GOOD_SHARE: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    NoData,
    ConnectionError,
    Good,
}

fn only_rails(raw: &[f64]) -> bool {
    raw.iter().all(|&v| v == ADC_MIN || v == ADC_MAX)
}

/// Classifies the contact quality of a raw batch, with a human-readable reason.
pub fn assess_quality(raw: &[f64]) -> (SignalQuality, String) {
    if raw.is_empty() {
        return (SignalQuality::NoData, "No signal detected".to_owned());
    }
    if raw.iter().all(|&v| v == ADC_MIN) {
        return (
            SignalQuality::ConnectionError,
            "Sensor completely disconnected - receiving only zeros".to_owned(),
        );
    }
    if raw.iter().all(|&v| v == ADC_MAX) {
        return (
            SignalQuality::ConnectionError,
            "Sensor saturated - receiving only maximum values".to_owned(),
        );
    }
    if only_rails(raw) {
        return (
            SignalQuality::ConnectionError,
            "Intermittent connection - only getting boundary values".to_owned(),
        );
    }
    let normal = raw
        .iter()
        .filter(|&&v| (NORMAL_LOW..=NORMAL_HIGH).contains(&v))
        .count();
    if normal as f64 > raw.len() as f64 * GOOD_SHARE {
        return (
            SignalQuality::Good,
            "Signal quality good - receiving normal EEG data".to_owned(),
        );
    }
    let zeros = raw.iter().filter(|&&v| v == ADC_MIN).count();
    if zeros > 0 {
        return (
            SignalQuality::ConnectionError,
            format!("Partial connection issue - {zeros}/{} zero values", raw.len()),
        );
    }
    (SignalQuality::Good, "Signal connected".to_owned())
}

/// Whether the headset appears to be on the scalp: anything other than pure
/// rail values counts as worn.
pub fn is_worn(raw: &[f64]) -> bool {
    !raw.is_empty() && !only_rails(raw)
}
