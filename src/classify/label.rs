use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Mental-state labels. `Monitoring` is only reported before a device has
/// produced any signal; classifiers never return it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentalState {
    Focused,
    Relaxed,
    Drowsy,
    Distracted,
    Monitoring,
}

static SYNONYMS: Lazy<HashMap<&'static str, MentalState>> = Lazy::new(|| {
    use MentalState::*;
    HashMap::from([
        ("focused", Focused),
        ("focus", Focused),
        ("concentrating", Focused),
        ("attentive", Focused),
        ("relaxed", Relaxed),
        ("calm", Relaxed),
        ("resting", Relaxed),
        ("drowsy", Drowsy),
        ("sleepy", Drowsy),
        ("tired", Drowsy),
        ("fatigue", Drowsy),
        ("distracted", Distracted),
        ("unfocused", Distracted),
        ("wandering", Distracted),
        ("monitoring", Distracted),
    ])
});

impl MentalState {
    pub const CLASSIFIED: [MentalState; 4] = [
        MentalState::Focused,
        MentalState::Relaxed,
        MentalState::Drowsy,
        MentalState::Distracted,
    ];
    pub fn as_str(self) -> &'static str {
        match self {
            MentalState::Focused => "focused",
            MentalState::Relaxed => "relaxed",
            MentalState::Drowsy => "drowsy",
            MentalState::Distracted => "distracted",
            MentalState::Monitoring => "monitoring",
        }
    }
    /// Maps a free-form label onto the four classified states. Unknown labels
    /// become `Distracted`.
    pub fn normalize(label: &str) -> MentalState {
        let key = label.trim().to_lowercase();
        SYNONYMS
            .get(key.as_str())
            .copied()
            .unwrap_or(MentalState::Distracted)
    }
    pub fn is_classified(self) -> bool {
        self != MentalState::Monitoring
    }
    /// Collapses the sentinel onto the safe default.
    pub fn classified_or_distracted(self) -> MentalState {
        if self.is_classified() {
            self
        } else {
            MentalState::Distracted
        }
    }
}
impl fmt::Display for MentalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
