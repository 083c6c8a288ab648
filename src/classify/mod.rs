// src/classify/mod.rs
pub mod features;
pub mod focus;
pub mod hybrid;
pub mod label;
pub mod model;
pub mod rules;
pub use features::{extract_features, FEATURE_LEN};
pub use focus::{focus_score, FOCUS_FALLBACK};
pub use hybrid::{DecisionSource, HybridDecision, HybridEngine};
pub use label::MentalState;
pub use model::{ClassifierError, DeadlineClassifier, Prediction, StateClassifier};
pub use rules::classify_state;
