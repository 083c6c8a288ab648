use std::sync::Arc;

use log::{debug, error, warn};
use serde::Serialize;

use crate::classify::{classify_state, extract_features, ClassifierError, MentalState, StateClassifier};
use crate::config::HybridThresholds;
use crate::drivers::BandPowers;

/// Which path produced the final label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// No external classifier configured
    RulesOnly,
    /// External classifier failed; rules used instead
    RulesFallback,
    /// Confidence too low to trust the external model
    RulesLowConfidence,
    /// High confidence, external label used as is
    Model,
    /// Medium confidence and both predictors agree
    Agreement,
    /// Medium confidence, disagreement settled by band shape
    Resolved,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HybridDecision {
    pub state: MentalState,
    pub rule_state: MentalState,
    pub model_state: Option<MentalState>,
    pub confidence: Option<f64>,
    pub source: DecisionSource,
}

/// Reconciles the rule-based label with an optional statistical classifier.
#[derive(Clone, Default)]
pub struct HybridEngine {
    classifier: Option<Arc<dyn StateClassifier>>,
    thresholds: HybridThresholds,
}
impl HybridEngine {
    pub fn new(classifier: Option<Arc<dyn StateClassifier>>, thresholds: HybridThresholds) -> Self {
        Self {
            classifier,
            thresholds,
        }
    }
    pub fn rules_only() -> Self {
        Self::default()
    }
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }
    pub fn predict_state(&self, bands: &BandPowers, focus: f64, raw_buffer: Option<&[f64]>) -> MentalState {
        self.decide(bands, focus, raw_buffer).state
    }
    /// Always returns one of the four classified states.
    pub fn decide(&self, bands: &BandPowers, focus: f64, raw_buffer: Option<&[f64]>) -> HybridDecision {
        let rule_state = classify_state(bands).classified_or_distracted();
        let Some(classifier) = &self.classifier else {
            debug!("rules only: {rule_state}");
            return HybridDecision {
                state: rule_state,
                rule_state,
                model_state: None,
                confidence: None,
                source: DecisionSource::RulesOnly,
            };
        };
        match self.consult(&**classifier, bands, focus, raw_buffer) {
            Ok((model_state, confidence)) => {
                let (state, source) = self.reconcile(bands, rule_state, model_state, confidence);
                debug!(
                    "model {model_state} ({confidence:.2}) | rules {rule_state} -> {state} via {source:?}"
                );
                let state = if state.is_classified() {
                    state
                } else {
                    warn!("invalid state '{state}', defaulting to distracted");
                    MentalState::Distracted
                };
                HybridDecision {
                    state,
                    rule_state,
                    model_state: Some(model_state),
                    confidence: Some(confidence),
                    source,
                }
            }
            Err(err) => {
                error!("external classifier failed: {err}, falling back to rules");
                HybridDecision {
                    state: rule_state,
                    rule_state,
                    model_state: None,
                    confidence: None,
                    source: DecisionSource::RulesFallback,
                }
            }
        }
    }
    fn consult(
        &self,
        classifier: &dyn StateClassifier,
        bands: &BandPowers,
        focus: f64,
        raw_buffer: Option<&[f64]>,
    ) -> Result<(MentalState, f64), ClassifierError> {
        let features = extract_features(bands, focus, raw_buffer);
        let prediction = classifier.classify(features.as_slice().unwrap_or(&[]))?;
        let confidence = prediction.confidence()?;
        Ok((MentalState::normalize(&prediction.label), confidence))
    }
    fn reconcile(
        &self,
        bands: &BandPowers,
        rule_state: MentalState,
        model_state: MentalState,
        confidence: f64,
    ) -> (MentalState, DecisionSource) {
        if confidence > self.thresholds.high_confidence {
            return (model_state, DecisionSource::Model);
        }
        if confidence <= self.thresholds.medium_confidence {
            return (rule_state, DecisionSource::RulesLowConfidence);
        }
        if model_state == rule_state {
            return (model_state, DecisionSource::Agreement);
        }
        let either = |state| model_state == state || rule_state == state;
        let Some(pct) = bands.percentages() else {
            warn!("band shares undefined at zero total power, keeping rule label");
            return (rule_state, DecisionSource::RulesFallback);
        };
        let state = if pct.beta > 30.0 && pct.theta < 20.0 {
            if either(MentalState::Focused) {
                MentalState::Focused
            } else {
                model_state
            }
        } else if pct.theta > 35.0 {
            if either(MentalState::Drowsy) {
                MentalState::Drowsy
            } else {
                MentalState::Distracted
            }
        } else {
            model_state
        };
        (state, DecisionSource::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FEATURE_LEN;

    struct Fixed {
        label: &'static str,
        probabilities: Vec<f64>,
    }
    impl Fixed {
        fn new(label: &'static str, confidence: f64) -> Arc<dyn StateClassifier> {
            Arc::new(Fixed {
                label,
                probabilities: vec![confidence, 1.0 - confidence],
            })
        }
    }
    impl StateClassifier for Fixed {
        fn predict(&self, features: &[f64]) -> Result<String, ClassifierError> {
            if features.len() != FEATURE_LEN {
                return Err(ClassifierError::FeatureLength {
                    expected: FEATURE_LEN,
                    actual: features.len(),
                });
            }
            Ok(self.label.to_owned())
        }
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            Ok(self.probabilities.clone())
        }
    }
    struct Broken;
    impl StateClassifier for Broken {
        fn predict(&self, _features: &[f64]) -> Result<String, ClassifierError> {
            Err(ClassifierError::Prediction("model file corrupt".into()))
        }
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            Ok(vec![1.0])
        }
    }
    fn engine(classifier: Arc<dyn StateClassifier>) -> HybridEngine {
        HybridEngine::new(Some(classifier), HybridThresholds::default())
    }
    fn drowsy_bands() -> BandPowers {
        BandPowers::new(0.45, 0.30, 0.12, 0.08, 0.05)
    }
    #[test]
    fn rules_only_without_classifier() {
        let bands = BandPowers::new(0.10, 0.15, 0.20, 0.45, 0.10);
        let decision = HybridEngine::rules_only().decide(&bands, 0.8, None);
        assert_eq!(decision.state, MentalState::Focused);
        assert_eq!(decision.source, DecisionSource::RulesOnly);
    }
    #[test]
    fn high_confidence_model_wins() {
        let decision = engine(Fixed::new("focused", 0.9)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.rule_state, MentalState::Drowsy);
        assert_eq!(decision.state, MentalState::Focused);
        assert_eq!(decision.source, DecisionSource::Model);
    }
    #[test]
    fn low_confidence_keeps_rules() {
        let decision = engine(Fixed::new("focused", 0.55)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Drowsy);
        assert_eq!(decision.source, DecisionSource::RulesLowConfidence);
    }
    #[test]
    fn medium_confidence_agreement() {
        let decision = engine(Fixed::new("sleepy", 0.7)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Drowsy);
        assert_eq!(decision.source, DecisionSource::Agreement);
    }
    #[test]
    fn medium_confidence_beta_shape_prefers_focused() {
        // beta 45%, theta 15%: rules say focused, model says relaxed
        let bands = BandPowers::new(0.10, 0.15, 0.20, 0.45, 0.10);
        let decision = engine(Fixed::new("relaxed", 0.7)).decide(&bands, 0.8, None);
        assert_eq!(decision.state, MentalState::Focused);
        assert_eq!(decision.source, DecisionSource::Resolved);
    }
    #[test]
    fn medium_confidence_theta_shape_without_drowsy_is_distracted() {
        // theta 40%: rules say distracted, model says focused
        let bands = BandPowers::new(0.15, 0.40, 0.15, 0.20, 0.10);
        let decision = engine(Fixed::new("focused", 0.6)).decide(&bands, 0.2, None);
        assert_eq!(decision.state, MentalState::Distracted);
    }
    #[test]
    fn medium_confidence_theta_shape_prefers_drowsy() {
        let bands = BandPowers::new(0.15, 0.40, 0.15, 0.20, 0.10);
        let decision = engine(Fixed::new("tired", 0.6)).decide(&bands, 0.2, None);
        assert_eq!(decision.state, MentalState::Drowsy);
    }
    #[test]
    fn medium_confidence_other_shapes_follow_model() {
        // alpha dominant: rules relaxed, model distracted
        let bands = BandPowers::new(0.10, 0.15, 0.45, 0.20, 0.10);
        let decision = engine(Fixed::new("distracted", 0.65)).decide(&bands, 0.4, None);
        assert_eq!(decision.state, MentalState::Distracted);
    }
    #[test]
    fn medium_confidence_beta_shape_without_focused_follows_model() {
        // beta 32%, theta 10%, delta 35%: rules say drowsy, model says relaxed
        let bands = BandPowers::new(0.35, 0.10, 0.15, 0.32, 0.08);
        let decision = engine(Fixed::new("relaxed", 0.65)).decide(&bands, 0.5, None);
        assert_eq!(decision.rule_state, MentalState::Drowsy);
        assert_eq!(decision.state, MentalState::Relaxed);
        assert_eq!(decision.source, DecisionSource::Resolved);
    }
    #[test]
    fn medium_confidence_on_zero_bands_keeps_rules() {
        let silent = BandPowers::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let decision = engine(Fixed::new("focused", 0.7)).decide(&silent, 0.0, None);
        assert_eq!(decision.state, MentalState::Distracted);
        assert_eq!(decision.source, DecisionSource::RulesFallback);
    }
    #[test]
    fn out_of_range_confidence_is_not_trusted() {
        let decision = engine(Fixed::new("focused", 7.5)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Drowsy);
        assert_eq!(decision.source, DecisionSource::RulesFallback);
        assert_eq!(decision.confidence, None);
    }
    #[test]
    fn unknown_model_labels_become_distracted() {
        let decision = engine(Fixed::new("monitoring", 0.95)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Distracted);
        let decision = engine(Fixed::new("euphoric", 0.95)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Distracted);
    }
    #[test]
    fn failing_model_degrades_to_rules() {
        let decision = engine(Arc::new(Broken)).decide(&drowsy_bands(), 0.1, None);
        assert_eq!(decision.state, MentalState::Drowsy);
        assert_eq!(decision.source, DecisionSource::RulesFallback);
        let empty: Arc<dyn StateClassifier> = Arc::new(Fixed {
            label: "focused",
            probabilities: vec![],
        });
        assert_eq!(engine(empty).predict_state(&drowsy_bands(), 0.1, None), MentalState::Drowsy);
    }
}
