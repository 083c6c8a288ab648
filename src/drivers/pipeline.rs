use std::sync::Arc;

use log::{debug, error};
use serde::Serialize;

use crate::classify::{focus_score, DeadlineClassifier, DecisionSource, HybridEngine, MentalState, StateClassifier};
use crate::config::EngineConfig;
use crate::drivers::source::{SampleBatch, SampleSource};
use crate::drivers::{
    assess_quality, is_worn, BandPowers, DeviceBufferStore, SignalConditioner, SignalError,
    SignalQuality, SpectralAnalyzer,
};

/// Focus score reported alongside the processing fallback bands.
const PROCESSING_FALLBACK_FOCUS: f64 = 0.4;

/// Everything computed for one upload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub device_id: String,
    pub band_powers: BandPowers,
    pub focus: f64,
    pub state: MentalState,
    /// `None` when the result is a fallback and no decision was made
    pub decision: Option<DecisionSource>,
    pub quality: SignalQuality,
    pub quality_message: String,
    pub worn: bool,
    pub buffered_samples: usize,
}

/// Per-device ingestion: buffer, condition, spectrum, focus and hybrid state.
///
/// Shared freely across threads; only the device's own buffer is locked while
/// a batch is appended.
pub struct FocusPipeline {
    buffers: DeviceBufferStore,
    conditioner: SignalConditioner,
    analyzer: SpectralAnalyzer,
    hybrid: HybridEngine,
}
impl FocusPipeline {
    pub fn new(config: &EngineConfig, classifier: Option<Arc<dyn StateClassifier>>) -> Self {
        let classifier = match (classifier, config.classifier_timeout()) {
            (Some(inner), Some(timeout)) => {
                Some(Arc::new(DeadlineClassifier::new(inner, timeout)) as Arc<dyn StateClassifier>)
            }
            (classifier, _) => classifier,
        };
        Self {
            buffers: DeviceBufferStore::new(config.buffer_capacity),
            conditioner: SignalConditioner::new(
                config.sample_rate_hz,
                config.adc_midpoint,
                config.filter.clone(),
            ),
            analyzer: SpectralAnalyzer::new(config.sample_rate_hz, config.min_spectrum_len),
            hybrid: HybridEngine::new(classifier, config.hybrid),
        }
    }
    /// Formula-only pipeline with default settings.
    pub fn rules_only() -> Self {
        Self::new(&EngineConfig::default(), None)
    }
    pub fn buffers(&self) -> &DeviceBufferStore {
        &self.buffers
    }
    pub fn hybrid(&self) -> &HybridEngine {
        &self.hybrid
    }
    /// Never fails: invalid input yields the `monitoring` fallback.
    pub fn process(&self, device_id: &str, samples: &[f64]) -> Analysis {
        let batch = SampleBatch::new(device_id, samples.to_vec());
        match self.try_process(&batch) {
            Ok(analysis) => analysis,
            Err(err) => {
                error!("processing error for device {device_id}: {err}");
                self.fallback(device_id, samples)
            }
        }
    }
    pub fn process_batch(&self, batch: &SampleBatch) -> Analysis {
        self.process(&batch.device_id, &batch.samples)
    }
    /// Drains a source, processing each batch in order.
    pub fn pump<S: SampleSource>(&self, source: &mut S) -> Result<Vec<Analysis>, SignalError> {
        let mut out = Vec::new();
        while let Some(batch) = source.next_batch()? {
            out.push(self.process_batch(&batch));
        }
        Ok(out)
    }
    pub fn reset(&self, device_id: &str) -> bool {
        self.buffers.reset(device_id)
    }
    pub fn device_ids(&self) -> Vec<String> {
        self.buffers.device_ids()
    }
    fn try_process(&self, batch: &SampleBatch) -> Result<Analysis, SignalError> {
        batch.validate()?;
        let window = self
            .buffers
            .append_and_snapshot(&batch.device_id, &batch.samples);
        let (quality, quality_message) = assess_quality(&batch.samples);
        let worn = is_worn(&batch.samples);

        if window.is_empty() {
            let band_powers = BandPowers::short_window_fallback();
            return Ok(Analysis {
                device_id: batch.device_id.clone(),
                band_powers,
                focus: focus_score(&band_powers),
                state: MentalState::Monitoring,
                decision: None,
                quality,
                quality_message,
                worn,
                buffered_samples: 0,
            });
        }

        let conditioned = self.conditioner.condition(&window);
        let band_powers = self.analyzer.band_powers(&conditioned);
        let focus = focus_score(&band_powers);
        let decision = self.hybrid.decide(&band_powers, focus, Some(&window));
        debug!(
            "{}: {} samples, focus {focus:.3}, state {}",
            batch.device_id,
            window.len(),
            decision.state
        );
        Ok(Analysis {
            device_id: batch.device_id.clone(),
            band_powers,
            focus,
            state: decision.state,
            decision: Some(decision.source),
            quality,
            quality_message,
            worn,
            buffered_samples: window.len(),
        })
    }
    fn fallback(&self, device_id: &str, samples: &[f64]) -> Analysis {
        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        let (quality, quality_message) = assess_quality(&finite);
        Analysis {
            device_id: device_id.to_owned(),
            band_powers: BandPowers::processing_fallback(),
            focus: PROCESSING_FALLBACK_FOCUS,
            state: MentalState::Monitoring,
            decision: None,
            quality,
            quality_message,
            worn: is_worn(&finite),
            buffered_samples: self.buffers.len(device_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{ManualSource, SimulatedSource};
    use crate::drivers::Band;
    #[test]
    fn first_empty_upload_is_monitoring() {
        let pipeline = FocusPipeline::rules_only();
        let analysis = pipeline.process("aa:bb", &[]);
        assert_eq!(analysis.state, MentalState::Monitoring);
        assert_eq!(analysis.band_powers, BandPowers::short_window_fallback());
        assert_eq!(analysis.quality, SignalQuality::NoData);
        assert!(!analysis.worn);
    }
    #[test]
    fn short_window_still_classifies() {
        let pipeline = FocusPipeline::rules_only();
        let analysis = pipeline.process("aa:bb", &[2048.0; 20]);
        assert_eq!(analysis.band_powers, BandPowers::short_window_fallback());
        assert!(analysis.state.is_classified());
        assert_eq!(analysis.buffered_samples, 20);
    }
    #[test]
    fn non_finite_batch_is_rejected_without_buffering() {
        let pipeline = FocusPipeline::rules_only();
        pipeline.process("d", &[2000.0; 30]);
        let analysis = pipeline.process("d", &[2000.0, f64::NAN]);
        assert_eq!(analysis.state, MentalState::Monitoring);
        assert_eq!(analysis.band_powers, BandPowers::processing_fallback());
        assert_eq!(analysis.focus, 0.4);
        assert_eq!(analysis.buffered_samples, 30);
    }
    #[test]
    fn alpha_headset_reads_relaxed_band_profile() {
        let pipeline = FocusPipeline::rules_only();
        let mut source = SimulatedSource::new("sim", Band::Alpha, 250.0, 125, 4, 42);
        let results = pipeline.pump(&mut source).unwrap();
        let last = results.last().unwrap();
        assert_eq!(last.buffered_samples, 500);
        let b = last.band_powers;
        assert!(b.alpha > b.delta && b.alpha > b.theta && b.alpha > b.beta && b.alpha > b.gamma);
        assert_eq!(last.quality, SignalQuality::Good);
        assert_eq!(last.decision, Some(DecisionSource::RulesOnly));
    }
    #[test]
    fn reset_starts_device_over() {
        let pipeline = FocusPipeline::rules_only();
        let mut source = ManualSource::new(vec![SampleBatch::new("x", vec![2100.0; 60])]);
        pipeline.pump(&mut source).unwrap();
        assert_eq!(pipeline.device_ids(), vec!["x".to_string()]);
        assert!(pipeline.reset("x"));
        assert!(pipeline.device_ids().is_empty());
        assert_eq!(pipeline.process("x", &[2048.0]).buffered_samples, 1);
    }
}
