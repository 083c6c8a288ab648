//! Per-device EEG attention monitoring.
//!
//! Raw single-channel ADC samples are buffered per device, conditioned
//! (mains notch + band limit), turned into delta..gamma band powers, scored
//! for focus and labelled with a mental state by a rule engine, optionally
//! reconciled with an external statistical classifier.
//!
//! ```text
//! samples ─▶ DeviceBufferStore ─▶ SignalConditioner ─▶ SpectralAnalyzer
//!                   │                                        │
//!                   │ raw window                       BandPowers
//!                   ▼                                        ▼
//!            extract_features ◀──── focus_score ◀────────────┤
//!                   │                                        ▼
//!                   └──────────▶ HybridEngine ◀──── classify_state
//!                                     │
//!                                 MentalState
//! ```
//!
//! # Example
//!
//! ```
//! use neurofocus::{FocusPipeline, MentalState};
//!
//! let pipeline = FocusPipeline::rules_only();
//! let first = pipeline.process("aa:bb:cc", &[]);
//! assert_eq!(first.state, MentalState::Monitoring);
//!
//! let analysis = pipeline.process("aa:bb:cc", &[2048.0; 250]);
//! assert!(analysis.state.is_classified());
//! assert!((0.0..=1.0).contains(&analysis.focus));
//! ```

pub mod classify;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod types;

pub use classify::{
    classify_state, extract_features, focus_score, ClassifierError, DeadlineClassifier,
    HybridDecision, HybridEngine, MentalState, Prediction, StateClassifier, FEATURE_LEN,
};
pub use config::{ConfigError, EngineConfig, FilterConfig, HybridThresholds};
pub use drivers::{
    Analysis, Band, BandPowers, DeviceBufferStore, FocusPipeline, SampleBatch, SampleSource,
    SignalConditioner, SignalError, SpectralAnalyzer,
};
pub use engine::{spawn_worker, stream_analyses};
pub use types::{EngineCommand, EngineMessage};
