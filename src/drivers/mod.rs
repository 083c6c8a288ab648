// src/drivers/mod.rs
pub mod bands;
pub mod buffer;
pub mod error;
pub mod fft;
pub mod filter;
pub mod pipeline;
pub mod quality;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use bands::{Band, BandPowers, BAND_POWER_FLOOR};
pub use buffer::{DeviceBuffer, DeviceBufferStore};
pub use error::SignalError;
pub use fft::{PowerSpectrum, SpectralAnalyzer};
pub use filter::{FilterChain, FilterKind, SignalConditioner};
pub use pipeline::{Analysis, FocusPipeline};
pub use quality::{assess_quality, is_worn, SignalQuality};
pub use source::{JsonLinesSource, ManualSource, SampleBatch, SampleSource, SimulatedSource};
