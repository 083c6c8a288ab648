use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io::BufRead;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::drivers::{Band, SignalError};

/// Raw ADC samples uploaded by one device in arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    pub device_id: String,
    pub samples: Vec<f64>,
}
impl SampleBatch {
    pub fn new(device_id: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            device_id: device_id.into(),
            samples,
        }
    }
    pub fn validate(&self) -> Result<(), SignalError> {
        match self.samples.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(SignalError::NonFiniteSample {
                device_id: self.device_id.clone(),
                index,
            }),
            None => Ok(()),
        }
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
/// Something that can yield sample batches on demand.
pub trait SampleSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, SignalError>;
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SampleBatch>,
}
impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = SampleBatch>) -> Self {
        Self {
            queue: batches.into_iter().collect(),
        }
    }
}
impl SampleSource for ManualSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, SignalError> {
        Ok(self.queue.pop_front())
    }
}
/// One JSON `SampleBatch` per line; blank lines are skipped.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    line: usize,
}
impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0 }
    }
}
impl<R: BufRead> SampleSource for JsonLinesSource<R> {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, SignalError> {
        let mut text = String::new();
        loop {
            text.clear();
            if self.reader.read_line(&mut text)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if !text.trim().is_empty() {
                break;
            }
        }
        serde_json::from_str(text.trim())
            .map(Some)
            .map_err(|e| SignalError::MalformedBatch(format!("line {}: {e}", self.line)))
    }
}
/// Synthetic headset: a sine in the middle of one band plus broadband noise,
/// encoded as 12-bit ADC codes around the midpoint.
pub struct SimulatedSource {
    device_id: String,
    dominant: Band,
    sample_rate_hz: f64,
    batch_len: usize,
    remaining: usize,
    phase: f64,
    rng: StdRng,
}
impl SimulatedSource {
    pub fn new(
        device_id: impl Into<String>,
        dominant: Band,
        sample_rate_hz: f64,
        batch_len: usize,
        batches: usize,
        seed: u64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            dominant,
            sample_rate_hz,
            batch_len,
            remaining: batches,
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}
impl SampleSource for SimulatedSource {
    fn next_batch(&mut self) -> Result<Option<SampleBatch>, SignalError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        self.remaining -= 1;
        let (low, high) = self.dominant.range_hz();
        let freq = (low + high) / 2.0;
        let step = 2.0 * PI * freq / self.sample_rate_hz;
        let mut samples = Vec::with_capacity(self.batch_len);
        for _ in 0..self.batch_len {
            let noise: f64 = self.rng.gen_range(-60.0..60.0);
            let code = 2048.0 + 600.0 * self.phase.sin() + noise;
            samples.push(code.round().clamp(0.0, 4095.0));
            self.phase = (self.phase + step) % (2.0 * PI);
        }
        Ok(Some(SampleBatch::new(self.device_id.clone(), samples)))
    }
}
