use std::f64::consts::{FRAC_1_SQRT_2, PI};

use log::warn;

use crate::config::FilterConfig;
use crate::drivers::SignalError;

#[derive(Clone, Copy, Debug)]
pub enum FilterKind {
    /// IIR notch with -3 dB bandwidth `freq_hz / q`.
    Notch { freq_hz: f64, q: f64 },
    Highpass { cutoff_hz: f64, q: f64 },
    Lowpass { cutoff_hz: f64, q: f64 },
    /// Butterworth high-pass followed by Butterworth low-pass.
    Bandlimit { low_hz: f64, high_hz: f64 },
}
impl FilterKind {
    fn name(&self) -> &'static str {
        match self {
            FilterKind::Notch { .. } => "notch",
            FilterKind::Highpass { .. } => "highpass",
            FilterKind::Lowpass { .. } => "lowpass",
            FilterKind::Bandlimit { .. } => "bandlimit",
        }
    }
}
/// Second-order section with coefficients divided through by `a0`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Section {
    b: [f64; 3],
    a: [f64; 2],
}
impl Section {
    fn from_raw(b: [f64; 3], [a0, a1, a2]: [f64; 3]) -> Self {
        Self {
            b: b.map(|c| c / a0),
            a: [a1 / a0, a2 / a0],
        }
    }
    fn check(self, filter: &'static str) -> Result<Self, SignalError> {
        if self.b.iter().chain(&self.a).any(|c| !c.is_finite()) {
            return Err(SignalError::NonFiniteCoefficients(filter));
        }
        let [a1, a2] = self.a;
        // Both poles inside the unit circle.
        if a2.abs() >= 1.0 || a1.abs() >= 1.0 + a2 {
            return Err(SignalError::UnstableFilter { filter, a1, a2 });
        }
        Ok(self)
    }
    /// Filters a whole window starting from rest.
    fn run(&self, signal: &[f64]) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let (mut s1, mut s2) = (0.0, 0.0);
        signal
            .iter()
            .map(|&x| {
                let y = b0 * x + s1;
                s1 = b1 * x - a1 * y + s2;
                s2 = b2 * x - a2 * y;
                y
            })
            .collect()
    }
}

/// Cascade of sections designed for one conditioning stage.
#[derive(Debug)]
pub struct FilterChain {
    name: &'static str,
    sections: Vec<Section>,
}
impl FilterChain {
    pub fn design(sample_rate_hz: f64, kind: FilterKind) -> Result<Self, SignalError> {
        if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        let name = kind.name();
        let sections = design_sections(sample_rate_hz, kind)?
            .into_iter()
            .map(|section| section.check(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { name, sections })
    }
    pub fn order(&self) -> usize {
        self.sections.len() * 2
    }
    /// Runs the window through every section in turn. Fails if anything
    /// non-finite comes out.
    pub fn apply(&self, signal: &[f64]) -> Result<Vec<f64>, SignalError> {
        let mut out = signal.to_vec();
        for section in &self.sections {
            out = section.run(&out);
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(SignalError::NonFiniteOutput(self.name));
        }
        Ok(out)
    }
}
fn design_sections(sample_rate_hz: f64, kind: FilterKind) -> Result<Vec<Section>, SignalError> {
    let nyquist = sample_rate_hz * 0.5;
    let omega = |freq_hz: f64| 2.0 * PI * freq_hz / sample_rate_hz;
    let inside = |freq_hz: f64| freq_hz.clamp(0.01, nyquist - 0.01);
    Ok(match kind {
        FilterKind::Notch { freq_hz, q } => vec![notch(omega(inside(freq_hz)), q)],
        FilterKind::Highpass { cutoff_hz, q } => vec![highpass(omega(inside(cutoff_hz)), q)],
        FilterKind::Lowpass { cutoff_hz, q } => vec![lowpass(omega(inside(cutoff_hz)), q)],
        FilterKind::Bandlimit { low_hz, high_hz } => {
            // Edges are kept within [0.01, 0.99] of Nyquist.
            let low = (low_hz / nyquist).max(0.01) * nyquist;
            let high = (high_hz / nyquist).min(0.99) * nyquist;
            if !(low < high) {
                return Err(SignalError::NonFiniteCoefficients("bandlimit"));
            }
            vec![
                highpass(omega(low), FRAC_1_SQRT_2),
                lowpass(omega(high), FRAC_1_SQRT_2),
            ]
        }
    })
}
fn lowpass(w0: f64, q: f64) -> Section {
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = sin_w0 / (2.0 * q);
    let edge = (1.0 - cos_w0) / 2.0;
    Section::from_raw([edge, 2.0 * edge, edge], [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha])
}
fn highpass(w0: f64, q: f64) -> Section {
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = sin_w0 / (2.0 * q);
    let edge = (1.0 + cos_w0) / 2.0;
    Section::from_raw([edge, -2.0 * edge, edge], [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha])
}
/// Zeros on the unit circle at `w0`, -3 dB width `w0 / q`.
fn notch(w0: f64, q: f64) -> Section {
    let beta = (w0 / q / 2.0).tan();
    let cos_w0 = w0.cos();
    Section::from_raw([1.0, -2.0 * cos_w0, 1.0], [1.0 + beta, -2.0 * cos_w0, 1.0 - beta])
}

/// Maps raw ADC codes to roughly [-1, 1] and applies the mains notch and the
/// band-limiting filter. Filtering is best effort: a failing stage passes its
/// input through unchanged.
#[derive(Clone, Debug)]
pub struct SignalConditioner {
    sample_rate_hz: f64,
    adc_midpoint: f64,
    config: FilterConfig,
}
impl SignalConditioner {
    pub fn new(sample_rate_hz: f64, adc_midpoint: f64, config: FilterConfig) -> Self {
        Self {
            sample_rate_hz,
            adc_midpoint,
            config,
        }
    }
    pub fn center(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .map(|&v| (v - self.adc_midpoint) / self.adc_midpoint)
            .collect()
    }
    pub fn condition(&self, raw: &[f64]) -> Vec<f64> {
        let centered = self.center(raw);
        if centered.len() > self.config.filter_above_len {
            self.apply_filters(&centered)
        } else {
            centered
        }
    }
    /// Notch then band-limit, each stage skipped on windows that are too short.
    pub fn apply_filters(&self, signal: &[f64]) -> Vec<f64> {
        let notched = self.notch(signal);
        self.bandlimit(&notched)
    }
    pub fn notch(&self, signal: &[f64]) -> Vec<f64> {
        self.run_stage(
            signal,
            FilterKind::Notch {
                freq_hz: self.config.notch_hz,
                q: self.config.notch_q,
            },
        )
    }
    pub fn bandlimit(&self, signal: &[f64]) -> Vec<f64> {
        self.run_stage(
            signal,
            FilterKind::Bandlimit {
                low_hz: self.config.band_low_hz,
                high_hz: self.config.band_high_hz,
            },
        )
    }
    fn run_stage(&self, signal: &[f64], kind: FilterKind) -> Vec<f64> {
        if signal.len() < self.config.min_filter_len {
            return signal.to_vec();
        }
        match FilterChain::design(self.sample_rate_hz, kind).and_then(|chain| chain.apply(signal)) {
            Ok(filtered) => filtered,
            Err(err) => {
                warn!("{} filter skipped: {err}", kind.name());
                signal.to_vec()
            }
        }
    }
}
