use std::f64::consts::PI;

use log::warn;
use rustfft::{num_complex::Complex64, FftPlanner};

use crate::drivers::{Band, BandPowers, BAND_POWER_FLOOR};

/// One-sided power spectral density of a single window.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub psd: Vec<f64>,
}
impl PowerSpectrum {
    pub fn resolution_hz(&self) -> f64 {
        self.frequencies_hz.get(1).copied().unwrap_or(self.sample_rate_hz)
    }
    /// Sum of the PSD bins whose frequency lies in `[low, high]`.
    pub fn sum_between(&self, low_hz: f64, high_hz: f64) -> Option<f64> {
        let mut hit = false;
        let mut sum = 0.0;
        for (freq, power) in self.frequencies_hz.iter().zip(&self.psd) {
            if *freq >= low_hz && *freq <= high_hz {
                hit = true;
                sum += power;
            }
        }
        hit.then_some(sum)
    }
}

/// Hamming-windowed periodogram and per-band aggregation.
pub struct SpectralAnalyzer {
    sample_rate_hz: f64,
    min_len: usize,
}
impl SpectralAnalyzer {
    pub fn new(sample_rate_hz: f64, min_len: usize) -> Self {
        Self {
            sample_rate_hz,
            min_len,
        }
    }
    /// `None` when the window is too short or carries non-finite samples.
    pub fn spectrum(&self, signal: &[f64]) -> Option<PowerSpectrum> {
        let n = signal.len();
        if n < self.min_len.max(2) || signal.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mean = signal.iter().sum::<f64>() / n as f64;
        let window = hamming(n);
        let mut buffer: Vec<Complex64> = signal
            .iter()
            .zip(&window)
            .map(|(v, w)| Complex64::new((v - mean) * w, 0.0))
            .collect();
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let window_power = window.iter().map(|w| w * w).sum::<f64>() / n as f64;
        let scale = n as f64 * window_power;
        let bins = n / 2 + 1;
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * self.sample_rate_hz / n as f64)
            .collect();
        let psd = buffer
            .iter()
            .take(bins)
            .map(|c| c.norm_sqr() / scale)
            .collect();
        Some(PowerSpectrum {
            sample_rate_hz: self.sample_rate_hz,
            frequencies_hz,
            psd,
        })
    }
    /// Band powers of a conditioned window, each floored at 0.01.
    pub fn band_powers(&self, signal: &[f64]) -> BandPowers {
        let Some(spectrum) = self.spectrum(signal) else {
            if signal.len() >= self.min_len {
                warn!("spectrum unavailable for {} samples, using fallback bands", signal.len());
            }
            return BandPowers::short_window_fallback();
        };
        let power = |band: Band| {
            let (low, high) = band.range_hz();
            spectrum
                .sum_between(low, high)
                .map_or(BAND_POWER_FLOOR, |sum| sum.max(BAND_POWER_FLOOR))
        };
        BandPowers::new(
            power(Band::Delta),
            power(Band::Theta),
            power(Band::Alpha),
            power(Band::Beta),
            power(Band::Gamma),
        )
    }
}
fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    fn sine(freq_hz: f64, amplitude: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq_hz * n as f64 / 250.0).sin())
            .collect()
    }
    #[test]
    fn short_window_uses_fallback() {
        let analyzer = SpectralAnalyzer::new(250.0, 50);
        let bands = analyzer.band_powers(&sine(10.0, 1.0, 49));
        assert_eq!(bands, BandPowers::short_window_fallback());
    }
    #[test]
    fn full_buffer_has_half_hertz_bins() {
        let analyzer = SpectralAnalyzer::new(250.0, 50);
        let spectrum = analyzer.spectrum(&sine(10.0, 1.0, 500)).unwrap();
        assert_eq!(spectrum.psd.len(), 251);
        assert!((spectrum.resolution_hz() - 0.5).abs() < 1e-12);
        assert!((spectrum.frequencies_hz[250] - 125.0).abs() < 1e-9);
    }
    #[test]
    fn alpha_sine_dominates_alpha_band() {
        let analyzer = SpectralAnalyzer::new(250.0, 50);
        let bands = analyzer.band_powers(&sine(10.0, 0.5, 500));
        assert!(bands.alpha > bands.delta);
        assert!(bands.alpha > bands.theta);
        assert!(bands.alpha > bands.beta);
        assert!(bands.alpha > bands.gamma);
        assert!(bands.alpha > 10.0);
    }
    #[test]
    fn flat_signal_is_floored() {
        let analyzer = SpectralAnalyzer::new(250.0, 50);
        let bands = analyzer.band_powers(&vec![0.25; 200]);
        for band in Band::ALL {
            assert_eq!(bands.get(band), BAND_POWER_FLOOR);
        }
    }
    #[test]
    fn non_finite_window_uses_fallback() {
        let analyzer = SpectralAnalyzer::new(250.0, 50);
        let mut signal = sine(20.0, 1.0, 100);
        signal[7] = f64::NAN;
        assert_eq!(analyzer.band_powers(&signal), BandPowers::short_window_fallback());
    }
}
