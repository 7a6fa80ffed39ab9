use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::features::MagnitudeSpectrum;
use super::window::WindowCache;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// Windowed FFT magnitudes up to the configured cutoff frequency.
///
/// Chunks of any non-empty length are accepted. Shorter chunks are zero-padded
/// to the FFT size; longer ones contribute only their first `fft_size` windowed
/// samples.
#[derive(Clone)]
pub struct SpectrumExtractor {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    retained_bins: usize,
    windows: WindowCache,
    buffer: Vec<Complex<f64>>,
}

impl SpectrumExtractor {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(config.fft_size);

        Ok(Self {
            fft,
            fft_size: config.fft_size,
            retained_bins: config.retained_bins(),
            windows: WindowCache::new(),
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
        })
    }

    pub fn retained_bins(&self) -> usize {
        self.retained_bins
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn extract(&mut self, chunk: &[f32]) -> Result<MagnitudeSpectrum> {
        if chunk.is_empty() {
            return Err(Error::EmptyChunk);
        }

        let window = self.windows.get(chunk.len());
        let used = chunk.len().min(self.fft_size);

        for (slot, (&s, &w)) in self.buffer.iter_mut().zip(chunk.iter().zip(window.iter())) {
            *slot = Complex::new(s as f64 * w, 0.0);
        }
        self.buffer[used..].fill(Complex::new(0.0, 0.0));

        self.fft.process(&mut self.buffer);

        Ok(self.buffer[..self.retained_bins]
            .iter()
            .map(|c| c.norm())
            .collect())
    }
}
