/// Band energies for one analysis step, one value per band.
pub type SpectrumFrame = Vec<f64>;

/// Magnitudes of the FFT bins at or below the cutoff frequency.
pub type MagnitudeSpectrum = Vec<f64>;

/// Decoded mono audio, samples in [-1, 1].
#[derive(Clone, Debug)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
