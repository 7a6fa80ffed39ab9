use serde::{Deserialize, Serialize};

use super::features::SpectrumFrame;

/// Added to the chunk peak before normalizing so silence stays finite.
pub const PEAK_EPSILON: f64 = 1e-6;

/// How band energies are brought onto a log scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    /// `ln(1 + mean)`, comparable across chunks and files.
    #[default]
    Absolute,
    /// Spectrum divided by its own peak first; amplitude is relative per chunk.
    PeakNormalized,
}

impl CompressionMode {
    /// Applied to the magnitude spectrum before banding.
    pub fn prepare(self, spectrum: &mut [f64]) {
        if self == CompressionMode::PeakNormalized {
            let peak = spectrum.iter().copied().fold(0.0f64, f64::max);
            let scale = peak + PEAK_EPSILON;
            for m in spectrum.iter_mut() {
                *m /= scale;
            }
        }
    }

    /// Applied to the band values after banding.
    pub fn compress(self, frame: &mut SpectrumFrame) {
        for v in frame.iter_mut() {
            *v = v.ln_1p();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_leaves_spectrum_untouched() {
        let mut spectrum = vec![0.0, 2.0, 8.0];
        CompressionMode::Absolute.prepare(&mut spectrum);
        assert_eq!(spectrum, vec![0.0, 2.0, 8.0]);
    }

    #[test]
    fn peak_normalized_scales_below_one() {
        let mut spectrum = vec![0.0, 2.0, 8.0];
        CompressionMode::PeakNormalized.prepare(&mut spectrum);
        assert!(spectrum.iter().all(|&v| v < 1.0));
        assert!((spectrum[2] - 1.0).abs() < 1e-6);
        assert!((spectrum[1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn silence_stays_finite() {
        let mut spectrum = vec![0.0; 16];
        CompressionMode::PeakNormalized.prepare(&mut spectrum);
        assert!(spectrum.iter().all(|&v| v == 0.0));

        let mut frame = vec![0.0; 4];
        CompressionMode::PeakNormalized.compress(&mut frame);
        assert!(frame.iter().all(|&v| v.is_finite() && v == 0.0));
    }

    #[test]
    fn log_is_monotonic_and_non_negative() {
        let mut frame = vec![0.0, 0.5, 1.0, 100.0];
        CompressionMode::Absolute.compress(&mut frame);
        assert_eq!(frame[0], 0.0);
        assert!(frame.windows(2).all(|w| w[0] < w[1]));
        assert!((frame[2] - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
