use rayon::prelude::*;

use super::bands::BandCompressor;
use super::compress::CompressionMode;
use super::features::{MagnitudeSpectrum, SpectrumFrame};
use super::spectrum::SpectrumExtractor;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::export::FrameSequence;

/// Chunk → magnitude spectrum → bands → log scale.
///
/// Cloning is cheap: the FFT plan is shared, scratch buffers are not.
#[derive(Clone)]
pub struct SpectrumPipeline {
    config: AnalysisConfig,
    extractor: SpectrumExtractor,
    bands: BandCompressor,
}

impl SpectrumPipeline {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let extractor = SpectrumExtractor::new(config)?;
        let bands = BandCompressor::new(extractor.retained_bins(), config.band_count);

        log::debug!(
            "Pipeline: fft={} retained_bins={} bands={} edges={:?}",
            config.fft_size,
            extractor.retained_bins(),
            config.band_count,
            bands.edges().as_slice()
        );

        Ok(Self {
            config: config.clone(),
            extractor,
            bands,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn band_compressor(&self) -> &BandCompressor {
        &self.bands
    }

    pub fn spectrum(&mut self, chunk: &[f32]) -> Result<MagnitudeSpectrum> {
        self.extractor.extract(chunk)
    }

    /// Band and log-compress an already extracted spectrum.
    pub fn frame_from_spectrum(&self, spectrum: &[f64], mode: CompressionMode) -> SpectrumFrame {
        let mut frame = if mode == CompressionMode::Absolute {
            self.bands.compress(spectrum)
        } else {
            let mut scaled = spectrum.to_vec();
            mode.prepare(&mut scaled);
            self.bands.compress(&scaled)
        };
        mode.compress(&mut frame);
        frame
    }

    pub fn analyze_chunk(&mut self, chunk: &[f32], mode: CompressionMode) -> Result<SpectrumFrame> {
        let spectrum = self.spectrum(chunk)?;
        Ok(self.frame_from_spectrum(&spectrum, mode))
    }
}

/// Whole-buffer conversion at the export cadence.
///
/// Every full `step_samples` window yields one absolute-mode frame; a trailing
/// partial window is dropped. Windows are analysed in parallel and collected
/// in order.
pub fn convert(samples: &[f32], config: &AnalysisConfig) -> Result<FrameSequence> {
    let pipeline = SpectrumPipeline::new(config)?;
    let step = config.step_samples();
    let total_frames = samples.len() / step;

    log::info!(
        "Converting {} samples in {} windows of {} samples ({}ms)",
        samples.len(),
        total_frames,
        step,
        config.step_ms
    );

    let frames = samples
        .par_chunks_exact(step)
        .map_init(
            || pipeline.clone(),
            |pipeline, window| pipeline.analyze_chunk(window, CompressionMode::Absolute),
        )
        .collect::<Result<Vec<_>>>()?;

    let dropped = samples.len() % step;
    if dropped > 0 {
        log::debug!("Dropped {} trailing samples shorter than one step", dropped);
    }

    Ok(FrameSequence::new(config, frames))
}
