use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Parameters shared by every stage of the analysis pipeline.
///
/// Validated once when a pipeline is built; never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    /// Samples per live analysis chunk.
    pub chunk_size: usize,
    pub band_count: usize,
    /// Highest bin center frequency (Hz) kept in the magnitude spectrum.
    pub max_frequency: f64,
    /// Export cadence in milliseconds.
    pub step_ms: u32,
    /// Rows kept in the rolling history.
    pub history_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            fft_size: 1024,
            chunk_size: 1024,
            band_count: 80,
            max_frequency: 4000.0,
            step_ms: 200,
            history_depth: 100,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.fft_size == 0 {
            return Err(ConfigError::ZeroFftSize);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.band_count == 0 {
            return Err(ConfigError::ZeroBandCount);
        }
        if self.history_depth == 0 {
            return Err(ConfigError::ZeroHistoryDepth);
        }
        if self.step_samples() == 0 {
            return Err(ConfigError::StepTooShort {
                step_ms: self.step_ms,
                sample_rate: self.sample_rate,
            });
        }
        if !self.max_frequency.is_finite() || self.max_frequency < 0.0 {
            return Err(ConfigError::InvalidMaxFrequency(self.max_frequency));
        }
        let nyquist = self.nyquist();
        if self.max_frequency > nyquist {
            return Err(ConfigError::AboveNyquist {
                max_frequency: self.max_frequency,
                nyquist,
            });
        }
        Ok(())
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Samples covered by one export step (`sample_rate * step_ms / 1000`).
    pub fn step_samples(&self) -> usize {
        (self.sample_rate as u64 * self.step_ms as u64 / 1000) as usize
    }

    pub fn step_secs(&self) -> f64 {
        self.step_ms as f64 / 1000.0
    }

    pub fn chunk_secs(&self) -> f64 {
        self.chunk_size as f64 / self.sample_rate as f64
    }

    /// Number of FFT bins whose center frequency lies at or below `max_frequency`.
    pub fn retained_bins(&self) -> usize {
        let half = self.fft_size / 2;
        // k * rate / size <= max, cross-multiplied so exact bin frequencies compare exactly.
        let limit = self.max_frequency * self.fft_size as f64;
        let sample_rate = self.sample_rate as f64;
        (0..=half)
            .take_while(|&k| k as f64 * sample_rate <= limit)
            .count()
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

/// Contents of a `bandsync.toml` file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

fn default_out_dir() -> PathBuf { PathBuf::from("json") }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("Config parse error in {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `./bandsync.toml`, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("bandsync.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("bandsync").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandsync").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
