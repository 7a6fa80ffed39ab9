use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot analyse an empty chunk")]
    EmptyChunk,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed frame sequence: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent frame sequence: {0}")]
    InvalidSequence(String),

    #[error("failed to start live analysis thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("live analysis thread panicked")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Rejected [`AnalysisConfig`](crate::config::AnalysisConfig) values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("FFT size must be positive")]
    ZeroFftSize,

    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("band count must be positive")]
    ZeroBandCount,

    #[error("history depth must be positive")]
    ZeroHistoryDepth,

    #[error("step interval of {step_ms}ms is shorter than one sample at {sample_rate}Hz")]
    StepTooShort { step_ms: u32, sample_rate: u32 },

    #[error("max frequency {0}Hz must be a finite, non-negative number")]
    InvalidMaxFrequency(f64),

    #[error("max frequency {max_frequency}Hz exceeds the Nyquist frequency {nyquist}Hz")]
    AboveNyquist { max_frequency: f64, nyquist: f64 },
}
