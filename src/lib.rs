//! Log-scaled spectrum frames from mono PCM, for live display and fixed-cadence export.

pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod live;

pub use audio::analysis::{convert, SpectrumPipeline};
pub use audio::compress::CompressionMode;
pub use audio::features::{MagnitudeSpectrum, PcmBuffer, SpectrumFrame};
pub use config::AnalysisConfig;
pub use error::{ConfigError, Error, Result};
pub use export::{FrameSequence, FrameSequenceReader, FrameSequenceWriter};
pub use live::{LiveOptions, LiveOutcome, LiveSession, Pacing, RollingHistoryBuffer};
