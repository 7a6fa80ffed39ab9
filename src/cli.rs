use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use bandsync::{AnalysisConfig, CompressionMode};

#[derive(Parser, Debug)]
#[command(name = "bandsync", about = "Log-scaled spectrum frames for synced visuals and lighting")]
pub struct Cli {
    /// Config file (defaults to ./bandsync.toml or the per-user config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert audio files (or directories of them) to frame-sequence JSON
    Convert(ConvertArgs),
    /// Analyse one file in real time, as a player would, and export sampled frames
    Play(PlayArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Audio files or directories (MP3, FLAC, OGG, WAV, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory for <stem>.json files
    #[arg(short = 'd', long)]
    pub out_dir: Option<PathBuf>,

    /// Exact output file (single input only)
    #[arg(short, long, conflicts_with = "out_dir")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Audio file to analyse
    pub input: PathBuf,

    /// Where the sampled frame sequence is written
    #[arg(short, long, default_value = "spectrum.json")]
    pub export: PathBuf,

    /// Compression for exported frames
    #[arg(long, value_enum, default_value_t = ModeArg::Absolute)]
    pub export_mode: ModeArg,

    /// Request a stop after this many seconds of playback
    #[arg(long)]
    pub stop_after: Option<f64>,

    /// Do not pace analysis to playback time
    #[arg(long)]
    pub unpaced: bool,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Overrides for `[analysis]` values from the config file.
#[derive(Args, Debug, Default)]
pub struct AnalysisArgs {
    /// FFT size in samples
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Live analysis chunk size in samples
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of output bands
    #[arg(short, long)]
    pub bands: Option<usize>,

    /// Highest frequency kept (Hz)
    #[arg(long)]
    pub max_freq: Option<f64>,

    /// Export cadence in milliseconds
    #[arg(long)]
    pub step_ms: Option<u32>,

    /// Rows kept in the rolling history
    #[arg(long)]
    pub history: Option<usize>,
}

impl AnalysisArgs {
    pub fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(v) = self.fft_size { config.fft_size = v; }
        if let Some(v) = self.chunk_size { config.chunk_size = v; }
        if let Some(v) = self.bands { config.band_count = v; }
        if let Some(v) = self.max_freq { config.max_frequency = v; }
        if let Some(v) = self.step_ms { config.step_ms = v; }
        if let Some(v) = self.history { config.history_depth = v; }
        config
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Absolute,
    PeakNormalized,
}

impl From<ModeArg> for CompressionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Absolute => CompressionMode::Absolute,
            ModeArg::PeakNormalized => CompressionMode::PeakNormalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_given_fields() {
        let args = AnalysisArgs {
            bands: Some(40),
            step_ms: Some(800),
            ..Default::default()
        };
        let config = args.apply(AnalysisConfig::default());
        assert_eq!(config.band_count, 40);
        assert_eq!(config.step_ms, 800);
        assert_eq!(config.fft_size, 1024);
    }

    #[test]
    fn parses_convert_invocation() {
        let cli = Cli::parse_from(["bandsync", "convert", "a.mp3", "music/", "-d", "out", "--bands", "40"]);
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.out_dir, Some(PathBuf::from("out")));
                assert_eq!(args.analysis.bands, Some(40));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_play_invocation() {
        let cli = Cli::parse_from([
            "bandsync", "play", "song.mp3", "--stop-after", "2.5", "--export-mode", "peak-normalized",
        ]);
        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.stop_after, Some(2.5));
                assert_eq!(args.export_mode, ModeArg::PeakNormalized);
                assert_eq!(args.export, PathBuf::from("spectrum.json"));
                assert!(!args.unpaced);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
