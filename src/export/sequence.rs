use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::audio::features::SpectrumFrame;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

pub const FORMAT_VERSION: u32 = 1;

/// Sampled frames plus the metadata needed to replay them in sync.
///
/// Field names follow the historical JSON layout; files written before the
/// `version` field existed read back as version 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameSequence {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(rename = "samplerate")]
    pub sample_rate: u32,
    pub bands: usize,
    pub step_ms: u32,
    #[serde(rename = "max_freq")]
    pub max_frequency: f64,
    pub frames: Vec<SpectrumFrame>,
}

fn legacy_version() -> u32 { FORMAT_VERSION }

impl FrameSequence {
    pub fn new(config: &AnalysisConfig, frames: Vec<SpectrumFrame>) -> Self {
        Self {
            version: FORMAT_VERSION,
            sample_rate: config.sample_rate,
            bands: config.band_count,
            step_ms: config.step_ms,
            max_frequency: config.max_frequency,
            frames,
        }
    }

    pub fn empty(config: &AnalysisConfig) -> Self {
        Self::new(config, Vec::new())
    }

    pub fn push(&mut self, frame: SpectrumFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Playback time covered by the frames.
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 * self.step_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.version > FORMAT_VERSION {
            return Err(Error::InvalidSequence(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        if let Some((index, frame)) = self
            .frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.len() != self.bands)
        {
            return Err(Error::InvalidSequence(format!(
                "frame {} has {} bands, expected {}",
                index,
                frame.len(),
                self.bands
            )));
        }
        Ok(())
    }
}

/// Writes sequences atomically: a sibling temp file is synced, then renamed.
pub struct FrameSequenceWriter;

impl FrameSequenceWriter {
    pub fn write(sequence: &FrameSequence, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let tmp = temp_path(path);
        if let Err(err) = write_synced(sequence, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::io(path, err));
        }

        log::info!(
            "Saved {} frames → {} (bands={}, step={}ms)",
            sequence.len(),
            path.display(),
            sequence.bands,
            sequence.step_ms
        );
        Ok(())
    }
}

fn write_synced(sequence: &FrameSequence, tmp: &Path) -> Result<()> {
    let file = File::create(tmp).map_err(|e| Error::io(tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, sequence).map_err(|e| {
        if e.is_io() {
            Error::io(tmp, e.into())
        } else {
            Error::Json(e)
        }
    })?;
    writer.flush().map_err(|e| Error::io(tmp, e))?;
    let file = writer.into_inner().map_err(|e| Error::io(tmp, e.into_error()))?;
    file.sync_all().map_err(|e| Error::io(tmp, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frames".into());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

pub struct FrameSequenceReader;

impl FrameSequenceReader {
    pub fn read(path: &Path) -> Result<FrameSequence> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let sequence: FrameSequence = serde_json::from_reader(BufReader::new(file))?;
        sequence.validate()?;
        log::debug!("Loaded {} frames from {}", sequence.len(), path.display());
        Ok(sequence)
    }
}
