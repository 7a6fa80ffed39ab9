mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bandsync::audio::decode::{decode_audio, is_audio_file};
use bandsync::config::{self, AnalysisConfig, Config};
use bandsync::{FrameSequenceWriter, LiveOptions, LiveSession, Pacing, PcmBuffer};
use cli::{Cli, Command, ConvertArgs, PlayArgs};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let file_config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Convert(args) => run_convert(args, file_config),
        Command::Play(args) => run_play(args, file_config),
    }
}

/// Adopt the decoded file's sample rate and re-check the config against it.
fn config_for(pcm: &PcmBuffer, config: &AnalysisConfig) -> Result<AnalysisConfig> {
    let mut resolved = config.clone();
    if pcm.sample_rate != config.sample_rate {
        log::warn!(
            "Using the file's sample rate {}Hz instead of the configured {}Hz",
            pcm.sample_rate,
            config.sample_rate
        );
        resolved = resolved.with_sample_rate(pcm.sample_rate);
    }
    resolved.validate().context("Invalid analysis configuration")?;
    Ok(resolved)
}

fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_audio_file(path))
                .collect();
            found.sort();
            if found.is_empty() {
                log::warn!("No audio files in {}", input.display());
            }
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            anyhow::bail!("Input file not found: {}", input.display());
        }
    }
    Ok(files)
}

fn output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frames".into());
    out_dir.join(format!("{}.json", stem))
}

fn run_convert(args: ConvertArgs, file_config: Config) -> Result<()> {
    let base = args.analysis.apply(file_config.analysis);
    base.validate().context("Invalid analysis configuration")?;

    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No audio files to convert");
    }
    if args.output.is_some() && files.len() > 1 {
        anyhow::bail!("--output takes a single input; use --out-dir for {} files", files.len());
    }
    let out_dir = args.out_dir.unwrap_or(file_config.export.out_dir);

    log::info!(
        "Converting {} file(s): bands={}, fft={}, max_freq={}Hz, step={}ms",
        files.len(),
        base.band_count,
        base.fft_size,
        base.max_frequency,
        base.step_ms
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut failures = 0usize;
    for input in &files {
        pb.set_message(input.display().to_string());
        let destination = args
            .output
            .clone()
            .unwrap_or_else(|| output_path(&out_dir, input));

        if let Err(err) = convert_file(input, &destination, &base) {
            failures += 1;
            pb.suspend(|| log::error!("{}: {:#}", input.display(), err));
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, files.len());
    }
    Ok(())
}

fn convert_file(input: &Path, destination: &Path, base: &AnalysisConfig) -> Result<()> {
    let pcm = decode_audio(input)?;
    let config = config_for(&pcm, base)?;
    let sequence = bandsync::convert(&pcm.samples, &config)?;
    FrameSequenceWriter::write(&sequence, destination)
        .with_context(|| format!("Failed to save frames for {}", input.display()))?;
    Ok(())
}

fn run_play(args: PlayArgs, file_config: Config) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let pcm = decode_audio(&args.input)?;
    let config = config_for(&pcm, &args.analysis.apply(file_config.analysis))?;
    let duration = pcm.duration();

    let options = LiveOptions {
        pacing: if args.unpaced { Pacing::Unpaced } else { Pacing::RealTime },
        export_mode: args.export_mode.into(),
        export_path: Some(args.export.clone()),
        ..Default::default()
    };

    let samples: Arc<[f32]> = pcm.samples.into();
    let session = LiveSession::start(samples, &config, options)?;

    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let band_width = config.max_frequency / config.band_count as f64;
    while !session.is_finished() {
        std::thread::sleep(POLL_INTERVAL);

        pb.set_position((session.progress() * 1000.0) as u64);
        if let Some(newest) = session.snapshot().last() {
            let (band, level) = loudest_band(newest);
            pb.set_message(format!(
                "{:.1}/{:.1}s  peak ~{:.0}Hz ({:.2})",
                session.elapsed_secs(),
                duration,
                (band as f64 + 0.5) * band_width,
                level
            ));
        }

        if let Some(limit) = args.stop_after {
            if session.elapsed_secs() >= limit {
                log::info!("Stop requested after {:.1}s", limit);
                session.request_stop();
            }
        }
    }
    pb.set_position(1000);
    pb.finish();

    let outcome = session.join()?;
    log::info!(
        "Processed {} chunks, sampled {} frames{}",
        outcome.chunks_processed,
        outcome.sequence.len(),
        if outcome.stopped { " (stopped)" } else { "" }
    );

    match outcome.export {
        Some(Ok(path)) => log::info!("Done! Output: {}", path.display()),
        Some(Err(err)) => {
            return Err(err).with_context(|| format!("Failed to export {}", args.export.display()))
        }
        None => {}
    }
    Ok(())
}

fn loudest_band(row: &[f64]) -> (usize, f64) {
    row.iter()
        .copied()
        .enumerate()
        .fold((0, 0.0), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}
