use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::history::RollingHistoryBuffer;
use super::sampler::FrameSampler;
use crate::audio::analysis::SpectrumPipeline;
use crate::audio::compress::CompressionMode;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::export::{FrameSequence, FrameSequenceWriter};

/// Cooperative cancellation shared between the producer and its owner.
///
/// Waiting on the signal is the producer's only suspension point, so a stop
/// request wakes it immediately instead of after the current pacing delay.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Blocks until `deadline` or a stop request; returns true if stopped.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// How the producer keeps step with playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Each chunk is released no earlier than its playback time.
    RealTime,
    /// Analyse as fast as possible (tests, offline previews).
    Unpaced,
}

#[derive(Clone, Debug)]
pub struct LiveOptions {
    pub pacing: Pacing,
    /// Compression applied to frames pushed into the history.
    pub display_mode: CompressionMode,
    /// Compression applied to frames kept by the sampler.
    pub export_mode: CompressionMode,
    /// Where the sampled sequence is written when the producer finishes.
    pub export_path: Option<PathBuf>,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            pacing: Pacing::RealTime,
            display_mode: CompressionMode::PeakNormalized,
            export_mode: CompressionMode::Absolute,
            export_path: None,
        }
    }
}

/// What the producer hands back once it stops.
#[derive(Debug)]
pub struct LiveOutcome {
    pub sequence: FrameSequence,
    pub chunks_processed: usize,
    /// True when the loop ended on a stop request rather than end of stream.
    pub stopped: bool,
    /// Result of writing `sequence` to the configured export path, if any.
    /// On failure the sequence is still here and can be written elsewhere.
    pub export: Option<Result<PathBuf>>,
}

/// A running live analysis: one producer thread, shared read-only views.
pub struct LiveSession {
    history: Arc<RollingHistoryBuffer>,
    stop: Arc<StopSignal>,
    position: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    total_samples: usize,
    sample_rate: u32,
    handle: JoinHandle<LiveOutcome>,
}

impl LiveSession {
    /// Validates the config and starts the producer over `samples`.
    pub fn start(samples: Arc<[f32]>, config: &AnalysisConfig, options: LiveOptions) -> Result<Self> {
        let pipeline = SpectrumPipeline::new(config)?;
        let history = Arc::new(RollingHistoryBuffer::new(config.history_depth, config.band_count));
        let stop = Arc::new(StopSignal::new());
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let total_samples = samples.len();

        let producer = Producer {
            samples,
            pipeline,
            history: Arc::clone(&history),
            stop: Arc::clone(&stop),
            position: Arc::clone(&position),
            finished: Arc::clone(&finished),
            options,
        };

        let handle = std::thread::Builder::new()
            .name("bandsync-live".into())
            .spawn(move || producer.run())
            .map_err(Error::Spawn)?;

        log::info!(
            "Live analysis started: {} samples, chunk={} ({:.1}ms)",
            total_samples,
            config.chunk_size,
            config.chunk_secs() * 1000.0
        );

        Ok(Self {
            history,
            stop,
            position,
            finished,
            total_samples,
            sample_rate: config.sample_rate,
            handle,
        })
    }

    pub fn history(&self) -> Arc<RollingHistoryBuffer> {
        Arc::clone(&self.history)
    }

    /// Rows oldest → newest; never blocks on the producer for longer than a copy.
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.history.snapshot()
    }

    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Samples consumed so far; advances monotonically.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.position() as f64 / self.sample_rate as f64
    }

    /// Playback fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_samples == 0 {
            return 1.0;
        }
        (self.position() as f64 / self.total_samples as f64).min(1.0)
    }

    /// True once the producer has returned, including by panicking.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire) || self.handle.is_finished()
    }

    pub fn join(self) -> Result<LiveOutcome> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}

struct Producer {
    samples: Arc<[f32]>,
    pipeline: SpectrumPipeline,
    history: Arc<RollingHistoryBuffer>,
    stop: Arc<StopSignal>,
    position: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    options: LiveOptions,
}

impl Producer {
    fn run(mut self) -> LiveOutcome {
        let config = self.pipeline.config().clone();
        let chunk_size = config.chunk_size;
        let sample_rate = config.sample_rate as f64;
        let mut sampler = FrameSampler::new(&config);
        let mut ptr = 0usize;
        let mut chunks = 0usize;
        let mut stopped = false;
        let started = Instant::now();

        while ptr + chunk_size <= self.samples.len() {
            if self.stop.is_stopped() {
                stopped = true;
                break;
            }

            let chunk = &self.samples[ptr..ptr + chunk_size];
            let spectrum = match self.pipeline.spectrum(chunk) {
                Ok(spectrum) => spectrum,
                Err(err) => {
                    log::warn!("Live analysis aborted at sample {}: {}", ptr, err);
                    break;
                }
            };

            let display = self.pipeline.frame_from_spectrum(&spectrum, self.options.display_mode);
            self.history.push(display);

            let time = ptr as f64 / sample_rate;
            let export_mode = self.options.export_mode;
            let pipeline = &self.pipeline;
            if sampler.offer_with(time, || pipeline.frame_from_spectrum(&spectrum, export_mode)) {
                log::debug!("Sampled frame {} at {:.3}s", sampler.len(), time);
            }

            ptr += chunk_size;
            chunks += 1;
            self.position.store(ptr, Ordering::Release);

            if self.options.pacing == Pacing::RealTime {
                let deadline = started + Duration::from_secs_f64(ptr as f64 / sample_rate);
                if self.stop.wait_until(deadline) {
                    stopped = true;
                    break;
                }
            }
        }

        if stopped {
            log::info!("Live analysis stopped at {:.2}s", ptr as f64 / sample_rate);
        } else {
            let tail = self.samples.len() - ptr;
            log::info!("Live analysis reached end of stream ({} tail samples unused)", tail);
        }

        let sequence = sampler.finish();
        let export = self.options.export_path.take().map(|path| {
            FrameSequenceWriter::write(&sequence, &path).map(|()| path)
        });
        if let Some(Err(ref err)) = export {
            log::warn!("Export failed: {}", err);
        }

        self.finished.store(true, Ordering::Release);

        LiveOutcome {
            sequence,
            chunks_processed: chunks,
            stopped,
            export,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::FrameSequenceReader;

    fn tone(len: usize) -> Arc<[f32]> {
        (0..len).map(|n| (n as f32 * 0.1).sin() * 0.5).collect::<Vec<_>>().into()
    }

    fn unpaced() -> LiveOptions {
        LiveOptions {
            pacing: Pacing::Unpaced,
            ..Default::default()
        }
    }

    #[test]
    fn runs_to_end_of_stream() {
        let config = AnalysisConfig { band_count: 40, fft_size: 512, ..Default::default() };
        // 10 full chunks and a short tail.
        let samples = tone(1024 * 10 + 300);
        let session = LiveSession::start(samples, &config, unpaced()).unwrap();
        let history = session.history();
        let outcome = session.join().unwrap();

        assert!(!outcome.stopped);
        assert_eq!(outcome.chunks_processed, 10);
        // Chunks at 0ms, ~23ms, ... ~209ms: kept at 0 and at the first chunk past 200ms.
        assert_eq!(outcome.sequence.frames.len(), 2);
        assert!(outcome.export.is_none());

        let rows = history.snapshot();
        assert_eq!(rows.len(), 100);
        assert!(rows[..90].iter().all(|r| r.iter().all(|&v| v == 0.0)));
        assert!(rows[90..].iter().all(|r| r.len() == 40 && r.iter().any(|&v| v > 0.0)));
    }

    #[test]
    fn display_rows_are_peak_normalized_and_export_is_absolute() {
        let config = AnalysisConfig::default();
        let samples: Arc<[f32]> = vec![0.9f32; 1024].into();
        let session = LiveSession::start(Arc::clone(&samples), &config, unpaced()).unwrap();
        let history = session.history();
        let outcome = session.join().unwrap();

        let mut pipeline = SpectrumPipeline::new(&config).unwrap();
        let absolute = pipeline.analyze_chunk(&samples, CompressionMode::Absolute).unwrap();
        let relative = pipeline.analyze_chunk(&samples, CompressionMode::PeakNormalized).unwrap();
        assert_eq!(outcome.sequence.frames, vec![absolute]);
        assert_eq!(history.latest(), Some(relative));
    }

    #[test]
    fn stop_request_ends_paced_loop_promptly() {
        let config = AnalysisConfig::default();
        // Ten seconds of audio, paced in real time.
        let samples = tone(441_000);
        let options = LiveOptions {
            pacing: Pacing::RealTime,
            ..Default::default()
        };
        let session = LiveSession::start(samples, &config, options).unwrap();
        std::thread::sleep(Duration::from_millis(120));

        let asked = Instant::now();
        session.request_stop();
        let outcome = session.join().unwrap();

        assert!(outcome.stopped);
        assert!(asked.elapsed() < Duration::from_millis(500));
        assert!(outcome.chunks_processed > 0);
        assert!(outcome.chunks_processed < 430);
        assert!(!outcome.sequence.frames.is_empty());
    }

    #[test]
    fn position_tracks_progress() {
        let config = AnalysisConfig::default();
        let samples = tone(1024 * 4);
        let session = LiveSession::start(samples, &config, unpaced()).unwrap();
        while !session.is_finished() {
            std::thread::yield_now();
        }
        assert_eq!(session.position(), 4096);
        assert_eq!(session.progress(), 1.0);
        session.join().unwrap();
    }

    #[test]
    fn buffer_shorter_than_a_chunk_is_end_of_stream() {
        let config = AnalysisConfig::default();
        let outcome = LiveSession::start(tone(500), &config, unpaced())
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(outcome.chunks_processed, 0);
        assert!(outcome.sequence.frames.is_empty());
        assert!(!outcome.stopped);
    }

    #[test]
    fn stopped_session_still_writes_export() {
        let dir = std::env::temp_dir().join(format!("bandsync-live-{}", std::process::id()));
        let path = dir.join("spectrum.json");
        let config = AnalysisConfig::default();
        let options = LiveOptions {
            pacing: Pacing::RealTime,
            export_path: Some(path.clone()),
            ..Default::default()
        };

        let session = LiveSession::start(tone(441_000), &config, options).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        session.request_stop();
        let outcome = session.join().unwrap();

        assert!(outcome.stopped);
        let written = match outcome.export {
            Some(Ok(ref written)) => written.clone(),
            other => panic!("unexpected export result: {:?}", other),
        };
        assert_eq!(written, path);
        // Stopped early, but the leading frame is still kept.
        assert!(!outcome.sequence.frames.is_empty());
        assert_eq!(FrameSequenceReader::read(&path).unwrap(), outcome.sequence);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn invalid_config_fails_before_spawning() {
        let config = AnalysisConfig { max_frequency: 40_000.0, ..Default::default() };
        assert!(matches!(
            LiveSession::start(tone(2048), &config, unpaced()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn panicked_producer_reads_as_finished() {
        let session = LiveSession {
            history: Arc::new(RollingHistoryBuffer::new(4, 2)),
            stop: Arc::new(StopSignal::new()),
            position: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
            total_samples: 1024,
            sample_rate: 44_100,
            handle: std::thread::spawn(|| -> LiveOutcome { panic!("analysis thread died") }),
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while !session.is_finished() {
            assert!(Instant::now() < deadline, "panicked producer never reported finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(session.join(), Err(Error::WorkerPanicked)));
    }

    #[test]
    fn stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            std::thread::spawn(move || signal.wait_until(Instant::now() + Duration::from_secs(30)))
        };
        std::thread::sleep(Duration::from_millis(20));
        signal.request_stop();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn stop_signal_times_out() {
        let signal = StopSignal::new();
        assert!(!signal.wait_until(Instant::now() + Duration::from_millis(5)));
    }
}
