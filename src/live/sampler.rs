use crate::audio::features::SpectrumFrame;
use crate::config::AnalysisConfig;
use crate::export::FrameSequence;

/// Thins a chunk-rate frame stream down to a fixed playback-time cadence.
///
/// A frame is kept when at least `step` seconds of playback have passed since
/// the last kept frame. Nothing has been kept before the first offer, so the
/// first chunk (time zero in a live run) is always kept.
#[derive(Debug)]
pub struct FrameSampler {
    step_secs: f64,
    last_emitted: Option<f64>,
    sequence: FrameSequence,
}

impl FrameSampler {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            step_secs: config.step_secs(),
            last_emitted: None,
            sequence: FrameSequence::empty(config),
        }
    }

    pub fn is_due(&self, time: f64) -> bool {
        match self.last_emitted {
            Some(last) => time - last >= self.step_secs,
            None => true,
        }
    }

    /// Appends `frame` if due; returns whether it was kept.
    pub fn offer(&mut self, time: f64, frame: SpectrumFrame) -> bool {
        self.offer_with(time, || frame)
    }

    /// Like [`offer`](Self::offer), building the frame only when it is kept.
    pub fn offer_with(&mut self, time: f64, frame: impl FnOnce() -> SpectrumFrame) -> bool {
        if !self.is_due(time) {
            return false;
        }
        self.sequence.push(frame());
        self.last_emitted = Some(time);
        true
    }

    /// Playback time of the most recent kept frame.
    pub fn last_emitted(&self) -> Option<f64> {
        self.last_emitted
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn finish(self) -> FrameSequence {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chunk_at_time_zero_is_kept() {
        let mut sampler = FrameSampler::new(&AnalysisConfig::default());
        assert!(sampler.offer(0.0, vec![1.0]));
        assert!(!sampler.offer(0.1, vec![2.0]));
        assert_eq!(sampler.len(), 1);
    }

    #[test]
    fn stop_before_first_step_keeps_leading_frame() {
        let mut sampler = FrameSampler::new(&AnalysisConfig::default());
        assert_eq!(sampler.last_emitted(), None);
        assert!(sampler.is_due(0.0));

        sampler.offer(0.0, vec![1.0]);
        sampler.offer(0.05, vec![2.0]);
        sampler.offer(0.15, vec![3.0]);
        assert_eq!(sampler.last_emitted(), Some(0.0));
        assert!(!sampler.is_due(0.199));
        assert!(sampler.is_due(0.2));
        assert_eq!(sampler.finish().frames, vec![vec![1.0]]);
    }

    #[test]
    fn cadence_is_independent_of_chunk_rate() {
        let config = AnalysisConfig::default();
        let chunk_secs = 1024.0 / 44_100.0;
        let step = 0.2;
        let mut sampler = FrameSampler::new(&config);
        let mut emitted = Vec::new();

        for index in 0..2000 {
            let time = (index * 1024) as f64 / 44_100.0;
            if sampler.offer(time, vec![index as f64]) {
                emitted.push(time);
            }
        }

        assert_eq!(emitted[0], 0.0);
        for pair in emitted.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= step, "gap {} shorter than step", gap);
            assert!(gap < step + chunk_secs, "gap {} overshoots by a chunk", gap);
        }

        let sequence = sampler.finish();
        assert_eq!(sequence.frames.len(), emitted.len());
        // Frames stay in chunk order.
        assert!(sequence.frames.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn coarse_chunks_emit_every_time() {
        // Chunks longer than the step: every chunk is due.
        let config = AnalysisConfig { step_ms: 10, ..Default::default() };
        let mut sampler = FrameSampler::new(&config);
        for i in 0..10 {
            assert!(sampler.offer(i as f64 * 0.05, vec![0.0]));
        }
    }

    #[test]
    fn frame_is_built_only_when_kept() {
        let mut sampler = FrameSampler::new(&AnalysisConfig::default());
        let mut built = 0;
        for i in 0..10 {
            sampler.offer_with(i as f64 * 0.05, || {
                built += 1;
                vec![0.0]
            });
        }
        assert_eq!(built, sampler.len());
        assert_eq!(built, 3); // 0.0, 0.2, 0.4
    }

    #[test]
    fn sequence_carries_config_metadata() {
        let config = AnalysisConfig { band_count: 40, step_ms: 800, ..Default::default() };
        let sequence = FrameSampler::new(&config).finish();
        assert_eq!(sequence.bands, 40);
        assert_eq!(sequence.step_ms, 800);
        assert!(sequence.is_empty());
    }
}
