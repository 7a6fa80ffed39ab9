use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::audio::features::SpectrumFrame;

/// The `depth` most recent frames, oldest first.
///
/// One producer pushes while any number of readers take snapshots; both
/// operations hold the lock only long enough to move or copy rows, so a
/// reader never sees a half-written frame.
#[derive(Debug)]
pub struct RollingHistoryBuffer {
    depth: usize,
    rows: Mutex<VecDeque<SpectrumFrame>>,
}

impl RollingHistoryBuffer {
    /// Starts filled with `depth` all-zero frames of `band_count` values.
    pub fn new(depth: usize, band_count: usize) -> Self {
        let rows = (0..depth).map(|_| vec![0.0; band_count]).collect();
        Self {
            depth,
            rows: Mutex::new(rows),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push(&self, frame: SpectrumFrame) {
        let mut rows = self.rows.lock();
        if rows.len() == self.depth {
            rows.pop_front();
        }
        rows.push_back(frame);
    }

    pub fn snapshot(&self) -> Vec<SpectrumFrame> {
        self.rows.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<SpectrumFrame> {
        self.rows.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Back to `depth` all-zero frames.
    pub fn clear(&self, band_count: usize) {
        let mut rows = self.rows.lock();
        rows.clear();
        rows.extend((0..self.depth).map(|_| vec![0.0; band_count]));
    }
}
