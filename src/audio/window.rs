use std::collections::HashMap;
use std::sync::Arc;

/// Symmetric Hann window: `0.5 - 0.5 cos(2πn / (N - 1))`.
///
/// A single-sample window is `[1.0]`.
pub fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

/// Hann coefficients keyed by chunk length, built on first use.
#[derive(Clone, Debug, Default)]
pub struct WindowCache {
    windows: HashMap<usize, Arc<[f64]>>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, len: usize) -> Arc<[f64]> {
        self.windows
            .entry(len)
            .or_insert_with(|| hann_window(len).into())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
