use super::features::SpectrumFrame;

/// `band_count + 1` breakpoints splitting `[0, retained_bins)` into contiguous bands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandEdges {
    edges: Vec<usize>,
}

impl BandEdges {
    /// Linear partition rounded to the nearest bin (ties up).
    ///
    /// Monotone non-decreasing, `edges[0] == 0`, `edges[band_count] == retained_bins`.
    /// When there are fewer bins than bands some ranges are empty.
    ///
    /// # Panics
    ///
    /// If `band_count` is zero.
    pub fn linear(retained_bins: usize, band_count: usize) -> Self {
        assert!(band_count > 0, "band_count must be positive");
        let edges = (0..=band_count)
            .map(|i| (2 * i * retained_bins + band_count) / (2 * band_count))
            .collect();
        Self { edges }
    }

    pub fn band_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.edges
    }

    pub fn range(&self, band: usize) -> std::ops::Range<usize> {
        self.edges[band]..self.edges[band + 1]
    }
}

/// Averages contiguous bin ranges into a fixed number of bands.
#[derive(Clone, Debug)]
pub struct BandCompressor {
    edges: BandEdges,
}

impl BandCompressor {
    /// Panics if `band_count` is zero; see [`BandEdges::linear`].
    pub fn new(retained_bins: usize, band_count: usize) -> Self {
        Self {
            edges: BandEdges::linear(retained_bins, band_count),
        }
    }

    pub fn edges(&self) -> &BandEdges {
        &self.edges
    }

    pub fn compress(&self, spectrum: &[f64]) -> SpectrumFrame {
        (0..self.edges.band_count())
            .map(|band| {
                let bins = &spectrum[self.edges.range(band)];
                if bins.is_empty() {
                    0.0
                } else {
                    bins.iter().sum::<f64>() / bins.len() as f64
                }
            })
            .collect()
    }
}
