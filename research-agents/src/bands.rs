//! Ordered threshold bands.
//!
//! A band table maps a number to a label: bands are checked top to bottom,
//! the first band whose threshold the value strictly exceeds wins, and the
//! fallback label covers everything else (including NaN).

/// One `(value > threshold) -> label` rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band<L> {
    pub threshold: f64,
    pub label: L,
}

/// First-match-wins list of bands with a fallback label
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable<L> {
    bands: Vec<Band<L>>,
    fallback: L,
}

impl<L: Copy> BandTable<L> {
    pub fn new(bands: &[(f64, L)], fallback: L) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|&(threshold, label)| Band { threshold, label })
                .collect(),
            fallback,
        }
    }

    pub fn classify(&self, value: f64) -> L {
        self.bands
            .iter()
            .find(|band| value > band.threshold)
            .map(|band| band.label)
            .unwrap_or(self.fallback)
    }

    pub fn bands(&self) -> &[Band<L>] {
        &self.bands
    }

    pub fn fallback(&self) -> L {
        self.fallback
    }
}
