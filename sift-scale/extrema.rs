use rayon::prelude::*;
use tracing::debug;

use crate::dog::DogPyramid;
use crate::error::{SiftError, SiftResult};
use crate::types::{Candidate, ExtremumKind};

/// Coarse contrast gate `0.5 * contr_thr / S`, scaled to the 0-255 sample range
pub fn prelim_threshold(contrast_threshold: f64, intervals: usize) -> f64 {
    0.5 * contrast_threshold / intervals as f64 * 256.0
}

/// A sample proceeds to the neighbour scan only when strictly above the gate
#[inline]
pub fn passes_contrast_gate(value: f64, prelim: f64) -> bool {
    value.abs() > prelim
}

/// Compares a DoG sample with its 26 neighbours across `interval - 1..=interval + 1`.
///
/// Positive samples must be strictly greater than every neighbour, others
/// strictly smaller. Positions without a full 3x3x3 neighbourhood inside the
/// octave are never extrema.
pub fn classify_extremum(
    dog: &DogPyramid,
    octave: usize,
    interval: usize,
    row: usize,
    col: usize,
) -> Option<ExtremumKind> {
    if octave >= dog.octave_count() {
        return None;
    }
    let images = dog.octave(octave);
    let (w, h) = dog.dimensions(octave);
    let interior = interval >= 1 && interval + 1 < images.len();
    if !interior || row == 0 || row + 1 >= h || col == 0 || col + 1 >= w {
        return None;
    }
    let val = images[interval].value(row, col);
    let is_max = val > 0;

    for (s, img) in images[interval - 1..=interval + 1].iter().enumerate() {
        for r in row - 1..=row + 1 {
            for c in col - 1..=col + 1 {
                if s == 1 && r == row && c == col {
                    continue;
                }
                let neighbour = img.value(r, c);
                let strict = if is_max { val > neighbour } else { val < neighbour };
                if !strict {
                    return None;
                }
            }
        }
    }

    Some(if is_max {
        ExtremumKind::Maximum
    } else {
        ExtremumKind::Minimum
    })
}

/// Scans a DoG pyramid for scale-space extrema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremumDetector {
    contrast_threshold: f64,
    curvature_threshold: f64,
    border: usize,
}

impl ExtremumDetector {
    pub fn new(
        contrast_threshold: f64,
        curvature_threshold: f64,
        border: usize,
    ) -> SiftResult<Self> {
        if !(contrast_threshold.is_finite() && contrast_threshold >= 0.0) {
            return Err(SiftError::InvalidThreshold {
                name: "contrast_threshold",
                value: contrast_threshold,
            });
        }
        if !(curvature_threshold.is_finite() && curvature_threshold > 0.0) {
            return Err(SiftError::InvalidThreshold {
                name: "curvature_threshold",
                value: curvature_threshold,
            });
        }
        // neighbour reads reach one pixel past the scanned region
        if border < 1 {
            return Err(SiftError::InvalidBorder(border));
        }
        Ok(Self {
            contrast_threshold,
            curvature_threshold,
            border,
        })
    }

    pub fn contrast_threshold(&self) -> f64 {
        self.contrast_threshold
    }

    /// Carried for the edge test of the refinement stage
    pub fn curvature_threshold(&self) -> f64 {
        self.curvature_threshold
    }

    pub fn border(&self) -> usize {
        self.border
    }

    /// All candidates, ordered by octave, interval, row and column
    pub fn detect(&self, dog: &DogPyramid) -> Vec<Candidate> {
        let intervals = dog.intervals();
        let prelim = prelim_threshold(self.contrast_threshold, intervals);
        let mut candidates = Vec::new();

        for o in 0..dog.octave_count() {
            for i in 1..=intervals {
                let found = self.detect_in_interval(dog, o, i, prelim);
                debug!(octave = o, interval = i, count = found.len(), "scanned DoG interval");
                candidates.extend(found);
            }
        }

        candidates
    }

    /// Candidates of one interior DoG interval; rows are scanned in parallel
    pub fn detect_in_interval(
        &self,
        dog: &DogPyramid,
        octave: usize,
        interval: usize,
        prelim: f64,
    ) -> Vec<Candidate> {
        let (w, h) = dog.dimensions(octave);
        let b = self.border;
        let img = dog.image(octave, interval);

        let rows = b..h.saturating_sub(b);
        rows.into_par_iter()
            .flat_map_iter(|r| {
                let mut v = Vec::new();
                for c in b..w.saturating_sub(b) {
                    if !passes_contrast_gate(img.value(r, c) as f64, prelim) {
                        continue;
                    }
                    if let Some(kind) = classify_extremum(dog, octave, interval, r, c) {
                        v.push(Candidate {
                            octave,
                            interval,
                            row: r,
                            col: c,
                            kind,
                        });
                    }
                }
                v
            })
            .collect()
    }
}
