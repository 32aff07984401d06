use rayon::prelude::*;
use sift_core::SiftConfig;
use thiserror::Error;
use tracing::{info, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dog::DogPyramid;
use crate::geometry::LocalGeometry;
use crate::types::{Candidate, RefinedKeypoint};

/// Why a candidate did not survive refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("Hessian is singular at the candidate")]
    Degenerate,
    #[error("offset did not settle within the interpolation step limit")]
    NotConverged,
    #[error("re-centred location left the detection region")]
    OutOfBounds,
    #[error("interpolated contrast below threshold")]
    LowContrast,
    #[error("principal curvature ratio indicates an edge")]
    EdgeResponse,
}

/// Parameters of the interpolation loop and the rejection tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineParams {
    pub intervals: usize,
    pub sigma: f64,
    pub contrast_threshold: f64,
    pub curvature_threshold: f64,
    pub border: usize,
    pub max_interp_steps: usize,
}

impl From<&SiftConfig> for RefineParams {
    fn from(cfg: &SiftConfig) -> Self {
        Self {
            intervals: cfg.intervals,
            sigma: cfg.sigma,
            contrast_threshold: cfg.contrast_threshold,
            curvature_threshold: cfg.curvature_threshold,
            border: cfg.border,
            max_interp_steps: cfg.max_interp_steps,
        }
    }
}

impl RefineParams {
    /// Minimum `|D(x)|` after interpolation, on the 0-255 sample range
    pub fn contrast_floor(&self) -> f64 {
        self.contrast_threshold / self.intervals as f64 * 256.0
    }
}

/// Per-reason counts of rejected candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RejectionCounts {
    pub degenerate: usize,
    pub not_converged: usize,
    pub out_of_bounds: usize,
    pub low_contrast: usize,
    pub edge_response: usize,
}

impl RejectionCounts {
    pub fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Degenerate => self.degenerate += 1,
            Rejection::NotConverged => self.not_converged += 1,
            Rejection::OutOfBounds => self.out_of_bounds += 1,
            Rejection::LowContrast => self.low_contrast += 1,
            Rejection::EdgeResponse => self.edge_response += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.degenerate
            + self.not_converged
            + self.out_of_bounds
            + self.low_contrast
            + self.edge_response
    }
}

/// Interpolates a candidate to subpixel accuracy and applies the contrast and
/// edge tests.
///
/// The candidate moves by the rounded offset while any component of the
/// offset reaches 0.5, for at most `max_interp_steps` moves.
pub fn refine_candidate(
    dog: &DogPyramid,
    candidate: &Candidate,
    params: &RefineParams,
) -> Result<RefinedKeypoint, Rejection> {
    let octave = candidate.octave;
    let (w, h) = dog.dimensions(octave);
    let b = params.border as i64;
    let s = params.intervals as i64;

    let (mut interval, mut row, mut col) = (candidate.interval, candidate.row, candidate.col);

    for _ in 0..params.max_interp_steps {
        let geom = LocalGeometry::at(dog, octave, interval, row, col)
            .map_err(|_| Rejection::OutOfBounds)?;
        let offset = geom.offset().ok_or(Rejection::Degenerate)?;

        if offset.iter().all(|v| v.abs() < 0.5) {
            let contrast = geom.interpolated_contrast(&offset);
            if contrast.abs() < params.contrast_floor() {
                return Err(Rejection::LowContrast);
            }
            if !geom.passes_edge_test(params.curvature_threshold) {
                return Err(Rejection::EdgeResponse);
            }

            let factor = 2f64.powi(octave as i32);
            let (dx, dy, ds) = (offset[0], offset[1], offset[2]);
            return Ok(RefinedKeypoint {
                octave,
                interval,
                row,
                col,
                offset: [dx, dy, ds],
                contrast,
                x: (col as f64 + dx) * factor,
                y: (row as f64 + dy) * factor,
                scale: params.sigma
                    * 2f64.powf(octave as f64 + (interval as f64 + ds) / params.intervals as f64),
            });
        }

        let next_col = col as i64 + offset[0].round() as i64;
        let next_row = row as i64 + offset[1].round() as i64;
        let next_interval = interval as i64 + offset[2].round() as i64;

        if next_interval < 1
            || next_interval > s
            || next_col < b
            || next_row < b
            || next_col >= w as i64 - b
            || next_row >= h as i64 - b
        {
            return Err(Rejection::OutOfBounds);
        }

        interval = next_interval as usize;
        row = next_row as usize;
        col = next_col as usize;
    }

    Err(Rejection::NotConverged)
}

/// Refines every candidate in parallel, keeping input order for the survivors
pub fn refine_all(
    dog: &DogPyramid,
    candidates: &[Candidate],
    params: &RefineParams,
) -> (Vec<RefinedKeypoint>, RejectionCounts) {
    let outcomes: Vec<Result<RefinedKeypoint, Rejection>> = candidates
        .par_iter()
        .map(|c| refine_candidate(dog, c, params))
        .collect();

    let mut keypoints = Vec::with_capacity(outcomes.len());
    let mut counts = RejectionCounts::default();
    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Ok(kp) => keypoints.push(kp),
            Err(reason) => {
                trace!(?candidate, %reason, "candidate rejected");
                counts.record(reason);
            }
        }
    }

    info!(
        candidates = candidates.len(),
        kept = keypoints.len(),
        low_contrast = counts.low_contrast,
        edge = counts.edge_response,
        unstable = counts.degenerate + counts.not_converged + counts.out_of_bounds,
        "refined candidates"
    );

    (keypoints, counts)
}
