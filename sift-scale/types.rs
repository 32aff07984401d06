#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a candidate beats or undercuts its 26 neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExtremumKind {
    Maximum,
    Minimum,
}

/// Scale-space extremum located on the discrete DoG grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    pub octave: usize,
    /// DoG interval within the octave, always in `1..=S`
    pub interval: usize,
    pub row: usize,
    pub col: usize,
    pub kind: ExtremumKind,
}

/// Candidate after subpixel interpolation and edge rejection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RefinedKeypoint {
    pub octave: usize,
    /// Interval, row and column after re-centering
    pub interval: usize,
    pub row: usize,
    pub col: usize,
    /// Subpixel offset along (x, y, scale), each component within 0.5
    pub offset: [f64; 3],
    /// Interpolated DoG response at the refined location
    pub contrast: f64,
    /// Location in base image coordinates
    pub x: f64,
    pub y: f64,
    /// Blur of the keypoint in base image coordinates
    pub scale: f64,
}

impl RefinedKeypoint {
    /// Maps coordinates and scale back to the input image when it was doubled
    pub fn to_input_coordinates(mut self, image_doubled: bool) -> Self {
        if image_doubled {
            self.x /= 2.0;
            self.y /= 2.0;
            self.scale /= 2.0;
        }
        self
    }
}
