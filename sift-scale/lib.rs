//! Scale-space construction and extremum detection for SIFT.
//!
//! The Gaussian pyramid holds `S + 3` blurred levels per octave, the DoG
//! pyramid the `S + 2` differences between them. Extrema are searched over
//! the `S` interior DoG intervals and optionally refined to subpixel accuracy.

pub mod builder;
pub mod config;
pub mod configured_detector;
pub mod dog;
pub mod error;
pub mod extrema;
pub mod geometry;
pub mod preprocessing;
pub mod pyramid;
pub mod refinement;
pub mod resample;
pub mod smoothing;
pub mod types;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use configured_detector::{ConfiguredDetector, Detection};
pub use dog::DogPyramid;
pub use error::{SiftError, SiftResult};
pub use extrema::{classify_extremum, passes_contrast_gate, prelim_threshold, ExtremumDetector};
pub use geometry::LocalGeometry;
pub use preprocessing::ImagePreprocessing;
pub use pyramid::{GaussianOctave, GaussianPyramid, SigmaSchedule, MIN_BASE_SIZE};
pub use refinement::{refine_all, refine_candidate, RefineParams, Rejection, RejectionCounts};
pub use resample::{double, halve, resample, ResampleKernel};
pub use smoothing::{GaussianSmoother, Smoother};
pub use types::{Candidate, ExtremumKind, RefinedKeypoint};
