mod scale_space_image;

pub use scale_space_image::{ImageError, ScaleSpaceImage, CHANNELS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of sampled intervals per octave
pub const SIFT_INTERVALS: usize = 3;
/// Assumed Gaussian blur of the input image
pub const SIFT_INIT_SIGMA: f64 = 0.5;
/// Blur of the base image of every octave
pub const SIFT_SIGMA: f64 = 1.6;
/// Double the image size before pyramid construction
pub const SIFT_IMG_DBL: bool = true;
/// Threshold on keypoint contrast |D(x)|
pub const SIFT_CONTR_THR: f64 = 0.04;
/// Threshold on the ratio of principal curvatures
pub const SIFT_CURV_THR: f64 = 10.0;
/// Width of the border in which keypoints are ignored
pub const SIFT_IMG_BORDER: usize = 5;
/// Maximum steps of keypoint interpolation before giving up
pub const SIFT_MAX_INTERP_STEPS: usize = 5;
/// Gaussian kernels are truncated at this many standard deviations
pub const SIFT_KERNEL_HALF_WIDTH: f64 = 3.0;

/// Tunables of the detection stage
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiftConfig {
    pub intervals: usize,
    pub sigma: f64,
    pub init_sigma: f64,
    pub double_image: bool,
    pub contrast_threshold: f64,
    pub curvature_threshold: f64,
    pub border: usize,
    pub max_interp_steps: usize,
    pub kernel_half_width: f64,
    pub n_threads: usize,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            intervals: SIFT_INTERVALS,
            sigma: SIFT_SIGMA,
            init_sigma: SIFT_INIT_SIGMA,
            double_image: SIFT_IMG_DBL,
            contrast_threshold: SIFT_CONTR_THR,
            curvature_threshold: SIFT_CURV_THR,
            border: SIFT_IMG_BORDER,
            max_interp_steps: SIFT_MAX_INTERP_STEPS,
            kernel_half_width: SIFT_KERNEL_HALF_WIDTH,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Number of octaves whose coarsest level keeps roughly four pixels on its short side.
///
/// Returns 0 when the image is too small to hold a single octave.
pub fn octave_count(width: usize, height: usize) -> usize {
    let min_dim = width.min(height);
    if min_dim == 0 {
        return 0;
    }
    (min_dim.ilog2() as usize).saturating_sub(2)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
