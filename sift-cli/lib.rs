use std::path::Path;

use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use sift_core::init_thread_pool;
use sift_scale::{ConfiguredDetector, Detection, DetectorBuilder, DetectorConfig, SiftError};
use thiserror::Error;
use tracing::debug;

pub use sift_core::{self, SiftConfig as Config};
pub use sift_scale::{self, Candidate, ExtremumKind, RefinedKeypoint};

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("SIFT error: {0}")]
    Sift(#[from] SiftError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Sizes the global rayon pool
pub fn init_threads(n_threads: usize) -> PipelineResult<()> {
    init_thread_pool(n_threads)?;
    Ok(())
}

const CANDIDATE_COLOR: Rgba<u8> = Rgba([255, 200, 0, 255]);
const KEYPOINT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// High-level SIFT detector: decode, detect, annotate
pub struct SiftPipeline {
    detector: ConfiguredDetector,
}

impl SiftPipeline {
    /// Create a pipeline from a detector configuration
    pub fn new(config: DetectorConfig) -> PipelineResult<Self> {
        let detector = DetectorBuilder::from_config(config).build()?;
        Ok(Self { detector })
    }

    /// Decode an image file
    pub fn load_image<P: AsRef<Path>>(path: P) -> PipelineResult<DynamicImage> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        debug!(width = img.width(), height = img.height(), "decoded image");
        Ok(img)
    }

    /// Run the detector on a decoded image
    pub fn detect(&self, img: &DynamicImage) -> PipelineResult<Detection> {
        Ok(self.detector.detect(img)?)
    }

    /// Decode and detect in one step
    pub fn detect_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> PipelineResult<(DynamicImage, Detection)> {
        let img = Self::load_image(path)?;
        let detection = self.detect(&img)?;
        Ok((img, detection))
    }

    /// Draws candidates as small yellow circles and refined keypoints as red
    /// circles whose radius follows the keypoint scale
    pub fn annotate(&self, img: &DynamicImage, detection: &Detection) -> RgbaImage {
        let mut output = img.to_rgba8();

        for c in &detection.candidates {
            let (x, y) = candidate_position(c, detection.image_doubled);
            let center = (x.round() as i32, y.round() as i32);
            draw_hollow_circle_mut(&mut output, center, 2, CANDIDATE_COLOR);
        }
        for kp in &detection.keypoints {
            let radius = (kp.scale * 2.0).round().max(3.0) as i32;
            let center = (kp.x.round() as i32, kp.y.round() as i32);
            draw_hollow_circle_mut(&mut output, center, radius, KEYPOINT_COLOR);
        }

        output
    }

    pub fn detector(&self) -> &ConfiguredDetector {
        &self.detector
    }

    /// Get detector configuration
    pub fn config(&self) -> &DetectorConfig {
        self.detector.config()
    }
}

/// Position of a candidate in input image coordinates
pub fn candidate_position(c: &Candidate, image_doubled: bool) -> (f64, f64) {
    let mut factor = 2f64.powi(c.octave as i32);
    if image_doubled {
        factor /= 2.0;
    }
    (c.col as f64 * factor, c.row as f64 * factor)
}

/// Serializable summary of a detection run
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub input_width: u32,
    pub input_height: u32,
    pub octaves: usize,
    pub image_doubled: bool,
    pub candidates: Vec<Candidate>,
    pub keypoints: Vec<RefinedKeypoint>,
    pub rejections: sift_scale::RejectionCounts,
}

#[cfg(feature = "serde")]
impl DetectionReport {
    pub fn new(img: &DynamicImage, detection: &Detection) -> Self {
        Self {
            input_width: img.width(),
            input_height: img.height(),
            octaves: detection.octave_count(),
            image_doubled: detection.image_doubled,
            candidates: detection.candidates.clone(),
            keypoints: detection.keypoints.clone(),
            rejections: detection.rejections,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
