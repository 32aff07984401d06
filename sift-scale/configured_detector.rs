use image::DynamicImage;
use sift_core::octave_count;
use tracing::info;

use crate::config::DetectorConfig;
use crate::dog::DogPyramid;
use crate::error::SiftResult;
use crate::extrema::ExtremumDetector;
use crate::preprocessing::ImagePreprocessing;
use crate::pyramid::GaussianPyramid;
use crate::refinement::{refine_all, RefineParams, RejectionCounts};
use crate::resample::ResampleKernel;
use crate::smoothing::Smoother;
use crate::types::{Candidate, RefinedKeypoint};

/// Result of one detection run
#[derive(Debug, Clone)]
pub struct Detection {
    /// Dimensions of the pyramid base, after optional doubling
    pub base_width: usize,
    pub base_height: usize,
    pub image_doubled: bool,
    pub dog: DogPyramid,
    pub candidates: Vec<Candidate>,
    /// Refined keypoints in input image coordinates; empty when refinement is off
    pub keypoints: Vec<RefinedKeypoint>,
    pub rejections: RejectionCounts,
}

impl Detection {
    pub fn octave_count(&self) -> usize {
        self.dog.octave_count()
    }
}

/// A scale-space detector built from a validated `DetectorConfig`.
///
/// Runs grayscale conversion, optional doubling, the Gaussian and DoG
/// pyramids, the extremum scan and optionally refinement.
pub struct ConfiguredDetector {
    config: DetectorConfig,
    extremum: ExtremumDetector,
    smoother: Box<dyn Smoother>,
}

impl ConfiguredDetector {
    pub(crate) fn new(
        config: DetectorConfig,
        extremum: ExtremumDetector,
        smoother: Box<dyn Smoother>,
    ) -> Self {
        Self {
            config,
            extremum,
            smoother,
        }
    }

    /// Replace the smoothing primitive
    pub fn with_smoother(mut self, smoother: impl Smoother + 'static) -> Self {
        self.smoother = Box::new(smoother);
        self
    }

    /// Octave count used for a `width x height` input
    pub fn octaves_for(&self, width: usize, height: usize) -> usize {
        let (w, h) = self.base_dimensions(width, height);
        self.config.octaves.unwrap_or_else(|| octave_count(w, h).max(1))
    }

    fn base_dimensions(&self, width: usize, height: usize) -> (usize, usize) {
        if self.config.core.double_image {
            (width * 2, height * 2)
        } else {
            (width, height)
        }
    }

    /// Gaussian and DoG pyramids of `img`.
    ///
    /// The octave count is checked against the base size before any
    /// smoothing happens.
    pub fn build_scale_space(
        &self,
        img: &DynamicImage,
    ) -> SiftResult<(GaussianPyramid, DogPyramid)> {
        let cfg = &self.config.core;
        let (w, h) = self.base_dimensions(img.width() as usize, img.height() as usize);
        let octaves = self.octaves_for(img.width() as usize, img.height() as usize);
        GaussianPyramid::validate_octaves(w, h, octaves)?;

        let base = ImagePreprocessing::create_initial_image(
            img,
            cfg.double_image,
            cfg.sigma,
            cfg.init_sigma,
            self.smoother.as_ref(),
            cfg.kernel_half_width,
        );
        let gauss = GaussianPyramid::build(
            base,
            octaves,
            cfg.intervals,
            cfg.sigma,
            cfg.kernel_half_width,
            self.smoother.as_ref(),
            ResampleKernel::Bilinear,
        )?;
        let dog = DogPyramid::from_gaussian(&gauss)?;
        Ok((gauss, dog))
    }

    /// Full detection run
    pub fn detect(&self, img: &DynamicImage) -> SiftResult<Detection> {
        let (_, dog) = self.build_scale_space(img)?;
        let candidates = self.extremum.detect(&dog);

        let (keypoints, rejections) = if self.config.refine {
            let params = RefineParams::from(&self.config.core);
            let (kps, counts) = refine_all(&dog, &candidates, &params);
            let doubled = self.config.core.double_image;
            let kps = kps
                .into_iter()
                .map(|kp| kp.to_input_coordinates(doubled))
                .collect();
            (kps, counts)
        } else {
            (Vec::new(), RejectionCounts::default())
        };

        let (base_width, base_height) = dog.dimensions(0);
        info!(
            width = img.width(),
            height = img.height(),
            octaves = dog.octave_count(),
            candidates = candidates.len(),
            keypoints = keypoints.len(),
            "detection finished"
        );

        Ok(Detection {
            base_width,
            base_height,
            image_doubled: self.config.core.double_image,
            dog,
            candidates,
            keypoints,
            rejections,
        })
    }

    /// Extremum candidates of an already built DoG pyramid
    pub fn detect_candidates(&self, dog: &DogPyramid) -> Vec<Candidate> {
        self.extremum.detect(dog)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn extremum_detector(&self) -> &ExtremumDetector {
        &self.extremum
    }

    /// Get configuration summary
    pub fn config_summary(&self) -> String {
        self.config.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DetectorBuilder;
    use crate::error::SiftError;
    use crate::pyramid::SigmaSchedule;
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    /// Pass-through smoother that logs `(width, height, sigma)` of every call
    #[derive(Clone, Default)]
    struct RecordingSmoother(Arc<Mutex<Vec<(u32, u32, f64)>>>);

    impl Smoother for RecordingSmoother {
        fn smooth(&self, image: &RgbaImage, sigma: f64, _half_width_factor: f64) -> RgbaImage {
            self.0
                .lock()
                .unwrap()
                .push((image.width(), image.height(), sigma));
            image.clone()
        }
    }

    /// Dark background with a few bright square blobs
    fn blobs(w: u32, h: u32) -> DynamicImage {
        let centres = [(w / 4, h / 4), (3 * w / 4, h / 3), (w / 2, 2 * h / 3)];
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            let inside = centres
                .iter()
                .any(|&(cx, cy)| x.abs_diff(cx) <= 3 && y.abs_diff(cy) <= 3);
            let v = if inside { 230 } else { 20 };
            Rgba([v, v, v, 255])
        }))
    }

    #[test]
    fn test_octaves_for() {
        let det = DetectorBuilder::new().build().unwrap();
        // doubled 64x48 -> 128x96, log2(96) = 6
        assert_eq!(det.octaves_for(64, 48), 4);

        let single = DetectorBuilder::new().double_image(false).build().unwrap();
        assert_eq!(single.octaves_for(64, 48), 3);

        let fixed = DetectorBuilder::new().octaves(2).build().unwrap();
        assert_eq!(fixed.octaves_for(64, 48), 2);
    }

    #[test]
    fn test_too_many_octaves_fails() {
        let det = DetectorBuilder::new()
            .double_image(false)
            .octaves(6)
            .build()
            .unwrap();
        let result = det.detect(&blobs(64, 64));
        assert_eq!(
            result.err(),
            Some(SiftError::TooManyOctaves {
                requested: 6,
                supported: 4
            })
        );
    }

    #[test]
    fn test_tiny_image_fails() {
        let det = DetectorBuilder::new().double_image(false).build().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::new(5, 5));
        assert!(matches!(det.detect(&img), Err(SiftError::ImageTooSmall { .. })));
    }

    #[test]
    fn test_flat_image_has_no_candidates() {
        let det = DetectorBuilder::new().build().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([90, 90, 90, 255])));
        let detection = det.detect(&img).unwrap();
        assert!(detection.candidates.is_empty());
        assert!(detection.keypoints.is_empty());
        assert_eq!((detection.base_width, detection.base_height), (80, 80));
        assert_eq!(detection.octave_count(), 4);
    }

    #[test]
    fn test_blobs_produce_candidates() {
        let det = DetectorBuilder::new().build().unwrap();
        let detection = det.detect(&blobs(64, 64)).unwrap();
        assert!(!detection.candidates.is_empty());

        let border = det.config().core.border;
        for c in &detection.candidates {
            let (w, h) = detection.dog.dimensions(c.octave);
            assert!(c.interval >= 1 && c.interval <= 3);
            assert!(c.row >= border && c.row < h - border);
            assert!(c.col >= border && c.col < w - border);
        }
        for kp in &detection.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 64.0);
            assert!(kp.y >= 0.0 && kp.y < 64.0);
            assert!(kp.scale > 0.0);
        }
        assert_eq!(
            detection.keypoints.len() + detection.rejections.total(),
            detection.candidates.len()
        );
    }

    #[test]
    fn test_refinement_disabled() {
        let det = DetectorBuilder::new().refine(false).build().unwrap();
        let detection = det.detect(&blobs(64, 64)).unwrap();
        assert!(detection.keypoints.is_empty());
        assert_eq!(detection.rejections.total(), 0);
    }

    #[test]
    fn test_candidates_are_ordered() {
        let det = DetectorBuilder::new().refine(false).build().unwrap();
        let detection = det.detect(&blobs(80, 64)).unwrap();
        let keys: Vec<_> = detection
            .candidates
            .iter()
            .map(|c| (c.octave, c.interval, c.row, c.col))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_replaced_smoother_sees_initial_blur_then_schedule() {
        let recorder = RecordingSmoother::default();
        let det = DetectorBuilder::new()
            .build()
            .unwrap()
            .with_smoother(recorder.clone());
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([90, 90, 90, 255])));
        let detection = det.detect(&img).unwrap();
        assert_eq!(detection.octave_count(), 4);

        let calls = recorder.0.lock().unwrap().clone();
        let schedule = SigmaSchedule::new(1.6, 3).unwrap();
        let sig_diff = ImagePreprocessing::initial_sigma_difference(1.6, 0.5, true);

        let mut expected = vec![(64, 64, sig_diff)];
        for o in 0..4u32 {
            let side = 64 >> o;
            for &sigma in &schedule.increments()[1..] {
                expected.push((side, side, sigma));
            }
        }
        assert_eq!(calls, expected);
    }

    #[test]
    fn test_detect_candidates_matches_full_run() {
        let det = DetectorBuilder::new().refine(false).build().unwrap();
        let img = blobs(64, 64);
        let (_, dog) = det.build_scale_space(&img).unwrap();
        let candidates = det.detect_candidates(&dog);
        assert!(!candidates.is_empty());
        assert_eq!(candidates, det.detect(&img).unwrap().candidates);
    }

    #[test]
    fn test_accessors_reflect_builder() {
        let det = DetectorBuilder::new()
            .border(7)
            .contrast_threshold(0.05)
            .intervals(4)
            .build()
            .unwrap();
        assert_eq!(det.extremum_detector().border(), 7);
        assert_eq!(det.extremum_detector().contrast_threshold(), 0.05);
        assert_eq!(det.config().core.intervals, 4);

        let summary = det.config_summary();
        assert!(summary.contains("intervals=4"));
        assert!(summary.contains("border=7"));
    }
}
