use image::RgbaImage;
use sift_core::octave_count;
use tracing::debug;

use crate::error::{SiftError, SiftResult};
use crate::resample::{halve, ResampleKernel};
use crate::smoothing::Smoother;

/// Smallest image side that still yields one octave
pub const MIN_BASE_SIZE: usize = 8;

/// Per-interval blur increments of one octave.
///
/// `increments[0]` is the base sigma; `increments[i]` (i >= 1) is the blur
/// applied to interval `i - 1` to produce interval `i`, so that the blur of
/// interval `i` relative to the octave base is `sigma * k^i` with
/// `k = 2^(1/S)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaSchedule {
    intervals: usize,
    k: f64,
    increments: Vec<f64>,
}

impl SigmaSchedule {
    pub fn new(sigma: f64, intervals: usize) -> SiftResult<Self> {
        if intervals < 1 {
            return Err(SiftError::InvalidIntervals(intervals));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(SiftError::InvalidSigma(sigma));
        }

        let k = 2f64.powf(1.0 / intervals as f64);
        let mut increments = vec![0.0; intervals + 3];
        increments[0] = sigma;
        increments[1] = sigma * (k * k - 1.0).sqrt();
        for i in 2..intervals + 3 {
            increments[i] = increments[i - 1] * k;
        }

        Ok(Self {
            intervals,
            k,
            increments,
        })
    }

    pub fn intervals(&self) -> usize {
        self.intervals
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Blur of interval 0 of every octave
    pub fn base_sigma(&self) -> f64 {
        self.increments[0]
    }

    pub fn increments(&self) -> &[f64] {
        &self.increments
    }

    /// Total blur of interval `i` relative to the octave base
    pub fn cumulative(&self, interval: usize) -> f64 {
        self.increments[..=interval]
            .iter()
            .map(|s| s * s)
            .sum::<f64>()
            .sqrt()
    }
}

/// Gaussian-blurred levels of one octave; all share the same dimensions
#[derive(Debug, Clone)]
pub struct GaussianOctave {
    levels: Vec<RgbaImage>,
}

impl GaussianOctave {
    pub fn levels(&self) -> &[RgbaImage] {
        &self.levels
    }

    pub fn level(&self, interval: usize) -> &RgbaImage {
        &self.levels[interval]
    }

    pub fn dimensions(&self) -> (usize, usize) {
        let (w, h) = self.levels[0].dimensions();
        (w as usize, h as usize)
    }
}

/// `octaves x (S + 3)` Gaussian scale space
#[derive(Debug, Clone)]
pub struct GaussianPyramid {
    octaves: Vec<GaussianOctave>,
    schedule: SigmaSchedule,
}

impl GaussianPyramid {
    /// Checks that `octaves` octaves can be built from a `width x height` base
    pub fn validate_octaves(width: usize, height: usize, octaves: usize) -> SiftResult<()> {
        if octaves < 1 {
            return Err(SiftError::InvalidOctaveCount(octaves));
        }
        let supported = octave_count(width, height);
        if supported == 0 {
            return Err(SiftError::ImageTooSmall {
                width,
                height,
                min_size: MIN_BASE_SIZE,
            });
        }
        if octaves > supported {
            return Err(SiftError::TooManyOctaves {
                requested: octaves,
                supported,
            });
        }
        Ok(())
    }

    /// Builds the pyramid from an already smoothed base image.
    ///
    /// Octave `o > 0` starts from interval `S` of octave `o - 1`, halved with
    /// `halving_kernel` and not blurred again.
    pub fn build(
        base: RgbaImage,
        octaves: usize,
        intervals: usize,
        sigma: f64,
        kernel_half_width: f64,
        smoother: &dyn Smoother,
        halving_kernel: ResampleKernel,
    ) -> SiftResult<Self> {
        let schedule = SigmaSchedule::new(sigma, intervals)?;
        let (w, h) = base.dimensions();
        Self::validate_octaves(w as usize, h as usize, octaves)?;

        let mut built: Vec<GaussianOctave> = Vec::with_capacity(octaves);
        let mut octave_base = Some(base);

        for o in 0..octaves {
            let first = match octave_base.take() {
                Some(img) => img,
                None => halve(built[o - 1].level(intervals), halving_kernel),
            };

            let mut levels = Vec::with_capacity(intervals + 3);
            levels.push(first);
            for i in 1..intervals + 3 {
                let sigma = schedule.increments[i];
                levels.push(smoother.smooth(&levels[i - 1], sigma, kernel_half_width));
            }

            debug!(
                octave = o,
                width = levels[0].width(),
                height = levels[0].height(),
                "built gaussian octave"
            );
            built.push(GaussianOctave { levels });
        }

        Ok(Self {
            octaves: built,
            schedule,
        })
    }

    pub fn octaves(&self) -> &[GaussianOctave] {
        &self.octaves
    }

    pub fn octave(&self, index: usize) -> &GaussianOctave {
        &self.octaves[index]
    }

    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }

    pub fn intervals(&self) -> usize {
        self.schedule.intervals()
    }

    pub fn schedule(&self) -> &SigmaSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::GaussianSmoother;
    use image::Rgba;
    use proptest::prelude::*;

    fn textured(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let v = ((x * 7 + y * 13) % 64 + (x / 8 + y / 8) % 2 * 128) as u8;
            Rgba([v, v, v, 255])
        })
    }

    /// Records the dimensions of every image it is asked to smooth
    struct RecordingSmoother(std::sync::Mutex<Vec<(u32, u32, f64)>>);

    impl Smoother for RecordingSmoother {
        fn smooth(&self, image: &RgbaImage, sigma: f64, _half_width_factor: f64) -> RgbaImage {
            self.0
                .lock()
                .unwrap()
                .push((image.width(), image.height(), sigma));
            image.clone()
        }
    }

    #[test]
    fn test_schedule_default_values() {
        let schedule = SigmaSchedule::new(1.6, 3).unwrap();
        let k = 2f64.powf(1.0 / 3.0);
        assert_eq!(schedule.increments().len(), 6);
        assert_eq!(schedule.increments()[0], 1.6);
        assert_eq!(schedule.base_sigma(), 1.6);
        assert!((schedule.increments()[1] - 1.6 * (k * k - 1.0).sqrt()).abs() < 1e-12);
        assert!((schedule.increments()[2] - schedule.increments()[1] * k).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_rejects_bad_input() {
        assert_eq!(SigmaSchedule::new(1.6, 0), Err(SiftError::InvalidIntervals(0)));
        assert!(matches!(SigmaSchedule::new(0.0, 3), Err(SiftError::InvalidSigma(_))));
        assert!(matches!(SigmaSchedule::new(f64::NAN, 3), Err(SiftError::InvalidSigma(_))));
    }

    proptest! {
        #[test]
        fn prop_schedule_increments_grow_and_accumulate(intervals in 1usize..8, sigma in 0.5f64..4.0) {
            let schedule = SigmaSchedule::new(sigma, intervals).unwrap();
            let inc = schedule.increments();
            for i in 2..inc.len() {
                prop_assert!(inc[i] > inc[i - 1]);
            }
            for i in 0..inc.len() {
                let expected = sigma * schedule.k().powi(i as i32);
                prop_assert!((schedule.cumulative(i) - expected).abs() < 1e-9 * expected.max(1.0));
            }
        }
    }

    #[test]
    fn test_validate_octaves() {
        assert!(GaussianPyramid::validate_octaves(64, 64, 4).is_ok());
        assert_eq!(
            GaussianPyramid::validate_octaves(64, 64, 5),
            Err(SiftError::TooManyOctaves {
                requested: 5,
                supported: 4
            })
        );
        assert!(matches!(
            GaussianPyramid::validate_octaves(6, 64, 1),
            Err(SiftError::ImageTooSmall { .. })
        ));
        assert_eq!(
            GaussianPyramid::validate_octaves(64, 64, 0),
            Err(SiftError::InvalidOctaveCount(0))
        );
    }

    #[test]
    fn test_build_fails_before_smoothing() {
        let smoother = RecordingSmoother(Default::default());
        let result = GaussianPyramid::build(
            textured(32, 32),
            4,
            3,
            1.6,
            3.0,
            &smoother,
            ResampleKernel::Bilinear,
        );
        assert!(matches!(result, Err(SiftError::TooManyOctaves { .. })));
        assert!(smoother.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_pyramid_shape_and_octave_dimensions() {
        let pyramid = GaussianPyramid::build(
            textured(67, 45),
            3,
            3,
            1.6,
            3.0,
            &GaussianSmoother,
            ResampleKernel::Bilinear,
        )
        .unwrap();

        assert_eq!(pyramid.octave_count(), 3);
        let mut expected = (67usize, 45usize);
        for octave in pyramid.octaves() {
            assert_eq!(octave.levels().len(), 6);
            for level in octave.levels() {
                assert_eq!(
                    (level.width() as usize, level.height() as usize),
                    expected
                );
            }
            expected = (expected.0 / 2, expected.1 / 2);
        }
    }

    #[test]
    fn test_base_level_is_unchanged() {
        let base = textured(40, 40);
        let pyramid = GaussianPyramid::build(
            base.clone(),
            2,
            3,
            1.6,
            3.0,
            &GaussianSmoother,
            ResampleKernel::Bilinear,
        )
        .unwrap();
        assert_eq!(pyramid.octave(0).level(0), &base);
    }

    #[test]
    fn test_next_octave_halves_interval_s() {
        let pyramid = GaussianPyramid::build(
            textured(64, 48),
            3,
            3,
            1.6,
            3.0,
            &GaussianSmoother,
            ResampleKernel::Bilinear,
        )
        .unwrap();

        for o in 1..pyramid.octave_count() {
            let source = pyramid.octave(o - 1).level(3);
            let expected = halve(source, ResampleKernel::Bilinear);
            assert_eq!(pyramid.octave(o).level(0), &expected);
        }
    }

    #[test]
    fn test_smoother_receives_schedule_increments() {
        let smoother = RecordingSmoother(Default::default());
        GaussianPyramid::build(
            textured(32, 32),
            2,
            2,
            1.6,
            3.0,
            &smoother,
            ResampleKernel::Bilinear,
        )
        .unwrap();

        let calls = smoother.0.lock().unwrap();
        let schedule = SigmaSchedule::new(1.6, 2).unwrap();
        // (S + 2) smoothing calls per octave
        assert_eq!(calls.len(), 8);
        for (n, &(w, _, sigma)) in calls.iter().enumerate() {
            let interval = n % 4 + 1;
            assert_eq!(sigma, schedule.increments()[interval]);
            assert_eq!(w, if n < 4 { 32 } else { 16 });
        }
    }
}
