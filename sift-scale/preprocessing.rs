use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::resample::{double, ResampleKernel};
use crate::smoothing::Smoother;

/// Preparation of the pyramid base image
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Converts to gray using Rec.601 luma weights, keeping alpha
    pub fn to_grayscale(src: &DynamicImage) -> RgbaImage {
        let rgba = src.to_rgba8();
        RgbaImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let grey = ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8;
            Rgba([grey, grey, grey, a])
        })
    }

    /// Extra blur needed so an input already blurred by `init_sigma` ends at `sigma`.
    ///
    /// Upscaling by two doubles the assumed input blur.
    pub fn initial_sigma_difference(sigma: f64, init_sigma: f64, doubled: bool) -> f64 {
        let assumed = if doubled { 2.0 * init_sigma } else { init_sigma };
        (sigma * sigma - assumed * assumed).max(0.0).sqrt()
    }

    /// Grayscale, optionally double (bicubic), then smooth to the base sigma
    pub fn create_initial_image(
        src: &DynamicImage,
        double_image: bool,
        sigma: f64,
        init_sigma: f64,
        smoother: &dyn Smoother,
        kernel_half_width: f64,
    ) -> RgbaImage {
        let mut grey = Self::to_grayscale(src);
        if double_image {
            grey = double(&grey, ResampleKernel::Bicubic);
        }
        let sig_diff = Self::initial_sigma_difference(sigma, init_sigma, double_image);
        debug!(
            width = grey.width(),
            height = grey.height(),
            sig_diff,
            "prepared initial image"
        );
        smoother.smooth(&grey, sig_diff, kernel_half_width)
    }
}
