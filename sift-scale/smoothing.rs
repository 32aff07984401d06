use image::RgbaImage;
use imageproc::filter::separable_filter_equal;

/// Gaussian smoothing primitive the pyramid builder calls.
///
/// Implementations blur `image` with standard deviation `sigma`, truncating
/// the kernel at `half_width_factor * sigma` pixels on each side.
pub trait Smoother: Send + Sync {
    fn smooth(&self, image: &RgbaImage, sigma: f64, half_width_factor: f64) -> RgbaImage;
}

/// Separable Gaussian blur backed by `imageproc`
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianSmoother;

impl GaussianSmoother {
    /// Normalised 1-D kernel of radius `ceil(half_width_factor * sigma)`
    pub fn kernel(sigma: f64, half_width_factor: f64) -> Vec<f32> {
        let radius = (half_width_factor * sigma).ceil().max(1.0) as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;

        let weights: Vec<f64> = (-radius..=radius)
            .map(|d| (-((d * d) as f64) / two_sigma_sq).exp())
            .collect();
        let sum: f64 = weights.iter().sum();

        weights.iter().map(|w| (w / sum) as f32).collect()
    }
}

impl Smoother for GaussianSmoother {
    fn smooth(&self, image: &RgbaImage, sigma: f64, half_width_factor: f64) -> RgbaImage {
        if !(sigma > 0.0) || image.width() == 0 || image.height() == 0 {
            return image.clone();
        }
        let kernel = Self::kernel(sigma, half_width_factor);
        separable_filter_equal(image, &kernel)
    }
}
