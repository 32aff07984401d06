use image::imageops::{self, FilterType};
use image::RgbaImage;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interpolation kernel for resizing, chosen explicitly by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResampleKernel {
    Bicubic,
    Bilinear,
    NearestNeighbor,
}

impl ResampleKernel {
    fn filter_type(self) -> FilterType {
        match self {
            ResampleKernel::Bicubic => FilterType::CatmullRom,
            ResampleKernel::Bilinear => FilterType::Triangle,
            ResampleKernel::NearestNeighbor => FilterType::Nearest,
        }
    }
}

/// Resizes `image` to `width x height` with the given kernel
pub fn resample(image: &RgbaImage, width: u32, height: u32, kernel: ResampleKernel) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, kernel.filter_type())
}

/// Halves both dimensions (rounding down); the octave-to-octave step.
///
/// `Bilinear` widens its tent when shrinking, so a single bright pixel lands
/// on a 2x2 block weighted `[1, 3, 3, 1] / 8` per axis.
pub fn halve(image: &RgbaImage, kernel: ResampleKernel) -> RgbaImage {
    resample(image, image.width() / 2, image.height() / 2, kernel)
}

/// Doubles both dimensions; used before the pyramid when upscaling is enabled
pub fn double(image: &RgbaImage, kernel: ResampleKernel) -> RgbaImage {
    resample(image, image.width() * 2, image.height() * 2, kernel)
}
