use image::RgbaImage;
use thiserror::Error;

/// Samples stored per pixel (red, green, blue, alpha)
pub const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image buffer length mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("image dimensions differ: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
}

/// Four-channel image with signed, unclamped samples.
///
/// Difference-of-Gaussian levels hold negative values and values above 255,
/// so this is kept apart from displayable 8-bit images. The pixel at
/// `(row, col)` starts at `data[row * stride + col * 4]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleSpaceImage {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<i32>,
}

impl ScaleSpaceImage {
    /// Creates an image with every sample set to `value`
    pub fn new_fill(width: usize, height: usize, value: i32) -> Self {
        let stride = CHANNELS * width;
        Self {
            width,
            height,
            stride,
            data: vec![value; stride * height],
        }
    }

    /// Wraps an interleaved RGBA sample buffer
    pub fn from_vec(width: usize, height: usize, data: Vec<i32>) -> Result<Self, ImageError> {
        let stride = CHANNELS * width;
        let expected = stride * height;
        if data.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Builds a single-channel-valued image: every channel of a pixel carries
    /// the same sample. `values` is row-major, one entry per pixel.
    pub fn from_values(width: usize, height: usize, values: &[i32]) -> Result<Self, ImageError> {
        if values.len() != width * height {
            return Err(ImageError::SizeMismatch {
                expected: width * height,
                actual: values.len(),
            });
        }
        let data = values
            .iter()
            .flat_map(|&v| [v; CHANNELS])
            .collect();
        Self::from_vec(width, height, data)
    }

    /// Widens an 8-bit RGBA image
    pub fn from_rgba(img: &RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            stride: CHANNELS * w as usize,
            data: img.as_raw().iter().map(|&s| s as i32).collect(),
        }
    }

    /// Per-channel `self - other`, without clamping
    pub fn subtract(&self, other: &Self) -> Result<Self, ImageError> {
        self.check_same_dims(other.width, other.height)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        Ok(Self {
            width: self.width,
            height: self.height,
            stride: self.stride,
            data,
        })
    }

    fn check_same_dims(&self, width: usize, height: usize) -> Result<(), ImageError> {
        if self.width != width || self.height != height {
            return Err(ImageError::DimensionMismatch {
                left_width: self.width,
                left_height: self.height,
                right_width: width,
                right_height: height,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[i32] {
        &self.data
    }

    /// Index of the first sample of the pixel at `(row, col)`
    #[inline]
    pub fn pixel_offset(&self, row: usize, col: usize) -> usize {
        row * self.stride + col * CHANNELS
    }

    #[inline]
    pub fn sample(&self, row: usize, col: usize, channel: usize) -> i32 {
        self.data[self.pixel_offset(row, col) + channel]
    }

    /// Detection sample at `(row, col)`; channel 0 of a grayscale pyramid
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> i32 {
        self.data[self.pixel_offset(row, col)]
    }

    pub fn pixel(&self, row: usize, col: usize) -> [i32; CHANNELS] {
        let i = self.pixel_offset(row, col);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}
