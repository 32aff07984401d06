use sift_core::ImageError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SiftError {
    #[error("Invalid intervals per octave: {0} (must be >= 1)")]
    InvalidIntervals(usize),
    #[error("Invalid sigma: {0} (must be finite and > 0)")]
    InvalidSigma(f64),
    #[error("Invalid border: {0} (must be >= 1 to keep neighbour reads in bounds)")]
    InvalidBorder(usize),
    #[error("Invalid threshold: {name} = {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Invalid thread count: {0} (must be >= 1)")]
    InvalidThreadCount(usize),
    #[error("Invalid octave count: {0} (must be >= 1)")]
    InvalidOctaveCount(usize),
    #[error("Image {width}x{height} too small (minimum {min_size}x{min_size})")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_size: usize,
    },
    #[error("Requested {requested} octaves but the image supports at most {supported}")]
    TooManyOctaves { requested: usize, supported: usize },
    #[error("Malformed pyramid: {0}")]
    MalformedPyramid(String),
    #[error("Sample ({row}, {col}) at octave {octave}, interval {interval} is outside the valid region")]
    OutOfBounds {
        octave: usize,
        interval: usize,
        row: usize,
        col: usize,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type SiftResult<T> = Result<T, SiftError>;
