use rayon::prelude::*;
use sift_core::ScaleSpaceImage;
use tracing::debug;

use crate::error::{SiftError, SiftResult};
use crate::pyramid::GaussianPyramid;

/// Difference-of-Gaussians scale space, `octaves x (S + 2)`.
///
/// `octave(o)[i]` holds `G[o][i + 1] - G[o][i]` as signed samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DogPyramid {
    octaves: Vec<Vec<ScaleSpaceImage>>,
}

impl DogPyramid {
    /// Subtracts adjacent intervals of every octave
    pub fn from_gaussian(gauss: &GaussianPyramid) -> SiftResult<Self> {
        let mut octaves = Vec::with_capacity(gauss.octave_count());

        for (o, octave) in gauss.octaves().iter().enumerate() {
            let widened: Vec<ScaleSpaceImage> = octave
                .levels()
                .par_iter()
                .map(ScaleSpaceImage::from_rgba)
                .collect();
            let dogs = widened
                .par_windows(2)
                .map(|pair| pair[1].subtract(&pair[0]))
                .collect::<Result<Vec<_>, _>>()?;

            debug!(octave = o, intervals = dogs.len(), "built DoG octave");
            octaves.push(dogs);
        }

        Self::from_octaves(octaves)
    }

    /// Assembles a pyramid from precomputed DoG images.
    ///
    /// Every octave needs the same number of intervals (at least 3, so one
    /// interior interval exists) and images of one octave must agree in size.
    pub fn from_octaves(octaves: Vec<Vec<ScaleSpaceImage>>) -> SiftResult<Self> {
        let first = octaves
            .first()
            .ok_or_else(|| SiftError::MalformedPyramid("no octaves".to_string()))?;
        let interval_count = first.len();
        if interval_count < 3 {
            return Err(SiftError::MalformedPyramid(format!(
                "{} DoG intervals per octave, need at least 3",
                interval_count
            )));
        }

        for (o, octave) in octaves.iter().enumerate() {
            if octave.len() != interval_count {
                return Err(SiftError::MalformedPyramid(format!(
                    "octave {} has {} intervals, expected {}",
                    o,
                    octave.len(),
                    interval_count
                )));
            }
            let (w, h) = (octave[0].width(), octave[0].height());
            if octave.iter().any(|img| img.width() != w || img.height() != h) {
                return Err(SiftError::MalformedPyramid(format!(
                    "octave {} mixes image sizes",
                    o
                )));
            }
        }

        Ok(Self { octaves })
    }

    pub fn octaves(&self) -> &[Vec<ScaleSpaceImage>] {
        &self.octaves
    }

    pub fn octave(&self, index: usize) -> &[ScaleSpaceImage] {
        &self.octaves[index]
    }

    pub fn image(&self, octave: usize, interval: usize) -> &ScaleSpaceImage {
        &self.octaves[octave][interval]
    }

    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }

    /// DoG images per octave (`S + 2`)
    pub fn interval_count(&self) -> usize {
        self.octaves[0].len()
    }

    /// Sampled intervals per octave (`S`)
    pub fn intervals(&self) -> usize {
        self.interval_count() - 2
    }

    /// `(width, height)` of the images of one octave
    pub fn dimensions(&self, octave: usize) -> (usize, usize) {
        let img = &self.octaves[octave][0];
        (img.width(), img.height())
    }

    /// Detection sample at `(row, col)` of one DoG image
    #[inline]
    pub fn value(&self, octave: usize, interval: usize, row: usize, col: usize) -> i32 {
        self.octaves[octave][interval].value(row, col)
    }
}
