use sift_core::SiftConfig;

use crate::config::DetectorConfig;
use crate::configured_detector::ConfiguredDetector;
use crate::error::SiftResult;
use crate::extrema::ExtremumDetector;
use crate::smoothing::GaussianSmoother;

/// Builder for creating a `ConfiguredDetector`
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: SiftConfig,
    octaves: Option<usize>,
    refine: bool,
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: SiftConfig::default(),
            octaves: None,
            refine: true,
        }
    }

    /// Set the number of sampled intervals per octave
    pub fn intervals(mut self, intervals: usize) -> Self {
        self.config.intervals = intervals;
        self
    }

    /// Set the base blur of every octave
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.config.sigma = sigma;
        self
    }

    /// Set the blur assumed to be present in the input image
    pub fn init_sigma(mut self, init_sigma: f64) -> Self {
        self.config.init_sigma = init_sigma;
        self
    }

    /// Enable or disable 2x upscaling of the input
    pub fn double_image(mut self, enable: bool) -> Self {
        self.config.double_image = enable;
        self
    }

    pub fn contrast_threshold(mut self, threshold: f64) -> Self {
        self.config.contrast_threshold = threshold;
        self
    }

    pub fn curvature_threshold(mut self, threshold: f64) -> Self {
        self.config.curvature_threshold = threshold;
        self
    }

    /// Set the margin in which no extrema are reported
    pub fn border(mut self, border: usize) -> Self {
        self.config.border = border;
        self
    }

    pub fn max_interp_steps(mut self, steps: usize) -> Self {
        self.config.max_interp_steps = steps;
        self
    }

    /// Gaussian kernels are truncated at `factor * sigma`
    pub fn kernel_half_width(mut self, factor: f64) -> Self {
        self.config.kernel_half_width = factor;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Fix the octave count instead of deriving it from the image size
    pub fn octaves(mut self, octaves: usize) -> Self {
        self.octaves = Some(octaves);
        self
    }

    /// Enable or disable subpixel refinement
    pub fn refine(mut self, enable: bool) -> Self {
        self.refine = enable;
        self
    }

    /// Apply fast preset
    pub fn preset_fast(self) -> Self {
        Self::from_config(DetectorConfig::fast_preset())
    }

    /// Apply dense preset
    pub fn preset_dense(self) -> Self {
        Self::from_config(DetectorConfig::dense_preset())
    }

    /// Apply the reference parameters
    pub fn preset_lowe(self) -> Self {
        Self::from_config(DetectorConfig::lowe_preset())
    }

    /// Build the configured detector with the default Gaussian smoother
    pub fn build(self) -> SiftResult<ConfiguredDetector> {
        let config = self.to_config();
        config.validate()?;
        let extremum = ExtremumDetector::new(
            config.core.contrast_threshold,
            config.core.curvature_threshold,
            config.core.border,
        )?;
        Ok(ConfiguredDetector::new(config, extremum, Box::new(GaussianSmoother)))
    }

    /// Generate summary of current configuration
    pub fn summary(&self) -> String {
        format!(
            "DetectorBuilder: intervals={}, sigma={:.2}, init_sigma={:.2}, octaves={:?}, threads={}, contr_thr={}, curv_thr={}, border={}, interp_steps={}, features=[Double:{}, Refine:{}]",
            self.config.intervals, self.config.sigma, self.config.init_sigma, self.octaves,
            self.config.n_threads, self.config.contrast_threshold, self.config.curvature_threshold,
            self.config.border, self.config.max_interp_steps,
            self.config.double_image, self.refine
        )
    }

    /// Create builder from existing configuration
    pub fn from_config(config: DetectorConfig) -> Self {
        Self {
            config: config.core,
            octaves: config.octaves,
            refine: config.refine,
        }
    }

    /// Convert to DetectorConfig
    pub fn to_config(self) -> DetectorConfig {
        DetectorConfig {
            core: self.config,
            octaves: self.octaves,
            refine: self.refine,
            name: None,
            description: None,
            version: None,
        }
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }
}
