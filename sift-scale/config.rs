use sift_core::SiftConfig;

use crate::builder::DetectorBuilder;
use crate::error::{SiftError, SiftResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

/// Result of reading or writing a configuration file
#[cfg(feature = "serde")]
pub type ConfigFileResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Complete detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Core SIFT tunables
    pub core: SiftConfig,
    /// Fixed octave count; derived from the base image size when unset
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub octaves: Option<usize>,
    /// Run subpixel refinement and edge rejection on the candidates
    pub refine: bool,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorConfig {
    /// Create new configuration with default settings
    pub fn new() -> Self {
        Self {
            core: SiftConfig::default(),
            octaves: None,
            refine: true,
            name: None,
            description: None,
            version: None,
        }
    }

    /// Parameters of Lowe's paper, with refinement enabled
    pub fn lowe_preset() -> Self {
        Self::new().with_metadata(
            "Lowe",
            "Reference parameters: 3 intervals, sigma 1.6, doubled input",
        )
    }

    /// Fast preset: no upscaling, fewer intervals, candidates only
    pub fn fast_preset() -> Self {
        Self {
            core: SiftConfig {
                intervals: 2,
                double_image: false,
                contrast_threshold: 0.06,
                ..SiftConfig::default()
            },
            refine: false,
            ..Self::new()
        }
        .with_metadata("Fast", "Optimized for speed, skips upscaling and refinement")
    }

    /// Dense preset: finer scale sampling and a lower contrast gate
    pub fn dense_preset() -> Self {
        Self {
            core: SiftConfig {
                intervals: 4,
                contrast_threshold: 0.02,
                curvature_threshold: 12.0,
                max_interp_steps: 8,
                ..SiftConfig::default()
            },
            ..Self::new()
        }
        .with_metadata("Dense", "More keypoints at the cost of stability and speed")
    }

    /// Names the configuration and stamps the format version
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> DetectorBuilder {
        DetectorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        let octaves = match self.octaves {
            Some(o) => o.to_string(),
            None => "auto".to_string(),
        };
        format!(
            "DetectorConfig: intervals={}, sigma={:.2}, octaves={}, contr_thr={}, curv_thr={}, border={}, features=[Double:{}, Refine:{}]",
            self.core.intervals, self.core.sigma, octaves,
            self.core.contrast_threshold, self.core.curvature_threshold, self.core.border,
            self.core.double_image, self.refine
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> SiftResult<()> {
        let c = &self.core;
        if c.intervals < 1 {
            return Err(SiftError::InvalidIntervals(c.intervals));
        }
        if !(c.sigma.is_finite() && c.sigma > 0.0) {
            return Err(SiftError::InvalidSigma(c.sigma));
        }
        if !(c.init_sigma.is_finite() && c.init_sigma >= 0.0) {
            return Err(SiftError::InvalidSigma(c.init_sigma));
        }
        if !(c.contrast_threshold.is_finite() && c.contrast_threshold >= 0.0) {
            return Err(SiftError::InvalidThreshold {
                name: "contrast_threshold",
                value: c.contrast_threshold,
            });
        }
        if !(c.curvature_threshold.is_finite() && c.curvature_threshold > 0.0) {
            return Err(SiftError::InvalidThreshold {
                name: "curvature_threshold",
                value: c.curvature_threshold,
            });
        }
        if !(c.kernel_half_width.is_finite() && c.kernel_half_width > 0.0) {
            return Err(SiftError::InvalidThreshold {
                name: "kernel_half_width",
                value: c.kernel_half_width,
            });
        }
        if c.border < 1 {
            return Err(SiftError::InvalidBorder(c.border));
        }
        if c.n_threads < 1 {
            return Err(SiftError::InvalidThreadCount(c.n_threads));
        }
        if self.octaves == Some(0) {
            return Err(SiftError::InvalidOctaveCount(0));
        }
        Ok(())
    }

    /// Writes the configuration as pretty-printed JSON
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigFileResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads and validates a JSON configuration file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<Path>>(path: P) -> ConfigFileResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Writes the configuration as TOML
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigFileResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Reads and validates a TOML configuration file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<Path>>(path: P) -> ConfigFileResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigFileResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> ConfigFileResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for cfg in [
            DetectorConfig::new(),
            DetectorConfig::lowe_preset(),
            DetectorConfig::fast_preset(),
            DetectorConfig::dense_preset(),
        ] {
            assert!(cfg.validate().is_ok(), "{}", cfg.summary());
        }
    }

    #[test]
    fn test_lowe_preset_matches_defaults() {
        let lowe = DetectorConfig::lowe_preset();
        assert_eq!(lowe.core, SiftConfig::default());
        assert!(lowe.refine);
        assert_eq!(lowe.name.as_deref(), Some("Lowe"));
        assert_eq!(lowe.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_with_metadata() {
        let cfg = DetectorConfig::new().with_metadata("Indoor", "Low-texture scenes");
        assert_eq!(cfg.name.as_deref(), Some("Indoor"));
        assert_eq!(cfg.description.as_deref(), Some("Low-texture scenes"));
        assert_eq!(cfg.version.as_deref(), Some("1.0"));
        assert_eq!(cfg.core, DetectorConfig::new().core);

        let fast = DetectorConfig::fast_preset();
        assert_eq!(fast.name.as_deref(), Some("Fast"));
        assert!(!fast.refine);
        assert!(!fast.core.double_image);
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = DetectorConfig::new();
        cfg.core.intervals = 0;
        assert_eq!(cfg.validate(), Err(SiftError::InvalidIntervals(0)));

        let mut cfg = DetectorConfig::new();
        cfg.core.sigma = -1.0;
        assert!(matches!(cfg.validate(), Err(SiftError::InvalidSigma(_))));

        let mut cfg = DetectorConfig::new();
        cfg.core.border = 0;
        assert_eq!(cfg.validate(), Err(SiftError::InvalidBorder(0)));

        let mut cfg = DetectorConfig::new();
        cfg.core.curvature_threshold = f64::INFINITY;
        assert!(matches!(
            cfg.validate(),
            Err(SiftError::InvalidThreshold { name: "curvature_threshold", .. })
        ));

        let mut cfg = DetectorConfig::new();
        cfg.core.n_threads = 0;
        assert_eq!(cfg.validate(), Err(SiftError::InvalidThreadCount(0)));

        let mut cfg = DetectorConfig::new();
        cfg.octaves = Some(0);
        assert_eq!(cfg.validate(), Err(SiftError::InvalidOctaveCount(0)));
    }

    #[test]
    fn test_summary_mentions_settings() {
        let summary = DetectorConfig::fast_preset().summary();
        assert!(summary.contains("intervals=2"));
        assert!(summary.contains("octaves=auto"));
        assert!(summary.contains("Refine:false"));

        let fixed = DetectorConfig {
            octaves: Some(3),
            ..DetectorConfig::new()
        };
        assert!(fixed.summary().contains("octaves=3"));
    }

    #[test]
    fn test_builder_round_trip() {
        let cfg = DetectorConfig::dense_preset();
        let back = cfg.clone().to_builder().to_config();
        assert_eq!(back.core, cfg.core);
        assert_eq!(back.refine, cfg.refine);
        assert_eq!(back.octaves, cfg.octaves);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let cfg = DetectorConfig::dense_preset();
        let json = cfg.to_json().unwrap();
        assert_eq!(DetectorConfig::from_json(&json).unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_round_trip() {
        let cfg = DetectorConfig {
            octaves: Some(4),
            ..DetectorConfig::fast_preset()
        };
        let text = cfg.to_toml().unwrap();
        assert_eq!(DetectorConfig::from_toml(&text).unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_invalid_json_is_rejected() {
        let mut cfg = DetectorConfig::new();
        cfg.core.border = 0;
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(DetectorConfig::from_json(&json).is_err());
    }

    #[cfg(feature = "serde")]
    fn scratch_path(file: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sift_scale_{}_{}", std::process::id(), file))
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_file_round_trip() {
        let path = scratch_path("dense.json");
        let cfg = DetectorConfig::dense_preset();
        cfg.save_json(&path).unwrap();
        let loaded = DetectorConfig::load_json(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_file_round_trip() {
        let path = scratch_path("lowe.toml");
        let cfg = DetectorConfig {
            octaves: Some(5),
            ..DetectorConfig::lowe_preset()
        };
        cfg.save_toml(&path).unwrap();
        let loaded = DetectorConfig::load_toml(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_load_missing_file() {
        assert!(DetectorConfig::load_json(scratch_path("absent.json")).is_err());
        assert!(DetectorConfig::load_toml(scratch_path("absent.toml")).is_err());
    }
}
