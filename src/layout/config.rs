//! Configuration for the layout resolution engine

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration options for layout resolution
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Decimal digits kept in emitted weights, biases and percentages
    pub float_precision: u32,

    /// Distance under which two edges count as aligned
    pub edge_tolerance: f64,

    /// Emit percentage guidelines instead of pixel offsets
    pub percent_guidelines: bool,

    /// Let a tall image take over the row baseline
    pub image_baseline: bool,

    /// Allowed difference between solved and measured positions
    pub verify_tolerance: f64,

    /// Upper bound on anchor sweep rounds per container
    pub max_sweep_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            float_precision: 3,
            edge_tolerance: 0.5,
            percent_guidelines: false,
            image_baseline: true,
            verify_tolerance: 1.0,
            max_sweep_passes: 64,
        }
    }
}

/// TOML structure for deserializing configuration files
#[derive(Deserialize)]
struct TomlConfig {
    layout: Option<TomlLayout>,
}

#[derive(Deserialize)]
struct TomlLayout {
    float_precision: Option<u32>,
    edge_tolerance: Option<f64>,
    percent_guidelines: Option<bool>,
    image_baseline: Option<bool>,
    verify_tolerance: Option<f64>,
    max_sweep_passes: Option<usize>,
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the `[layout]` section of a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load the `[layout]` section of a TOML string
    ///
    /// Missing keys keep their default values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        let Some(layout) = parsed.layout else {
            return Ok(config);
        };

        if let Some(precision) = layout.float_precision {
            if precision > 10 {
                return Err(ConfigError::InvalidValue {
                    key: "float_precision".to_string(),
                    message: format!("expected at most 10 digits, got {}", precision),
                });
            }
            config.float_precision = precision;
        }
        if let Some(tolerance) = layout.edge_tolerance {
            config.edge_tolerance = non_negative("edge_tolerance", tolerance)?;
        }
        if let Some(tolerance) = layout.verify_tolerance {
            config.verify_tolerance = non_negative("verify_tolerance", tolerance)?;
        }
        if let Some(flag) = layout.percent_guidelines {
            config.percent_guidelines = flag;
        }
        if let Some(flag) = layout.image_baseline {
            config.image_baseline = flag;
        }
        if let Some(passes) = layout.max_sweep_passes {
            config.max_sweep_passes = passes.max(1);
        }
        Ok(config)
    }

    /// Set the emitted float precision
    pub fn with_float_precision(mut self, digits: u32) -> Self {
        self.float_precision = digits;
        self
    }

    /// Set the edge alignment tolerance
    pub fn with_edge_tolerance(mut self, tolerance: f64) -> Self {
        self.edge_tolerance = tolerance;
        self
    }

    /// Use percentage guidelines for off-flow nodes
    pub fn with_percent_guidelines(mut self, enabled: bool) -> Self {
        self.percent_guidelines = enabled;
        self
    }

    pub fn with_image_baseline(mut self, enabled: bool) -> Self {
        self.image_baseline = enabled;
        self
    }

    /// Set the verification tolerance
    pub fn with_verify_tolerance(mut self, tolerance: f64) -> Self {
        self.verify_tolerance = tolerance;
        self
    }

    pub fn with_max_sweep_passes(mut self, passes: usize) -> Self {
        self.max_sweep_passes = passes.max(1);
        self
    }

    /// Truncate a value to the configured precision
    pub fn truncate(&self, value: f64) -> f64 {
        truncate(value, self.float_precision)
    }
}

fn non_negative(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a non-negative number, got {}", value),
        });
    }
    Ok(value)
}

/// Truncate (not round) `value` to `digits` decimal places
pub fn truncate(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let truncated = (value * scale).trunc() / scale;
    // Avoid emitting "-0"
    if truncated == 0.0 {
        0.0
    } else {
        truncated
    }
}
