//! Configuration for the text report

use std::path::Path;

use serde::Deserialize;

use crate::layout::ConfigError;

/// Configuration options for the attribute dump
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Spaces per nesting level
    pub indent: usize,

    /// Echo each node's measured box next to its name
    pub show_geometry: bool,

    /// List guidelines and barriers after each parent's children
    pub show_helpers: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            show_geometry: true,
            show_helpers: true,
        }
    }
}

#[derive(Deserialize)]
struct TomlConfig {
    report: Option<TomlReport>,
}

#[derive(Deserialize)]
struct TomlReport {
    indent: Option<usize>,
    show_geometry: Option<bool>,
    show_helpers: Option<bool>,
}

impl ReportConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the `[report]` section of a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load the `[report]` section of a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(report) = parsed.report {
            if let Some(indent) = report.indent {
                if indent > 16 {
                    return Err(ConfigError::InvalidValue {
                        key: "indent".to_string(),
                        message: format!("expected at most 16 spaces, got {}", indent),
                    });
                }
                config.indent = indent;
            }
            config.show_geometry = report.show_geometry.unwrap_or(config.show_geometry);
            config.show_helpers = report.show_helpers.unwrap_or(config.show_helpers);
        }
        Ok(config)
    }

    /// Set the indentation width
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set whether measured boxes are echoed
    pub fn with_geometry(mut self, show: bool) -> Self {
        self.show_geometry = show;
        self
    }

    pub fn with_helpers(mut self, show: bool) -> Self {
        self.show_helpers = show;
        self
    }
}
