//! Anchor Layout - resolve styled box trees into anchor-based containers
//!
//! This library provides a parser for box-facts sheets, a layout engine that
//! classifies every parent into a native container archetype and synthesizes
//! anchors for its children, and a solver-backed verifier for the result.
//!
//! # Example
//!
//! ```rust
//! use anchor_layout::{resolve_source, LayoutConfig};
//!
//! let resolution = resolve_source(
//!     "box root [width: 200, height: 20] { box a [width: 200, height: 20] }",
//!     &LayoutConfig::default(),
//! )
//! .unwrap();
//! assert!(resolution.tree.find("a").is_some());
//! ```

pub mod error;
pub mod layout;
pub mod parser;
pub mod report;

pub use error::ParseError;
pub use layout::{
    ConfigError, Diagnostic, LayoutConfig, LayoutError, NodeTree, ResolveOutcome, SolverError,
    VerifyReport,
};
pub use parser::{parse, Document};
pub use report::{render_report, ReportConfig};

use log::debug;
use thiserror::Error;

/// Errors that can occur during the resolve pipeline
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Error while building the node tree
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Error loading configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error while verifying anchors
    #[error("verification error: {0}")]
    Solver(#[from] SolverError),
}

impl From<Vec<ParseError>> for ResolveError {
    fn from(errors: Vec<ParseError>) -> Self {
        ResolveError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ResolveError {
    /// Format the error with source context where a span is known
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ResolveError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            ResolveError::Layout(e) => e.format(source, filename),
            other => format!("{}: {}", filename, other),
        }
    }
}

/// A resolved sheet: the annotated tree and what the engine found on the way
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tree: NodeTree,
    pub outcome: ResolveOutcome,
}

impl Resolution {
    /// Solve the emitted anchors back into coordinates
    pub fn verify(&self, config: &LayoutConfig) -> Result<VerifyReport, SolverError> {
        layout::verify(&self.tree, config)
    }

    /// Attribute-per-line dump of the annotated tree
    pub fn report(&self, config: &ReportConfig) -> String {
        render_report(&self.tree, config)
    }
}

/// Parse a box-facts sheet, build its node tree and resolve it
///
/// Diagnostics never fail the call; they are returned on the outcome.
///
/// # Example
///
/// ```rust
/// use anchor_layout::{resolve_source, LayoutConfig, ResolveError};
///
/// let err = resolve_source("box a [widht: 3]", &LayoutConfig::default()).unwrap_err();
/// assert!(matches!(err, ResolveError::Layout(_)));
/// ```
pub fn resolve_source(source: &str, config: &LayoutConfig) -> Result<Resolution, ResolveError> {
    let doc = parse(source)?;
    let mut tree = layout::build_tree(&doc)?;
    let outcome = layout::resolve(&mut tree, config);
    debug!(
        "resolved {} nodes with {} diagnostics",
        tree.len(),
        outcome.diagnostics.len()
    );
    Ok(Resolution { tree, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_sheet() {
        let resolution = resolve_source(
            "box root [width: 100, height: 40] { box a [width: 100, height: 20] box b [y: 20, width: 100, height: 20] }",
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(resolution.tree.len(), 3);
        assert!(resolution.outcome.is_clean());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = resolve_source("box root [width: ]", &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
        assert!(err.to_string().starts_with("parse errors:"));
    }

    #[test]
    fn test_layout_error_formats_with_suggestion() {
        let source = "box root [widht: 10]";
        let err = resolve_source(source, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, ResolveError::Layout(LayoutError::UnknownKey { .. })));
        assert!(err.format(source, "sheet.box").contains("did you mean: width"));
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let err = resolve_source("box a box b", &LayoutConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Layout(LayoutError::MultipleRoots { count: 2, .. })
        ));
    }

    #[test]
    fn test_config_error_converts() {
        let err: ResolveError = LayoutConfig::from_toml("[layout\n").unwrap_err().into();
        assert!(err.to_string().starts_with("config error:"));
        assert_eq!(err.format("", "c.toml").split(':').next(), Some("c.toml"));
    }
}
