//! Error types for building a node tree from box facts

use thiserror::Error;

use crate::parser::ast::Span;

/// Errors that can occur while turning a parsed sheet into a node tree
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// Property key that no box understands
    #[error("unknown property '{key}'")]
    UnknownKey {
        key: String,
        span: Span,
        suggestions: Vec<String>,
    },

    /// Value of the wrong type or an unrecognized keyword
    #[error("invalid value '{found}' for '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        found: String,
        expected: String,
        span: Span,
    },

    /// Percentage outside 0..=100
    #[error("percentage {value}% for '{key}' is outside 0..100")]
    PercentOutOfRange { key: String, value: f64, span: Span },

    /// Negative width, height, padding or border
    #[error("'{key}' cannot be negative (got {value})")]
    NegativeSize { key: String, value: f64, span: Span },

    /// Two boxes with the same explicit name
    #[error("duplicate box name '{name}'")]
    DuplicateName { name: String, span: Span, first: Span },

    /// More than one top-level box
    #[error("expected a single root box, found {count}")]
    MultipleRoots { count: usize, span: Span },

    /// No boxes at all
    #[error("sheet contains no boxes")]
    EmptyDocument,
}

impl LayoutError {
    /// Create an unknown key error with suggestions
    pub fn unknown_key(key: impl Into<String>, span: Span, suggestions: Vec<String>) -> Self {
        Self::UnknownKey {
            key: key.into(),
            span,
            suggestions,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        key: impl Into<String>,
        found: impl Into<String>,
        expected: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            found: found.into(),
            expected: expected.into(),
            span,
        }
    }

    pub fn percent_out_of_range(key: impl Into<String>, value: f64, span: Span) -> Self {
        Self::PercentOutOfRange {
            key: key.into(),
            value,
            span,
        }
    }

    pub fn negative_size(key: impl Into<String>, value: f64, span: Span) -> Self {
        Self::NegativeSize {
            key: key.into(),
            value,
            span,
        }
    }

    /// Get the source span if available
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::UnknownKey { span, .. }
            | Self::InvalidValue { span, .. }
            | Self::PercentOutOfRange { span, .. }
            | Self::NegativeSize { span, .. }
            | Self::DuplicateName { span, .. }
            | Self::MultipleRoots { span, .. } => Some(span),
            Self::EmptyDocument => None,
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UnknownKey { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        let Some(span) = self.span() else {
            return format!("{}: {}", filename, message);
        };
        let label = match self.suggestions() {
            Some(suggestions) if !suggestions.is_empty() => {
                format!("did you mean: {}?", suggestions.join(", "))
            }
            _ => message.clone(),
        };
        crate::error::render_report(source, filename, span, &message, &label)
    }
}
