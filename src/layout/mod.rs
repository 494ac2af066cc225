//! Layout resolution for box trees
//!
//! This module takes a [`NodeTree`] of measured boxes and decides, bottom-up,
//! which container archetype each parent becomes and which anchors place each
//! child, producing emitted layout attributes on the same tree.

pub mod allocator;
pub mod baseline;
pub mod classifier;
pub mod config;
pub mod constraint;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod facts;
pub mod partition;
pub mod solver;
pub mod synthesizer;
pub mod types;

pub use config::{ConfigError, LayoutConfig};
pub use constraint::{Anchor, AnchorPosition, AnchorTarget, GuidelineOffset, Helper, HelperId, HelperKind};
pub use diagnostics::{Diagnostic, DiagnosticCategory};
pub use engine::{resolve, ResolveOutcome};
pub use error::LayoutError;
pub use facts::build_tree;
pub use solver::{verify, SolverError, VerifyReport};
pub use types::*;
