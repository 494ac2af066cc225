//! Diagnostics over a resolved tree.
//!
//! Runs after synthesis and the second pass. Nothing here is an error: each
//! finding names the offending node so the caller can surface it as a
//! build-time warning.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::constraint::{AnchorPosition, AnchorTarget};
use super::synthesizer::{anchor_candidates, HelperFailure};
use super::types::{Axis, NodeId, NodeTree};

/// A finding about the resolved anchor graph
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub node: NodeId,
    pub message: String,
}

/// Category of finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Unresolved,
    ForeignTarget,
    HelperFailure,
    MultipleBaselines,
    Weight,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Unresolved => write!(f, "unresolved"),
            DiagnosticCategory::ForeignTarget => write!(f, "foreign-target"),
            DiagnosticCategory::HelperFailure => write!(f, "helper"),
            DiagnosticCategory::MultipleBaselines => write!(f, "baseline"),
            DiagnosticCategory::Weight => write!(f, "weight"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Run every check on a resolved tree.
pub fn check(tree: &NodeTree, failures: &[HelperFailure]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_unresolved(tree, &mut diagnostics);
    check_targets(tree, &mut diagnostics);
    check_helper_failures(tree, failures, &mut diagnostics);
    check_baselines(tree, &mut diagnostics);
    check_weights(tree, &mut diagnostics);
    diagnostics
}

// ── Unresolved axes ───────────────────────────────────────────────

fn check_unresolved(tree: &NodeTree, diagnostics: &mut Vec<Diagnostic>) {
    for id in anchor_candidates(tree) {
        let node = tree.get(id);
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if !node.constraint.is_resolved(axis) {
                diagnostics.push(Diagnostic {
                    category: DiagnosticCategory::Unresolved,
                    node: id,
                    message: format!(
                        "'{}' has no {} path to its parent (source offset {})",
                        node.name, axis, node.span.start
                    ),
                });
            }
        }
    }
}

// ── Anchor targets ────────────────────────────────────────────────

/// Anchors may only reference siblings or helpers of the same parent
fn check_targets(tree: &NodeTree, diagnostics: &mut Vec<Diagnostic>) {
    for node in tree.iter() {
        for (position, anchor) in &node.constraint.current {
            let owner = match anchor.target {
                AnchorTarget::Parent => continue,
                AnchorTarget::Node(target) if target == node.id => {
                    diagnostics.push(Diagnostic {
                        category: DiagnosticCategory::ForeignTarget,
                        node: node.id,
                        message: format!("'{}' {} targets itself", node.name, position),
                    });
                    continue;
                }
                AnchorTarget::Node(target) => tree.parent(target),
                AnchorTarget::Helper(helper) => Some(tree.helper(helper).parent),
            };
            if owner != node.parent {
                diagnostics.push(Diagnostic {
                    category: DiagnosticCategory::ForeignTarget,
                    node: node.id,
                    message: format!(
                        "'{}' {} targets '{}' outside its parent",
                        node.name,
                        position,
                        tree.target_name(anchor.target)
                    ),
                });
            }
        }
    }
}

// ── Guideline and barrier failures ────────────────────────────────

fn check_helper_failures(tree: &NodeTree, failures: &[HelperFailure], diagnostics: &mut Vec<Diagnostic>) {
    for failure in failures {
        diagnostics.push(Diagnostic {
            category: DiagnosticCategory::HelperFailure,
            node: failure.node,
            message: format!(
                "'{}' left unattached on {}: {}",
                tree.get(failure.node).name,
                failure.axis,
                failure.reason
            ),
        });
    }
}

// ── Baseline uniqueness ───────────────────────────────────────────

/// Follow baseline anchors to the node that carries the row's baseline
fn baseline_root(tree: &NodeTree, id: NodeId) -> NodeId {
    let mut current = id;
    let mut seen = HashSet::new();
    while seen.insert(current) {
        match tree.get(current).constraint.get(AnchorPosition::Baseline) {
            Some(anchor) => match anchor.target {
                AnchorTarget::Node(next) => current = next,
                _ => break,
            },
            None => break,
        }
    }
    current
}

fn check_baselines(tree: &NodeTree, diagnostics: &mut Vec<Diagnostic>) {
    for parent in tree.iter() {
        let mut roots: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for &child in &parent.children {
            let node = tree.get(child);
            let (Some(row), true) = (node.row, node.constraint.get(AnchorPosition::Baseline).is_some())
            else {
                continue;
            };
            let root = baseline_root(tree, child);
            let entry = roots.entry(row).or_default();
            if !entry.contains(&root) {
                entry.push(root);
            }
        }
        for (row, list) in roots {
            if list.len() > 1 {
                let names: Vec<&str> = list.iter().map(|id| tree.get(*id).name.as_str()).collect();
                diagnostics.push(Diagnostic {
                    category: DiagnosticCategory::MultipleBaselines,
                    node: parent.id,
                    message: format!(
                        "row {} of '{}' has {} baselines: {}",
                        row,
                        parent.name,
                        list.len(),
                        names.join(", ")
                    ),
                });
            }
        }
    }
}

// ── Chain weights ─────────────────────────────────────────────────

fn check_weights(tree: &NodeTree, diagnostics: &mut Vec<Diagnostic>) {
    for node in tree.iter() {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if let Some(weight) = node.params.weight(axis) {
                if weight > 1.0 {
                    diagnostics.push(Diagnostic {
                        category: DiagnosticCategory::Weight,
                        node: node.id,
                        message: format!("'{}' has {} weight {} above 1", node.name, axis, weight),
                    });
                }
            }
        }
    }
}
