//! Layout resolution engine
//!
//! Drives one resolution call over a [`NodeTree`]:
//!
//! 1. **Classification**: post-order over every parent, so a container is
//!    classified only after its children are final. Fragment merging and
//!    wrapping happen here and the new groups are resolved on the spot.
//! 2. **Synthesis**: anchors for each classified container.
//! 3. **Sweep**: worklist propagation of resolved axes through the anchor
//!    graph.
//! 4. **Second pass**: any axis still unresolved is re-anchored to the parent
//!    (or a guideline) at its measured offset and the sweep runs again.
//! 5. **Diagnostics** over the final tree.
//!
//! The guideline cache and clear map live in a [`ResolveContext`] scoped to
//! the call.

use std::collections::HashSet;

use log::{debug, warn};

use super::classifier::classify;
use super::config::LayoutConfig;
use super::constraint::GuidelineCache;
use super::diagnostics::{self, Diagnostic};
use super::partition::{merge_fragments, ClearMap};
use super::synthesizer::{
    add_guideline, anchor_candidates, anchor_to_parent, evaluate_anchors, synthesize,
    HelperFailure, SynthContext,
};
use super::types::{Axis, ContainerKind, NodeId, NodeTree};

/// Result of [`resolve`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Axes left without a path to the parent after the second pass
    pub unresolved: Vec<(NodeId, Axis)>,
    /// Nodes re-anchored by the second pass
    pub second_pass: Vec<NodeId>,
    pub failures: Vec<HelperFailure>,
    /// Axes resolved by the sweeps
    pub swept: usize,
}

impl ResolveOutcome {
    /// Every anchored node reaches its parent and nothing was reported
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.diagnostics.is_empty()
    }
}

/// Mutable state shared by every container in one resolution call
pub struct ResolveContext<'a> {
    config: &'a LayoutConfig,
    clear_map: ClearMap,
    guidelines: GuidelineCache,
    classifying: HashSet<NodeId>,
    failures: Vec<HelperFailure>,
}

impl<'a> ResolveContext<'a> {
    /// Create a context, picking up helpers left in the tree by an earlier call
    pub fn new(tree: &NodeTree, config: &'a LayoutConfig) -> Self {
        let mut guidelines = GuidelineCache::new(config.float_precision);
        for helper in tree.helpers() {
            guidelines.register(helper);
        }
        Self {
            config,
            clear_map: ClearMap::new(),
            guidelines,
            classifying: HashSet::new(),
            failures: Vec::new(),
        }
    }

    fn synth(&mut self) -> SynthContext<'_> {
        SynthContext {
            config: self.config,
            clear_map: &self.clear_map,
            guidelines: &mut self.guidelines,
            failures: &mut self.failures,
        }
    }

    /// Classify and synthesize `id` and everything below it
    fn resolve_node(&mut self, tree: &mut NodeTree, id: NodeId) {
        for child in tree.children(id).to_vec() {
            if !tree.children(child).is_empty() {
                self.resolve_node(tree, child);
            }
        }
        if tree.children(id).is_empty() {
            return;
        }

        self.clear_map.register(tree, id);
        if tree.get(id).container.is_none() {
            for group in merge_fragments(tree, id) {
                self.resolve_node(tree, group);
            }
            let layout = classify(tree, &self.clear_map, id, &mut self.classifying, self.config);
            {
                let node = tree.get_mut(id);
                node.container = Some(layout.kind);
                node.flags = layout.flags;
            }
            for folded in &layout.collapse {
                let node = tree.get_mut(*folded);
                node.collapsed = true;
                node.constraint.set_resolved(Axis::Horizontal, true);
                node.constraint.set_resolved(Axis::Vertical, true);
            }
            for run in &layout.wraps {
                match tree.wrap(id, run) {
                    Some(group) => self.resolve_node(tree, group),
                    None => debug!("skipped non-contiguous wrap under '{}'", tree.get(id).name),
                }
            }
            self.clear_map.register(tree, id);
        }
        synthesize(tree, id, &mut self.synth());
    }

    /// Re-anchor every unresolved axis directly to its container
    fn second_pass(&mut self, tree: &mut NodeTree) -> Vec<NodeId> {
        let mut touched = Vec::new();
        for id in anchor_candidates(tree) {
            let Some(parent) = tree.parent(id) else {
                continue;
            };
            for axis in [Axis::Horizontal, Axis::Vertical] {
                if tree.get(id).constraint.is_resolved(axis) {
                    continue;
                }
                let guided = !tree.get(id).page_flow()
                    && tree.get(parent).container == Some(ContainerKind::Constraint);
                if guided {
                    tree.get_mut(id).constraint.clear_axis(axis);
                    if !add_guideline(tree, parent, id, axis, &mut self.synth()) {
                        continue;
                    }
                } else {
                    anchor_to_parent(tree, parent, id, axis, self.config);
                }
                warn!(
                    "second pass anchored '{}' on {} to {}",
                    tree.get(id).name,
                    axis,
                    if guided { "a guideline" } else { "its parent" }
                );
                if !touched.contains(&id) {
                    touched.push(id);
                }
            }
        }
        touched
    }
}

/// Resolve every container of `tree` into anchors.
///
/// Calling this again on a resolved tree changes nothing.
pub fn resolve(tree: &mut NodeTree, config: &LayoutConfig) -> ResolveOutcome {
    let Some(root) = tree.root() else {
        return ResolveOutcome::default();
    };
    let mut ctx = ResolveContext::new(tree, config);
    ctx.resolve_node(tree, root);
    {
        let constraint = &mut tree.get_mut(root).constraint;
        constraint.set_resolved(Axis::Horizontal, true);
        constraint.set_resolved(Axis::Vertical, true);
    }

    let mut swept = evaluate_anchors(tree, config.max_sweep_passes);
    let second_pass = ctx.second_pass(tree);
    if !second_pass.is_empty() {
        swept += evaluate_anchors(tree, config.max_sweep_passes);
    }

    let mut unresolved = Vec::new();
    for id in anchor_candidates(tree) {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if !tree.get(id).constraint.is_resolved(axis) {
                unresolved.push((id, axis));
            }
        }
    }
    let diagnostics = diagnostics::check(tree, &ctx.failures);
    debug!(
        "resolved {} nodes: {} swept, {} second-pass, {} unresolved, {} diagnostics",
        tree.len(),
        swept,
        second_pass.len(),
        unresolved.len(),
        diagnostics.len()
    );

    ResolveOutcome {
        diagnostics,
        unresolved,
        second_pass,
        failures: ctx.failures,
        swept,
    }
}
