//! Anchor-graph verification
//!
//! Solves the anchors emitted for every constraint and relative container back
//! into coordinates with the kasuari Cassowary solver and compares the result
//! with the measured geometry. Sizes are fixed to the measured boxes except for
//! nodes stretched between two anchors.

use std::collections::{HashMap, HashSet};
use std::fmt;

use kasuari::{
    Expression, Solver as KasuariSolver, Strength, Variable as KasuariVariable,
    WeightedRelation::*,
};
use log::debug;
use thiserror::Error;

use super::config::LayoutConfig;
use super::constraint::{Anchor, AnchorPosition, AnchorTarget, HelperId, HelperKind};
use super::synthesizer::helper_position;
use super::types::{Axis, ContainerKind, Edge, NodeId, NodeTree, Sizing};

const AXES: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

// ============================================================================
// SolverError
// ============================================================================

/// Errors from the verification solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unsatisfiable anchors: {reason}")]
    Unsatisfiable {
        conflicting: Vec<String>,
        reason: String,
    },

    #[error("Undefined anchor target on '{node}': {target}")]
    UndefinedTarget { node: String, target: String },

    #[error("Internal solver error: {0}")]
    Internal(String),
}

fn convert_kasuari_error(
    e: kasuari::AddConstraintError,
    owner: &str,
    description: &str,
) -> SolverError {
    match e {
        kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
            conflicting: vec![owner.to_string()],
            reason: format!("Cannot satisfy {}: conflicts with existing anchors", description),
        },
        kasuari::AddConstraintError::DuplicateConstraint => {
            SolverError::Internal(format!("Duplicate constraint: {}", description))
        }
        kasuari::AddConstraintError::InternalSolverError(msg) => {
            SolverError::Internal(format!("Internal solver error for {}: {}", description, msg))
        }
    }
}

// ============================================================================
// VerifyReport
// ============================================================================

/// A node whose solved leading edge moved away from the measured one
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub node: NodeId,
    pub name: String,
    pub axis: Axis,
    pub expected: f64,
    pub solved: f64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' {}: measured {:.2} but anchors solve to {:.2}",
            self.name, self.axis, self.expected, self.solved
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VerifyReport {
    /// Node axes that received a solver variable
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

// ============================================================================
// Verifier
// ============================================================================

struct Verifier<'a> {
    tree: &'a NodeTree,
    solver: KasuariSolver,
    /// Leading edge per anchored node axis
    positions: HashMap<(NodeId, Axis), KasuariVariable>,
    /// Free size for nodes stretched between two anchors
    sizes: HashMap<(NodeId, Axis), KasuariVariable>,
    barriers: HashMap<HelperId, KasuariVariable>,
}

fn constant(value: f64) -> Expression {
    Expression::from_constant(value)
}

fn points_into(anchor: &Anchor, members: &[NodeId]) -> bool {
    matches!(anchor.target, AnchorTarget::Node(n) if members.contains(&n))
}

/// First anchor pinning the leading edge that does not point into `members`,
/// baselines excluded
fn start_anchor(
    tree: &NodeTree,
    id: NodeId,
    axis: Axis,
    members: &[NodeId],
) -> Option<(AnchorPosition, Anchor)> {
    tree.get(id)
        .constraint
        .on_axis(axis)
        .find(|(p, a)| p.is_start() && *p != AnchorPosition::Baseline && !points_into(a, members))
        .map(|(p, a)| (p, *a))
}

/// First anchor pinning the trailing edge that does not point into `members`
fn end_anchor(
    tree: &NodeTree,
    id: NodeId,
    axis: Axis,
    members: &[NodeId],
) -> Option<(AnchorPosition, Anchor)> {
    tree.get(id)
        .constraint
        .on_axis(axis)
        .find(|(p, a)| !p.is_start() && !points_into(a, members))
        .map(|(p, a)| (p, *a))
}

/// Members of the two-sided chain headed by `head`, following back-linked
/// pairs. A reversed chain runs from the end edge of the axis.
fn chain_members(tree: &NodeTree, head: NodeId, axis: Axis, reverse: bool) -> Vec<NodeId> {
    let (forward, back) = if reverse {
        (AnchorPosition::after(axis), AnchorPosition::before(axis))
    } else {
        (AnchorPosition::before(axis), AnchorPosition::after(axis))
    };
    let mut members = vec![head];
    let mut seen = HashSet::from([head]);
    let mut current = head;
    loop {
        let next = match tree.get(current).constraint.get(forward) {
            Some(Anchor {
                target: AnchorTarget::Node(next),
                ..
            }) => *next,
            _ => break,
        };
        let linked_back = tree.try_get(next).is_some_and(|n| {
            matches!(
                n.constraint.get(back),
                Some(Anchor { target: AnchorTarget::Node(b), .. }) if *b == current
            )
        });
        if !linked_back || !seen.insert(next) {
            break;
        }
        members.push(next);
        current = next;
    }
    members
}

impl<'a> Verifier<'a> {
    fn new(tree: &'a NodeTree) -> Self {
        Self {
            tree,
            solver: KasuariSolver::new(),
            positions: HashMap::new(),
            sizes: HashMap::new(),
            barriers: HashMap::new(),
        }
    }

    fn declare(&mut self, id: NodeId) {
        let node = self.tree.get(id);
        for axis in AXES {
            if !node.constraint.has_axis(axis) {
                continue;
            }
            self.positions.insert((id, axis), KasuariVariable::new());
            let stretched = node.params.sizing(axis) == Sizing::MatchConstraint
                && start_anchor(self.tree, id, axis, &[]).is_some()
                && end_anchor(self.tree, id, axis, &[]).is_some();
            if stretched {
                self.sizes.insert((id, axis), KasuariVariable::new());
            }
        }
    }

    fn add(
        &mut self,
        constraint: kasuari::Constraint,
        owner: &str,
        description: impl FnOnce() -> String,
    ) -> Result<(), SolverError> {
        self.solver
            .add_constraint(constraint)
            .map_err(|e| convert_kasuari_error(e, owner, &description()))
    }

    fn size(&self, id: NodeId, axis: Axis) -> Expression {
        match self.sizes.get(&(id, axis)) {
            Some(size) => Expression::from(*size),
            None => constant(self.tree.get(id).bounds.size(axis)),
        }
    }

    /// Node edges are unknowns for anchored axes and measured constants otherwise
    fn edge(&self, id: NodeId, edge: Edge) -> Expression {
        let axis = edge.axis();
        match self.positions.get(&(id, axis)) {
            Some(start) if edge.is_start() => Expression::from(*start),
            Some(start) => Expression::from(*start) + self.size(id, axis),
            None => constant(self.tree.get(id).bounds.edge(edge)),
        }
    }

    fn baseline(&self, id: NodeId) -> Expression {
        let node = self.tree.get(id);
        self.edge(id, Edge::Top) + node.baseline_offset.unwrap_or(node.bounds.height)
    }

    fn undefined(&self, owner: NodeId, target: impl fmt::Display) -> SolverError {
        SolverError::UndefinedTarget {
            node: self.tree.get(owner).name.clone(),
            target: target.to_string(),
        }
    }

    fn target(
        &mut self,
        parent: NodeId,
        owner: NodeId,
        target: AnchorTarget,
        edge: Edge,
    ) -> Result<Expression, SolverError> {
        let tree = self.tree;
        match target {
            AnchorTarget::Parent => Ok(constant(tree.get(parent).content().edge(edge))),
            AnchorTarget::Node(id) => match tree.try_get(id) {
                Some(_) => Ok(self.edge(id, edge)),
                None => Err(self.undefined(owner, format!("node {}", id))),
            },
            AnchorTarget::Helper(id) => {
                let helper = tree
                    .helpers()
                    .get(id.0)
                    .ok_or_else(|| self.undefined(owner, format!("helper {}", id.0)))?;
                match &helper.kind {
                    HelperKind::Guideline { .. } => Ok(constant(helper_position(tree, id))),
                    HelperKind::Barrier { edge, referenced } => {
                        self.barrier(id, helper.parent, *edge, referenced)
                    }
                }
            }
        }
    }

    /// Barrier as an unknown bounded by every referenced edge and pulled weakly
    /// toward the parent
    fn barrier(
        &mut self,
        id: HelperId,
        parent: NodeId,
        edge: Edge,
        referenced: &[NodeId],
    ) -> Result<Expression, SolverError> {
        if let Some(variable) = self.barriers.get(&id) {
            return Ok(Expression::from(*variable));
        }
        let tree = self.tree;
        let variable = KasuariVariable::new();
        self.barriers.insert(id, variable);
        let name = tree.helper(id).name.as_str();
        for &member in referenced {
            if tree.try_get(member).is_none() {
                return Err(SolverError::UndefinedTarget {
                    node: name.to_string(),
                    target: format!("node {}", member),
                });
            }
            let bound = self.edge(member, edge);
            let relation = if edge.is_start() {
                LE(Strength::REQUIRED)
            } else {
                GE(Strength::REQUIRED)
            };
            self.add(Expression::from(variable) | relation | bound, name, || {
                format!("{} over '{}'", name, tree.get(member).name)
            })?;
        }
        let rest = if edge.is_start() {
            tree.get(parent).content().end(edge.axis())
        } else {
            0.0
        };
        self.add(Expression::from(variable) | EQ(Strength::WEAK) | rest, name, || {
            format!("{} rest position", name)
        })?;
        Ok(Expression::from(variable))
    }

    /// Both sides of `edge(id) = target edge ± margin`
    fn equation(
        &mut self,
        parent: NodeId,
        id: NodeId,
        position: AnchorPosition,
        anchor: &Anchor,
    ) -> Result<(Expression, Expression), SolverError> {
        if let (AnchorPosition::Baseline, AnchorTarget::Node(target)) = (position, anchor.target) {
            if self.tree.try_get(target).is_none() {
                return Err(self.undefined(id, format!("node {}", target)));
            }
            return Ok((self.baseline(id), self.baseline(target) + anchor.margin));
        }
        let source = self.edge(id, position.source_edge());
        let target = self.target(parent, id, anchor.target, position.target_edge())?;
        // the layout margin on the same edge adds to the anchor margin
        let margin = anchor.margin + self.tree.get(id).params.margin.get(position.source_edge());
        let margin = if position.is_start() { margin } else { -margin };
        Ok((source, target + margin))
    }

    fn pin(
        &mut self,
        parent: NodeId,
        id: NodeId,
        position: AnchorPosition,
        anchor: &Anchor,
        strength: Strength,
    ) -> Result<(), SolverError> {
        let tree = self.tree;
        let (source, target) = self.equation(parent, id, position, anchor)?;
        let name = tree.get(id).name.as_str();
        self.add(source | EQ(strength) | target, name, || {
            format!("'{}' {} -> {}", name, position, tree.target_name(anchor.target))
        })
    }

    /// Place the span from `low` to `high` between two anchors, spending the
    /// slack by `bias` measured from the start edge
    #[allow(clippy::too_many_arguments)]
    fn place_between(
        &mut self,
        parent: NodeId,
        low: NodeId,
        high: NodeId,
        axis: Axis,
        start: (AnchorPosition, Anchor),
        end: (AnchorPosition, Anchor),
        bias: f64,
    ) -> Result<(), SolverError> {
        let tree = self.tree;
        let (span_start, lower) = self.equation(parent, low, start.0, &start.1)?;
        let (span_end, upper) = self.equation(parent, high, end.0, &end.1)?;
        let name = tree.get(low).name.as_str();
        if low == high && self.sizes.contains_key(&(low, axis)) {
            self.add(span_start | EQ(Strength::REQUIRED) | lower, name, || {
                format!("'{}' stretched {}", name, start.0)
            })?;
            return self.add(span_end | EQ(Strength::REQUIRED) | upper, name, || {
                format!("'{}' stretched {}", name, end.0)
            });
        }
        let extent = span_end - span_start.clone();
        let slack = upper - lower.clone() - extent;
        self.add(span_start | EQ(Strength::REQUIRED) | lower + slack * bias, name, || {
            format!("'{}' {} span with bias {}", name, axis, bias)
        })
    }

    /// Single node: two opposing anchors share the slack, any other anchor on
    /// the axis only pulls
    fn constrain(&mut self, parent: NodeId, id: NodeId, axis: Axis) -> Result<(), SolverError> {
        let anchors: Vec<(AnchorPosition, Anchor)> = self
            .tree
            .get(id)
            .constraint
            .on_axis(axis)
            .map(|(p, a)| (p, *a))
            .collect();
        let mut primary = Vec::new();
        if let (Some(start), Some(end)) = (
            start_anchor(self.tree, id, axis, &[]),
            end_anchor(self.tree, id, axis, &[]),
        ) {
            let bias = self.tree.get(id).params.bias(axis).unwrap_or(0.5);
            self.place_between(parent, id, id, axis, start, end, bias)?;
            primary.extend([start.0, end.0]);
        }
        for (position, anchor) in anchors {
            if primary.contains(&position) {
                continue;
            }
            let strength = if primary.is_empty() {
                Strength::REQUIRED
            } else {
                Strength::STRONG
            };
            self.pin(parent, id, position, &anchor, strength)?;
            primary.push(position);
        }
        Ok(())
    }

    fn verify_container(&mut self, parent: NodeId) -> Result<(), SolverError> {
        let tree = self.tree;
        for axis in AXES {
            let mut placed = HashSet::new();
            for &head in tree.children(parent) {
                if tree.get(head).params.chain_style(axis).is_none() || placed.contains(&head) {
                    continue;
                }
                let mut reverse = false;
                let mut members = chain_members(tree, head, axis, false);
                if members.len() == 1 {
                    let reversed = chain_members(tree, head, axis, true);
                    if reversed.len() > 1 {
                        members = reversed;
                        reverse = true;
                    }
                }
                let tail = members.last().copied().unwrap_or(head);
                let link = if reverse {
                    AnchorPosition::before(axis)
                } else {
                    AnchorPosition::after(axis)
                };
                for pair in members.windows(2) {
                    if let Some(anchor) = tree.get(pair[1]).constraint.get(link).copied() {
                        self.pin(parent, pair[1], link, &anchor, Strength::REQUIRED)?;
                    }
                }
                let (low, high) = if reverse { (tail, head) } else { (head, tail) };
                let bias = tree.get(head).params.bias(axis).unwrap_or(0.5);
                match (
                    start_anchor(tree, low, axis, &members),
                    end_anchor(tree, high, axis, &members),
                ) {
                    (Some(start), Some(end)) => {
                        self.place_between(parent, low, high, axis, start, end, bias)?
                    }
                    (Some(start), None) => {
                        self.pin(parent, low, start.0, &start.1, Strength::REQUIRED)?
                    }
                    (None, Some(end)) => self.pin(parent, high, end.0, &end.1, Strength::REQUIRED)?,
                    (None, None) => {}
                }
                placed.extend(members);
            }
            for &id in tree.children(parent) {
                if placed.contains(&id) || !self.positions.contains_key(&(id, axis)) {
                    continue;
                }
                self.constrain(parent, id, axis)?;
            }
        }
        Ok(())
    }

    fn report(mut self, tolerance: f64) -> VerifyReport {
        let changes: Vec<(KasuariVariable, f64)> = self
            .solver
            .fetch_changes()
            .iter()
            .map(|(variable, value)| (*variable, *value))
            .collect();
        let mut report = VerifyReport::default();
        for node in self.tree.iter() {
            for axis in AXES {
                let Some(variable) = self.positions.get(&(node.id, axis)) else {
                    continue;
                };
                report.checked += 1;
                // Variables left at zero are absent from the change list
                let value = changes
                    .iter()
                    .find(|(k, _)| k == variable)
                    .map_or(0.0, |(_, v)| *v);
                let expected = node.bounds.start(axis);
                if (value - expected).abs() > tolerance {
                    report.mismatches.push(Mismatch {
                        node: node.id,
                        name: node.name.clone(),
                        axis,
                        expected,
                        solved: value,
                    });
                }
            }
        }
        report
    }
}

/// Solve every constraint and relative container's anchors and compare the
/// solved leading edges with the measured boxes.
pub fn verify(tree: &NodeTree, config: &LayoutConfig) -> Result<VerifyReport, SolverError> {
    let containers: Vec<NodeId> = tree
        .iter()
        .filter(|n| {
            matches!(
                n.container,
                Some(ContainerKind::Constraint) | Some(ContainerKind::Relative)
            ) && !n.children.is_empty()
        })
        .map(|n| n.id)
        .collect();

    let mut verifier = Verifier::new(tree);
    for &parent in &containers {
        for &child in tree.children(parent) {
            verifier.declare(child);
        }
    }
    for &parent in &containers {
        verifier.verify_container(parent)?;
    }
    let report = verifier.report(config.verify_tolerance);
    debug!(
        "verified {} node axes in {} containers, {} mismatches",
        report.checked,
        containers.len(),
        report.mismatches.len()
    );
    Ok(report)
}
