//! Anchor/constraint synthesizer
//!
//! Assigns directional anchors to the children of a classified container so
//! that every child reaches the parent on both axes. Margins follow one
//! convention throughout: a leading anchor places the source edge at
//! `target + margin`, a trailing anchor at `target - margin`. Node edges are
//! border-box edges; the parent target is the parent's content box.

use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};

use super::allocator::{adjust_grow_ratio, allocate_sizing};
use super::baseline::align_row;
use super::config::LayoutConfig;
use super::constraint::{
    AnchorPosition, AnchorTarget, GuidelineCache, GuidelineOffset, HelperId, HelperKind,
};
use super::partition::{partition_rows, ClearMap, Row};
use super::types::{
    AlignItems, AlignmentFlags, Axis, BoundingBox, ChainStyle, ContainerKind, Edge, FloatSide,
    Gravity, JustifyContent, NodeId, NodeTree, Orientation, Sizing, TextAlign, VerticalAlign,
};

/// A guideline or barrier that could not be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct HelperFailure {
    pub node: NodeId,
    pub axis: Axis,
    pub reason: String,
}

/// Shared state for one resolution call
pub struct SynthContext<'a> {
    pub config: &'a LayoutConfig,
    pub clear_map: &'a ClearMap,
    pub guidelines: &'a mut GuidelineCache,
    pub failures: &'a mut Vec<HelperFailure>,
}

impl SynthContext<'_> {
    fn fail(&mut self, tree: &NodeTree, node: NodeId, axis: Axis, reason: String) {
        warn!("'{}' left unattached on {}: {}", tree.get(node).name, axis, reason);
        self.failures.push(HelperFailure { node, axis, reason });
    }
}

// ============================================================================
// Geometry of anchor targets
// ============================================================================

/// Position of a guideline line or barrier edge
pub fn helper_position(tree: &NodeTree, id: HelperId) -> f64 {
    let helper = tree.helper(id);
    match &helper.kind {
        HelperKind::Guideline { axis, offset } => {
            let frame = tree.get(helper.parent).padding_box();
            let start = frame.start(*axis);
            let size = frame.size(*axis);
            match offset {
                GuidelineOffset::Begin(v) => start + v,
                GuidelineOffset::End(v) => start + size - v,
                GuidelineOffset::Percent(p) => start + p * size,
            }
        }
        HelperKind::Barrier { edge, referenced } => {
            let values = referenced.iter().map(|r| tree.get(*r).bounds.edge(*edge));
            if edge.is_start() {
                values.fold(f64::INFINITY, f64::min)
            } else {
                values.fold(f64::NEG_INFINITY, f64::max)
            }
        }
    }
}

/// Coordinate of `edge` on an anchor target
pub fn target_position(tree: &NodeTree, parent: NodeId, target: AnchorTarget, edge: Edge) -> f64 {
    match target {
        AnchorTarget::Parent => tree.get(parent).content().edge(edge),
        AnchorTarget::Node(id) => tree.get(id).bounds.edge(edge),
        AnchorTarget::Helper(id) => helper_position(tree, id),
    }
}

/// Margin that reproduces the measured geometry for an edge anchor
fn measured(
    tree: &NodeTree,
    parent: NodeId,
    id: NodeId,
    position: AnchorPosition,
    target: AnchorTarget,
) -> f64 {
    let source = tree.get(id).bounds.edge(position.source_edge());
    let reference = target_position(tree, parent, target, position.target_edge());
    if position.is_start() {
        source - reference
    } else {
        reference - source
    }
}

fn set_anchor(
    tree: &mut NodeTree,
    id: NodeId,
    position: AnchorPosition,
    target: AnchorTarget,
    margin: f64,
    config: &LayoutConfig,
) {
    let margin = config.truncate(margin);
    if tree.get_mut(id).constraint.anchor(position, target, margin) {
        trace!(
            "'{}' {} -> {} ({})",
            tree.get(id).name,
            position.attribute(),
            tree.target_name(target),
            margin
        );
    }
}

fn link(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    position: AnchorPosition,
    target: AnchorTarget,
    config: &LayoutConfig,
) {
    let margin = measured(tree, parent, id, position, target);
    set_anchor(tree, id, position, target, margin, config);
}

fn mark_resolved(tree: &mut NodeTree, id: NodeId) {
    let constraint = &mut tree.get_mut(id).constraint;
    constraint.set_resolved(Axis::Horizontal, true);
    constraint.set_resolved(Axis::Vertical, true);
}

/// Bias of a box between two limits, or `None` without slack
fn measured_bias(reference: BoundingBox, bounds: BoundingBox, axis: Axis, tolerance: f64) -> Option<f64> {
    let slack = reference.size(axis) - bounds.size(axis);
    (slack > tolerance).then(|| ((bounds.start(axis) - reference.start(axis)) / slack).clamp(0.0, 1.0))
}

fn lowest_of(tree: &NodeTree, items: impl Iterator<Item = NodeId>) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for id in items {
        let bottom = tree.get(id).linear().bottom();
        if best.map_or(true, |(_, b)| bottom > b) {
            best = Some((id, bottom));
        }
    }
    best.map(|(id, _)| id)
}

/// Lowest non-floating item of a row, or the lowest item overall
fn lowest(tree: &NodeTree, items: &[NodeId]) -> Option<NodeId> {
    lowest_of(tree, items.iter().copied().filter(|id| !tree.get(*id).floating()))
        .or_else(|| lowest_of(tree, items.iter().copied()))
}

// ============================================================================
// Chains
// ============================================================================

fn fallback_bias(tree: &NodeTree, parent: NodeId, axis: Axis) -> f64 {
    if axis == Axis::Vertical {
        return 0.0;
    }
    let node = tree.get(parent);
    let bias = match node.text_align {
        TextAlign::Start | TextAlign::Justify => 0.0,
        TextAlign::Center => 0.5,
        TextAlign::End => 1.0,
    };
    if node.rtl {
        1.0 - bias
    } else {
        bias
    }
}

/// Anchor positions used by a chain, mirrored for right-to-left rows
#[derive(Debug, Clone, Copy)]
struct ChainSides {
    lead: AnchorPosition,
    link: AnchorPosition,
    back: AnchorPosition,
    trail: AnchorPosition,
}

impl ChainSides {
    fn new(axis: Axis, reverse: bool) -> Self {
        if reverse {
            Self {
                lead: AnchorPosition::end(axis),
                link: AnchorPosition::before(axis),
                back: AnchorPosition::after(axis),
                trail: AnchorPosition::start(axis),
            }
        } else {
            Self {
                lead: AnchorPosition::start(axis),
                link: AnchorPosition::after(axis),
                back: AnchorPosition::before(axis),
                trail: AnchorPosition::end(axis),
            }
        }
    }
}

/// Build a chain along `axis` over `members` in chain order.
///
/// The head attaches to `start`; a node target is attached past its far edge.
/// With an `end` target the chain is two-sided: members get back-links, the
/// terminal margins are the CSS margins clamped to the measured gaps and the
/// head records chain style and bias. A `reverse` chain runs from the end
/// edge of the axis toward its start (right-to-left rows), so `start` is the
/// target on the far side. Returns the head.
///
/// The bias is always expressed from the start edge of the axis. It is read
/// off the measured free space around the chain; the parent's text alignment
/// only decides it when there is no free space to measure.
#[allow(clippy::too_many_arguments)]
pub fn chain(
    tree: &mut NodeTree,
    parent: NodeId,
    members: &[NodeId],
    axis: Axis,
    start: AnchorTarget,
    end: Option<AnchorTarget>,
    reverse: bool,
    config: &LayoutConfig,
) -> Option<NodeId> {
    let (&head, _) = members.split_first()?;
    let &tail = members.last()?;
    let sides = ChainSides::new(axis, reverse);
    let start_position = match start {
        AnchorTarget::Node(_) => sides.link,
        _ => sides.lead,
    };
    link(tree, parent, head, start_position, start, config);
    for pair in members.windows(2) {
        link(tree, parent, pair[1], sides.link, AnchorTarget::Node(pair[0]), config);
        if end.is_some() {
            set_anchor(tree, pair[0], sides.back, AnchorTarget::Node(pair[1]), 0.0, config);
        }
    }
    let Some(end) = end else {
        return Some(head);
    };
    let end_position = match end {
        AnchorTarget::Node(_) => sides.back,
        _ => sides.trail,
    };

    let s = target_position(tree, parent, start, start_position.target_edge());
    let e = target_position(tree, parent, end, end_position.target_edge());
    let (head_gap, tail_gap) = if reverse {
        (s - tree.get(head).bounds.end(axis), tree.get(tail).bounds.start(axis) - e)
    } else {
        (tree.get(head).bounds.start(axis) - s, e - tree.get(tail).bounds.end(axis))
    };
    let head_margin = tree.get(head).margin.get(sides.lead.source_edge()).min(head_gap);
    let tail_margin = tree.get(tail).margin.get(sides.trail.source_edge()).min(tail_gap);
    set_anchor(tree, head, start_position, start, head_margin, config);
    set_anchor(tree, tail, end_position, end, tail_margin, config);

    let lead_free = head_gap - head_margin;
    let trail_free = tail_gap - tail_margin;
    let slack = lead_free + trail_free;
    let bias = if slack > config.edge_tolerance {
        let start_free = if reverse { trail_free } else { lead_free };
        (start_free / slack).clamp(0.0, 1.0)
    } else {
        fallback_bias(tree, parent, axis)
    };
    let weighted = members.iter().any(|id| {
        let node = tree.get(*id);
        node.params.weight(axis).is_some() || node.percent(axis).is_some()
    });
    let style = if weighted {
        ChainStyle::Spread
    } else if axis == Axis::Horizontal && tree.get(parent).text_align == TextAlign::Justify {
        ChainStyle::SpreadInside
    } else {
        ChainStyle::Packed
    };
    let params = &mut tree.get_mut(head).params;
    params.set_chain_style(axis, style);
    params.set_bias(axis, config.truncate(bias));
    trace!(
        "{} chain of {} headed by '{}': {} bias {}",
        axis,
        members.len(),
        tree.get(head).name,
        style,
        config.truncate(bias)
    );
    Some(head)
}

// ============================================================================
// Guidelines and barriers
// ============================================================================

/// Anchor an off-flow node on `axis` to a sibling edge or a guideline.
///
/// Returns false when nothing could be attached; the failure is recorded.
pub fn add_guideline(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    axis: Axis,
    ctx: &mut SynthContext,
) -> bool {
    let config = ctx.config;
    let tolerance = config.edge_tolerance;
    let node = tree.get(id);
    let start = node.bounds.start(axis);
    let end = node.bounds.end(axis);
    let parent_offset = start - tree.get(parent).content().start(axis);

    let siblings: Vec<NodeId> = tree
        .children(parent)
        .iter()
        .copied()
        .filter(|s| {
            let sibling = tree.get(*s);
            *s != id && sibling.page_flow() && !sibling.collapsed && sibling.constraint.has_axis(axis)
        })
        .collect();
    let exact = siblings.iter().find_map(|s| {
        let b = tree.get(*s).bounds;
        if (b.start(axis) - start).abs() <= tolerance {
            Some((AnchorPosition::start(axis), *s))
        } else if (b.end(axis) - end).abs() <= tolerance {
            Some((AnchorPosition::end(axis), *s))
        } else {
            None
        }
    });
    let nearest = || {
        siblings
            .iter()
            .filter_map(|s| {
                let distance = start - tree.get(*s).bounds.start(axis);
                (distance >= 0.0 && distance < parent_offset).then_some((*s, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, _)| (AnchorPosition::start(axis), s))
    };
    if let Some((position, sibling)) = exact.or_else(nearest) {
        link(tree, parent, id, position, AnchorTarget::Node(sibling), config);
        return true;
    }

    if tree.get(parent).container != Some(ContainerKind::Constraint) {
        let reason = format!(
            "guideline needs a constraint parent, '{}' is {}",
            tree.get(parent).name,
            tree.get(parent).container.map_or("unclassified".to_string(), |k| k.to_string())
        );
        ctx.fail(tree, id, axis, reason);
        return false;
    }

    let frame = tree.get(parent).padding_box();
    let node = tree.get(id);
    let linear = node.linear();
    let from_end = node.insets.get(axis.start_edge()).is_auto()
        && !node.insets.get(axis.end_edge()).is_auto();
    let offset = if config.percent_guidelines && frame.size(axis) > 0.0 {
        GuidelineOffset::Percent(
            config.truncate((linear.start(axis) - frame.start(axis)) / frame.size(axis)),
        )
    } else if from_end {
        GuidelineOffset::End(config.truncate(frame.end(axis) - linear.end(axis)))
    } else {
        GuidelineOffset::Begin(config.truncate(linear.start(axis) - frame.start(axis)))
    };
    if !offset.value().is_finite() {
        ctx.fail(tree, id, axis, format!("non-finite guideline offset {}", offset));
        return false;
    }
    let (position, margin) = match offset {
        GuidelineOffset::End(_) => (AnchorPosition::end(axis), node.margin.get(axis.end_edge())),
        _ => (AnchorPosition::start(axis), node.margin.get(axis.start_edge())),
    };

    let helper = ctx.guidelines.guideline(parent, axis, offset, || {
        Some(tree.add_helper(parent, HelperKind::Guideline { axis, offset }))
    });
    match helper {
        Some(helper) => {
            set_anchor(tree, id, position, AnchorTarget::Helper(helper), margin, config);
            true
        }
        None => {
            ctx.fail(tree, id, axis, "guideline insertion rejected".to_string());
            false
        }
    }
}

/// Create (or reuse) a barrier over `referenced` for `id`
pub fn add_barrier(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    edge: Edge,
    referenced: &[NodeId],
    ctx: &mut SynthContext,
) -> Option<HelperId> {
    if tree.get(parent).container != Some(ContainerKind::Constraint) {
        ctx.fail(tree, id, edge.axis(), "barrier needs a constraint parent".to_string());
        return None;
    }
    let barrier = ctx.guidelines.barrier(parent, edge, referenced, || {
        Some(tree.add_helper(
            parent,
            HelperKind::Barrier {
                edge,
                referenced: referenced.to_vec(),
            },
        ))
    })?;
    tree.get_mut(id).constraint.barrier.insert(edge, barrier);
    Some(barrier)
}

// ============================================================================
// Container synthesis
// ============================================================================

/// Children taking part in synthesis: everything except folded text
fn members(tree: &NodeTree, parent: NodeId) -> Vec<NodeId> {
    tree.children(parent)
        .iter()
        .copied()
        .filter(|id| {
            let node = tree.get(*id);
            !node.collapsed || node.is_line_break()
        })
        .collect()
}

fn collapse_line_break(tree: &mut NodeTree, id: NodeId) {
    tree.get_mut(id).collapsed = true;
    mark_resolved(tree, id);
}

/// Assign anchors and layout params to the children of `parent`.
///
/// A container whose children are all anchored already is left untouched.
pub fn synthesize(tree: &mut NodeTree, parent: NodeId, ctx: &mut SynthContext) {
    let Some(kind) = tree.get(parent).container else {
        return;
    };
    let children = members(tree, parent);
    let pending = children.iter().any(|id| {
        let node = tree.get(*id);
        !node.collapsed && !node.constraint.anchored()
    });
    if !pending {
        trace!("'{}' already anchored", tree.get(parent).name);
        return;
    }

    match kind {
        ContainerKind::Constraint if tree.get(parent).flags.contains(AlignmentFlags::FLEX) => {
            synthesize_flex(tree, parent, &children, ctx)
        }
        ContainerKind::Constraint => synthesize_rows(tree, parent, &children, ctx),
        ContainerKind::Relative => synthesize_relative(tree, parent, &children, ctx),
        ContainerKind::Linear(orientation) => {
            synthesize_linear(tree, parent, &children, orientation, ctx.config)
        }
        ContainerKind::Frame => synthesize_frame(tree, parent, &children, ctx.config),
        ContainerKind::Grid => synthesize_grid(tree, parent, &children, ctx),
    }
    debug!(
        "synthesized {} container '{}' ({} children)",
        kind,
        tree.get(parent).name,
        children.len()
    );
}

/// Split a row into its items, folding line breaks away
fn row_items(tree: &mut NodeTree, row: &Row, index: usize) -> Vec<NodeId> {
    let mut items = Vec::with_capacity(row.len());
    for &id in &row.items {
        if tree.get(id).is_line_break() {
            collapse_line_break(tree, id);
        } else {
            tree.get_mut(id).row = Some(index);
            items.push(id);
        }
    }
    items
}

fn synthesize_rows(tree: &mut NodeTree, parent: NodeId, children: &[NodeId], ctx: &mut SynthContext) {
    let config = ctx.config;
    let partition = partition_rows(tree, ctx.clear_map, parent, children, config.edge_tolerance);
    let single_row = partition.rows.len() == 1;
    let mut floats_seen: Vec<NodeId> = Vec::new();
    let mut previous: Option<Vec<NodeId>> = None;

    for (index, row) in partition.rows.iter().enumerate() {
        let items = row_items(tree, row, index);
        if items.is_empty() {
            continue;
        }
        place_row_horizontally(tree, parent, row, &items, config);
        place_row_vertically(
            tree,
            parent,
            &items,
            previous.as_deref(),
            &floats_seen,
            single_row,
            ctx,
        );
        floats_seen.extend(items.iter().copied().filter(|id| tree.get(*id).floating()));
        previous = Some(items);
    }

    allocate_sizing(tree, parent, children, Axis::Vertical, config);
    for &id in &partition.off_flow {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            add_guideline(tree, parent, id, axis, ctx);
        }
    }
}

fn place_row_horizontally(
    tree: &mut NodeTree,
    parent: NodeId,
    row: &Row,
    items: &[NodeId],
    config: &LayoutConfig,
) {
    let side_of = |tree: &NodeTree, id: NodeId| tree.get(id).float_side();
    let left: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|id| side_of(tree, *id) == Some(FloatSide::Left))
        .collect();
    let right: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|id| side_of(tree, *id) == Some(FloatSide::Right))
        .collect();
    let rtl = tree.get(parent).rtl;
    let mut flow: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|id| side_of(tree, *id).is_none())
        .collect();
    if rtl {
        flow.sort_by(|a, b| tree.get(*b).bounds.left().total_cmp(&tree.get(*a).bounds.left()));
    }

    for (floats, first, next) in [
        (&left, AnchorPosition::Left, AnchorPosition::LeftRight),
        (&right, AnchorPosition::Right, AnchorPosition::RightLeft),
    ] {
        let mut prev: Option<NodeId> = None;
        for &id in floats.iter() {
            match prev {
                None => link(tree, parent, id, first, AnchorTarget::Parent, config),
                Some(p) => link(tree, parent, id, next, AnchorTarget::Node(p), config),
            }
            prev = Some(id);
        }
    }

    let Some(&first) = flow.first() else {
        return;
    };
    let slot = row.slot_of(first).map(|s| (s, side_of(tree, s)));
    let left_limit = left
        .last()
        .copied()
        .or_else(|| slot.and_then(|(s, side)| (side == Some(FloatSide::Left)).then_some(s)))
        .map_or(AnchorTarget::Parent, AnchorTarget::Node);
    let right_limit = right
        .last()
        .copied()
        .or_else(|| slot.and_then(|(s, side)| (side == Some(FloatSide::Right)).then_some(s)))
        .map_or(AnchorTarget::Parent, AnchorTarget::Node);
    let (start, end) = if rtl {
        (right_limit, left_limit)
    } else {
        (left_limit, right_limit)
    };

    let available = allocate_sizing(tree, parent, &flow, Axis::Horizontal, config);
    trace!("row under '{}' leaves {} of the width", tree.get(parent).name, available);
    chain(tree, parent, &flow, Axis::Horizontal, start, Some(end), rtl, config);
}

/// Anchor a row member vertically, leaving out the layout margin the
/// baseline pass put on a row driver
fn link_vertical(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    position: AnchorPosition,
    target: AnchorTarget,
    config: &LayoutConfig,
) {
    let margin = measured(tree, parent, id, position, target)
        - tree.get(id).params.margin.get(position.source_edge());
    set_anchor(tree, id, position, target, margin, config);
}

/// Stack a row under the previous one.
///
/// The topmost member hangs from the lowest member of the previous row and
/// the rest of the row hangs from the topmost member. Members that clear
/// floats of earlier rows hang from a barrier instead.
fn place_row_vertically(
    tree: &mut NodeTree,
    parent: NodeId,
    items: &[NodeId],
    previous: Option<&[NodeId]>,
    floats_seen: &[NodeId],
    single_row: bool,
    ctx: &mut SynthContext,
) {
    let config = ctx.config;
    let alignment = align_row(tree, parent, items, previous.is_none(), single_row, config);
    let placed: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|id| match alignment {
            Some(a) => *id == a.driver || !tree.get(*id).inline_vertical(),
            None => true,
        })
        .collect();

    let Some(previous) = previous else {
        for id in placed {
            link_vertical(tree, parent, id, AnchorPosition::Top, AnchorTarget::Parent, config);
        }
        return;
    };
    let Some(above) = lowest(tree, previous) else {
        return;
    };

    let mut stacked = Vec::with_capacity(placed.len());
    for id in placed {
        if let Some(side) = ctx.clear_map.get(id) {
            let mut referenced = vec![above];
            referenced.extend(floats_seen.iter().copied().filter(|f| {
                *f != above && tree.get(*f).float_side().is_some_and(|s| side.clears(s))
            }));
            if referenced.len() > 1 {
                if let Some(barrier) = add_barrier(tree, parent, id, Edge::Bottom, &referenced, ctx) {
                    link_vertical(tree, parent, id, AnchorPosition::TopBottom, AnchorTarget::Helper(barrier), config);
                    continue;
                }
            }
        }
        stacked.push(id);
    }

    let topmost = stacked
        .iter()
        .copied()
        .min_by(|a, b| tree.get(*a).bounds.top().total_cmp(&tree.get(*b).bounds.top()));
    let Some(topmost) = topmost else {
        return;
    };
    link_vertical(tree, parent, topmost, AnchorPosition::TopBottom, AnchorTarget::Node(above), config);
    for id in stacked {
        if id != topmost {
            link_vertical(tree, parent, id, AnchorPosition::Top, AnchorTarget::Node(topmost), config);
        }
    }
}

fn synthesize_relative(tree: &mut NodeTree, parent: NodeId, children: &[NodeId], ctx: &mut SynthContext) {
    let config = ctx.config;
    let partition = partition_rows(tree, ctx.clear_map, parent, children, config.edge_tolerance);
    let (first, next) = if tree.get(parent).rtl {
        (AnchorPosition::Right, AnchorPosition::RightLeft)
    } else {
        (AnchorPosition::Left, AnchorPosition::LeftRight)
    };
    let mut above: Option<NodeId> = None;
    for (index, row) in partition.rows.iter().enumerate() {
        let items = row_items(tree, row, index);
        let mut prev: Option<NodeId> = None;
        for &id in &items {
            match prev {
                None => link(tree, parent, id, first, AnchorTarget::Parent, config),
                Some(p) => link(tree, parent, id, next, AnchorTarget::Node(p), config),
            }
            match above {
                None => link(tree, parent, id, AnchorPosition::Top, AnchorTarget::Parent, config),
                Some(a) => link(tree, parent, id, AnchorPosition::TopBottom, AnchorTarget::Node(a), config),
            }
            prev = Some(id);
        }
        if let Some(low) = lowest(tree, &items) {
            above = Some(low);
        }
    }
    for &id in &partition.off_flow {
        link(tree, parent, id, AnchorPosition::Left, AnchorTarget::Parent, config);
        link(tree, parent, id, AnchorPosition::Top, AnchorTarget::Parent, config);
    }
    allocate_sizing(tree, parent, children, Axis::Horizontal, config);
    allocate_sizing(tree, parent, children, Axis::Vertical, config);
}

fn synthesize_linear(
    tree: &mut NodeTree,
    parent: NodeId,
    children: &[NodeId],
    orientation: Orientation,
    config: &LayoutConfig,
) {
    let axis = match orientation {
        Orientation::Horizontal => Axis::Horizontal,
        Orientation::Vertical => Axis::Vertical,
    };
    let cross = axis.other();
    if axis == Axis::Horizontal {
        let baseline = tree.get(parent).flags.contains(AlignmentFlags::BASELINE);
        tree.get_mut(parent).params.baseline_aligned = Some(baseline);
    }
    allocate_sizing(tree, parent, children, axis, config);
    allocate_sizing(tree, parent, children, cross, config);

    let content = tree.get(parent).content();
    let rtl = tree.get(parent).rtl;
    // a right-to-left row advances from the end edge
    let mirrored = rtl && axis == Axis::Horizontal;
    let (lead_edge, mut cursor) = if mirrored {
        (axis.end_edge(), content.end(axis))
    } else {
        (axis.start_edge(), content.start(axis))
    };
    for &id in children {
        if tree.get(id).is_line_break() {
            collapse_line_break(tree, id);
            continue;
        }
        let node = tree.get(id);
        let bounds = node.bounds;
        let gravity = match axis {
            Axis::Horizontal => match node.vertical_align {
                VerticalAlign::Middle => Some(Gravity::Center),
                VerticalAlign::Bottom | VerticalAlign::TextBottom => Some(Gravity::End),
                VerticalAlign::Top | VerticalAlign::TextTop => Some(Gravity::Start),
                _ => None,
            },
            Axis::Vertical if node.center_aligned() => Some(Gravity::Center),
            Axis::Vertical if node.right_aligned() || rtl => Some(Gravity::End),
            Axis::Vertical => None,
        };
        let percent = node.percent(axis);
        let leading = if mirrored {
            let gap = cursor - bounds.end(axis);
            cursor = bounds.start(axis);
            gap
        } else {
            let gap = bounds.start(axis) - cursor;
            cursor = bounds.end(axis);
            gap
        };

        let params = &mut tree.get_mut(id).params;
        params.margin.set(lead_edge, config.truncate(leading));
        match gravity {
            Some(Gravity::End) => params.margin.set(
                cross.end_edge(),
                config.truncate(content.end(cross) - bounds.end(cross)),
            ),
            Some(Gravity::Center) => {}
            Some(Gravity::Start) | None => params.margin.set(
                cross.start_edge(),
                config.truncate(bounds.start(cross) - content.start(cross)),
            ),
        }
        params.gravity = gravity;
        if let Some(p) = percent {
            let weight = config.truncate(p);
            params.set_weight(axis, weight);
            params.set_sizing(axis, Sizing::Weighted(weight));
        }
        mark_resolved(tree, id);
    }
}

fn synthesize_frame(tree: &mut NodeTree, parent: NodeId, children: &[NodeId], config: &LayoutConfig) {
    let content = tree.get(parent).content();
    let rtl = tree.get(parent).rtl;
    allocate_sizing(tree, parent, children, Axis::Horizontal, config);
    allocate_sizing(tree, parent, children, Axis::Vertical, config);
    for &id in children {
        let node = tree.get(id);
        if node.is_line_break() {
            collapse_line_break(tree, id);
            continue;
        }
        let bounds = node.bounds;
        let gravity = match node.float_side() {
            Some(FloatSide::Left) => Gravity::Start,
            Some(FloatSide::Right) => Gravity::End,
            None if node.center_aligned() => Gravity::Center,
            None if node.right_aligned() || rtl => Gravity::End,
            None => Gravity::Start,
        };
        let params = &mut tree.get_mut(id).params;
        params.gravity = Some(gravity);
        match gravity {
            Gravity::Start => params.margin.left = config.truncate(bounds.left() - content.left()),
            Gravity::End => params.margin.right = config.truncate(content.right() - bounds.right()),
            Gravity::Center => {}
        }
        params.margin.top = config.truncate(bounds.top() - content.top());
        mark_resolved(tree, id);
    }
}

/// Distinct coordinates, merged within `tolerance`
fn distinct(mut values: Vec<f64>, tolerance: f64) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|b, a| (*b - *a).abs() <= tolerance);
    values
}

/// Track index of `value` among the distinct track starts
fn grid_track(tracks: &[f64], value: f64, tolerance: f64) -> Option<usize> {
    tracks.iter().position(|v| (v - value).abs() <= tolerance)
}

/// Record the grid cell of `id`; a box off every track is reported instead
fn place_cell(tree: &mut NodeTree, id: NodeId, rows: &[f64], columns: &[f64], ctx: &mut SynthContext) -> bool {
    let tolerance = ctx.config.edge_tolerance;
    let bounds = tree.get(id).bounds;
    let row = grid_track(rows, bounds.top(), tolerance);
    let column = grid_track(columns, bounds.left(), tolerance);
    let (Some(row), Some(column)) = (row, column) else {
        let axis = if row.is_none() { Axis::Vertical } else { Axis::Horizontal };
        ctx.fail(
            tree,
            id,
            axis,
            format!("no grid track at ({}, {})", bounds.left(), bounds.top()),
        );
        return false;
    };
    let node = tree.get_mut(id);
    node.params.grid_cell = Some((row, column));
    node.row = Some(row);
    true
}

fn synthesize_grid(tree: &mut NodeTree, parent: NodeId, children: &[NodeId], ctx: &mut SynthContext) {
    let tolerance = ctx.config.edge_tolerance;
    let cells: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|id| !tree.get(*id).is_line_break())
        .collect();
    let columns = distinct(cells.iter().map(|id| tree.get(*id).bounds.left()).collect(), tolerance);
    let rows = distinct(cells.iter().map(|id| tree.get(*id).bounds.top()).collect(), tolerance);
    for &id in children {
        if tree.get(id).is_line_break() {
            collapse_line_break(tree, id);
            continue;
        }
        if place_cell(tree, id, &rows, &columns, ctx) {
            mark_resolved(tree, id);
        }
    }
    tree.get_mut(parent).params.grid_columns = Some(columns.len());
}

/// Split flex items into lines along the cross axis
fn flex_lines(tree: &NodeTree, items: &[NodeId], wrap: bool, cross: Axis, tolerance: f64) -> Vec<Vec<NodeId>> {
    if !wrap {
        return vec![items.to_vec()];
    }
    let mut lines: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    let mut line_end = f64::NEG_INFINITY;
    for &id in items {
        let b = tree.get(id).linear();
        if !current.is_empty() && b.start(cross) >= line_end - tolerance {
            lines.push(std::mem::take(&mut current));
            line_end = f64::NEG_INFINITY;
        }
        line_end = line_end.max(b.end(cross));
        current.push(id);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn synthesize_flex(tree: &mut NodeTree, parent: NodeId, children: &[NodeId], ctx: &mut SynthContext) {
    let Some(flex) = tree.get(parent).flex_container else {
        synthesize_rows(tree, parent, children, ctx);
        return;
    };
    let config = ctx.config;
    let main = flex.direction.main_axis();
    let cross = main.other();
    let rtl = main == Axis::Horizontal && tree.get(parent).rtl;

    let mut items = Vec::new();
    let mut off_flow = Vec::new();
    for &id in children {
        let node = tree.get(id);
        if node.is_line_break() {
            collapse_line_break(tree, id);
        } else if node.page_flow() {
            items.push(id);
        } else {
            off_flow.push(id);
        }
    }

    let lines = flex_lines(tree, &items, flex.wrap, cross, config.edge_tolerance);
    let single_line = lines.len() == 1;
    let mut previous_tallest: Option<NodeId> = None;
    for (index, line) in lines.iter().enumerate() {
        allocate_sizing(tree, parent, line, main, config);
        allocate_sizing(tree, parent, line, cross, config);
        let weights = adjust_grow_ratio(tree, parent, line, main, config);
        let mut ordered = line.clone();
        if rtl {
            ordered.sort_by(|a, b| tree.get(*b).bounds.left().total_cmp(&tree.get(*a).bounds.left()));
        }
        let Some(head) = chain(
            tree,
            parent,
            &ordered,
            main,
            AnchorTarget::Parent,
            Some(AnchorTarget::Parent),
            rtl,
            config,
        ) else {
            continue;
        };
        let (style, bias) = match flex.justify {
            JustifyContent::Start => (ChainStyle::Packed, Some(0.0)),
            JustifyContent::Center => (ChainStyle::Packed, Some(0.5)),
            JustifyContent::End => (ChainStyle::Packed, Some(1.0)),
            JustifyContent::SpaceBetween => (ChainStyle::SpreadInside, None),
            JustifyContent::SpaceAround | JustifyContent::SpaceEvenly => (ChainStyle::Spread, None),
        };
        let style = if weights.is_empty() { style } else { ChainStyle::Spread };
        let params = &mut tree.get_mut(head).params;
        params.set_chain_style(main, style);
        if let Some(bias) = bias {
            params.set_bias(main, if rtl { 1.0 - bias } else { bias });
        }

        let tallest = line
            .iter()
            .copied()
            .fold(None::<(NodeId, f64)>, |best, id| {
                let size = tree.get(id).linear().size(cross);
                match best {
                    Some((_, s)) if s >= size => best,
                    _ => Some((id, size)),
                }
            })
            .map(|(id, _)| id);
        let Some(tallest) = tallest else {
            continue;
        };
        let baseline_ref = line.iter().copied().find(|id| {
            tree.get(*id).flex.align_self.unwrap_or(flex.align_items) == AlignItems::Baseline
        });

        for &id in line {
            tree.get_mut(id).row = Some(index);
            let mut align = tree.get(id).flex.align_self.unwrap_or(flex.align_items);
            if align == AlignItems::Baseline && main != Axis::Horizontal {
                align = AlignItems::Start;
            }
            let reference = if single_line {
                AnchorTarget::Parent
            } else if id == tallest {
                match previous_tallest {
                    None => link(tree, parent, id, AnchorPosition::start(cross), AnchorTarget::Parent, config),
                    Some(p) => link(tree, parent, id, AnchorPosition::after(cross), AnchorTarget::Node(p), config),
                }
                continue;
            } else {
                AnchorTarget::Node(tallest)
            };
            align_cross(tree, parent, id, cross, align, reference, baseline_ref, config);
        }
        previous_tallest = Some(tallest);
    }

    for &id in &off_flow {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            add_guideline(tree, parent, id, axis, ctx);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn align_cross(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    cross: Axis,
    align: AlignItems,
    reference: AnchorTarget,
    baseline_ref: Option<NodeId>,
    config: &LayoutConfig,
) {
    let start = AnchorPosition::start(cross);
    let end = AnchorPosition::end(cross);
    match align {
        AlignItems::Start => link(tree, parent, id, start, reference, config),
        AlignItems::End => link(tree, parent, id, end, reference, config),
        AlignItems::Center => {
            set_anchor(tree, id, start, reference, 0.0, config);
            set_anchor(tree, id, end, reference, 0.0, config);
            let frame = match reference {
                AnchorTarget::Node(t) => tree.get(t).bounds,
                _ => tree.get(parent).content(),
            };
            let bias = measured_bias(frame, tree.get(id).bounds, cross, config.edge_tolerance)
                .unwrap_or(0.5);
            tree.get_mut(id).params.set_bias(cross, config.truncate(bias));
        }
        AlignItems::Stretch => {
            link(tree, parent, id, start, reference, config);
            link(tree, parent, id, end, reference, config);
            tree.get_mut(id).params.set_sizing(cross, Sizing::MatchConstraint);
        }
        AlignItems::Baseline => {
            let target = match reference {
                AnchorTarget::Node(t) => Some(t),
                _ => baseline_ref.filter(|b| *b != id),
            };
            match target {
                Some(t) => {
                    let margin = tree.get(id).baseline() - tree.get(t).baseline();
                    set_anchor(tree, id, AnchorPosition::Baseline, AnchorTarget::Node(t), margin, config);
                }
                None => link(tree, parent, id, start, reference, config),
            }
        }
    }
}

/// Replace every anchor of `id` on `axis` with a direct parent anchor at the
/// measured offset
pub fn anchor_to_parent(tree: &mut NodeTree, parent: NodeId, id: NodeId, axis: Axis, config: &LayoutConfig) {
    tree.get_mut(id).constraint.clear_axis(axis);
    link(tree, parent, id, AnchorPosition::start(axis), AnchorTarget::Parent, config);
}

// ============================================================================
// Resolution sweep
// ============================================================================

/// Nodes positioned by anchors rather than by their container
pub fn anchor_candidates(tree: &NodeTree) -> Vec<NodeId> {
    tree.iter()
        .filter(|node| {
            !node.collapsed
                && node.parent.is_some_and(|p| {
                    matches!(
                        tree.get(p).container,
                        Some(ContainerKind::Constraint | ContainerKind::Relative)
                    )
                })
        })
        .map(|node| node.id)
        .collect()
}

fn reaches_parent(tree: &NodeTree, id: NodeId, axis: Axis) -> bool {
    tree.get(id).constraint.on_axis(axis).any(|(_, anchor)| match anchor.target {
        AnchorTarget::Parent => true,
        AnchorTarget::Node(target) => target != id && tree.get(target).constraint.is_resolved(axis),
        AnchorTarget::Helper(helper) => match &tree.helper(helper).kind {
            HelperKind::Guideline { .. } => true,
            HelperKind::Barrier { edge, referenced } => referenced
                .iter()
                .all(|r| tree.get(*r).constraint.is_resolved(edge.axis())),
        },
    })
}

/// Propagate resolution through the anchor graph until nothing changes.
///
/// Works from a queue of nodes whose dependencies just resolved; each node is
/// revisited at most `max_passes` times. Returns the number of axes resolved.
pub fn evaluate_anchors(tree: &mut NodeTree, max_passes: usize) -> usize {
    let candidates = anchor_candidates(tree);
    let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for &id in &candidates {
        for anchor in tree.get(id).constraint.current.values() {
            match anchor.target {
                AnchorTarget::Node(target) => dependents.entry(target).or_default().push(id),
                AnchorTarget::Helper(helper) => {
                    if let HelperKind::Barrier { referenced, .. } = &tree.helper(helper).kind {
                        for r in referenced {
                            dependents.entry(*r).or_default().push(id);
                        }
                    }
                }
                AnchorTarget::Parent => {}
            }
        }
    }

    let mut queue: VecDeque<NodeId> = candidates.iter().copied().collect();
    let mut visits: HashMap<NodeId, usize> = HashMap::new();
    let mut resolved = 0;
    while let Some(id) = queue.pop_front() {
        let count = visits.entry(id).or_insert(0);
        *count += 1;
        if *count > max_passes {
            continue;
        }
        let mut changed = false;
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if !tree.get(id).constraint.is_resolved(axis) && reaches_parent(tree, id, axis) {
                tree.get_mut(id).constraint.set_resolved(axis, true);
                changed = true;
                resolved += 1;
            }
        }
        if changed {
            if let Some(list) = dependents.get(&id) {
                queue.extend(list.iter().copied());
            }
        }
    }
    debug!("anchor sweep resolved {} axes over {} candidates", resolved, candidates.len());
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::constraint::Anchor;
    use crate::layout::facts::build_tree;
    use crate::parser::parse;

    fn tree(source: &str) -> NodeTree {
        build_tree(&parse(source).expect("sheet should parse")).expect("tree should build")
    }

    struct Harness {
        config: LayoutConfig,
        clear_map: ClearMap,
        guidelines: GuidelineCache,
        failures: Vec<HelperFailure>,
    }

    impl Harness {
        fn new(tree: &NodeTree) -> Self {
            let mut clear_map = ClearMap::new();
            for node in tree.iter() {
                clear_map.register(tree, node.id);
            }
            Self {
                config: LayoutConfig::default(),
                clear_map,
                guidelines: GuidelineCache::new(3),
                failures: Vec::new(),
            }
        }

        fn run(&mut self, tree: &mut NodeTree, parent: NodeId, kind: ContainerKind) {
            tree.get_mut(parent).container = Some(kind);
            let mut ctx = SynthContext {
                config: &self.config,
                clear_map: &self.clear_map,
                guidelines: &mut self.guidelines,
                failures: &mut self.failures,
            };
            synthesize(tree, parent, &mut ctx);
            evaluate_anchors(tree, self.config.max_sweep_passes);
        }
    }

    fn anchor(tree: &NodeTree, name: &str, position: AnchorPosition) -> Option<Anchor> {
        tree.get(tree.find(name).unwrap()).constraint.get(position).copied()
    }

    fn node(tree: &NodeTree, name: &str) -> AnchorTarget {
        AnchorTarget::Node(tree.find(name).unwrap())
    }

    const INLINE_ROW: &str = r#"
        box root [width: 400, height: 20] {
            box a [display: inline-block, width: 100, height: 20]
            box b [display: inline-block, x: 100, width: 150, height: 20]
            box c [display: inline-block, x: 250, width: 120, height: 20]
        }
    "#;

    #[test]
    fn test_row_chains_left_to_right() {
        let mut t = tree(INLINE_ROW);
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        let head = anchor(&t, "a", AnchorPosition::Left).unwrap();
        assert_eq!(head.target, AnchorTarget::Parent);
        assert_eq!(anchor(&t, "b", AnchorPosition::LeftRight).unwrap().target, node(&t, "a"));
        assert_eq!(anchor(&t, "a", AnchorPosition::RightLeft).unwrap().target, node(&t, "b"));
        let tail = anchor(&t, "c", AnchorPosition::Right).unwrap();
        assert_eq!(tail.target, AnchorTarget::Parent);
        assert_eq!(tail.margin, 0.0);

        let a = t.get(t.find("a").unwrap());
        assert_eq!(a.params.horizontal_chain, Some(ChainStyle::Packed));
        assert_eq!(a.params.horizontal_bias, Some(0.0));
        assert_eq!(anchor(&t, "a", AnchorPosition::Top).unwrap().target, AnchorTarget::Parent);
        assert_eq!(anchor(&t, "b", AnchorPosition::Baseline).unwrap().target, node(&t, "a"));
        assert!(t.iter().skip(1).all(|n| n.constraint.anchored()));
    }

    #[test]
    fn test_rtl_row_chains_right_to_left() {
        let mut t = tree(
            r#"
            box root [dir: rtl, width: 400, height: 20] {
                box a [display: inline-block, x: 280, width: 100, height: 20]
                box b [display: inline-block, x: 130, width: 150, height: 20]
                box c [display: inline-block, x: 30, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        let head = anchor(&t, "a", AnchorPosition::Right).unwrap();
        assert_eq!((head.target, head.margin), (AnchorTarget::Parent, 0.0));
        let b = anchor(&t, "b", AnchorPosition::RightLeft).unwrap();
        assert_eq!((b.target, b.margin), (node(&t, "a"), 0.0));
        let c = anchor(&t, "c", AnchorPosition::RightLeft).unwrap();
        assert_eq!((c.target, c.margin), (node(&t, "b"), 0.0));
        assert_eq!(anchor(&t, "a", AnchorPosition::LeftRight).unwrap().target, node(&t, "b"));
        let tail = anchor(&t, "c", AnchorPosition::Left).unwrap();
        assert_eq!((tail.target, tail.margin), (AnchorTarget::Parent, 0.0));
        assert!(anchor(&t, "a", AnchorPosition::Left).is_none());

        // 30 free on the left, 20 on the right
        assert_eq!(t.get(t.find("a").unwrap()).params.horizontal_bias, Some(0.6));
        let report = crate::layout::solver::verify(&t, &h.config).unwrap();
        assert!(report.is_consistent(), "{:?}", report.mismatches);
    }

    #[test]
    fn test_centered_text_bias() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 20, text_align: center] {
                box a [display: inline-block, x: 100, width: 100, height: 20]
                box b [display: inline-block, x: 200, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        let a = t.get(t.find("a").unwrap());
        assert_eq!(a.params.horizontal_bias, Some(0.5));
    }

    #[test]
    fn test_head_margin_clamped_to_css_margin() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, x: 60, margin_left: 10, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        assert_eq!(anchor(&t, "a", AnchorPosition::Left).unwrap().margin, 10.0);
        // (60 - 10) / (400 - 10 - 100)
        assert_eq!(t.get(t.find("a").unwrap()).params.horizontal_bias, Some(0.172));
    }

    #[test]
    fn test_rows_stack_below_lowest_member() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 70] {
                box a [y: 0, width: 200, height: 20]
                box b [y: 30, width: 200, height: 40]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        let link = anchor(&t, "b", AnchorPosition::TopBottom).unwrap();
        assert_eq!(link.target, node(&t, "a"));
        assert_eq!(link.margin, 10.0);
    }

    #[test]
    fn test_row_hangs_from_its_topmost_member() {
        let mut t = tree(
            r#"
            box root [width: 300, height: 80] {
                box a [display: inline-block, width: 100, height: 20]
                box b [display: inline-block, x: 100, y: 4, width: 100, height: 24]
                box f [float: left, y: 30, width: 50, height: 40]
                text t [x: 50, y: 36, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        let f = anchor(&t, "f", AnchorPosition::TopBottom).unwrap();
        assert_eq!(f.target, node(&t, "b"));
        assert_eq!(f.margin, 2.0);
        let below = anchor(&t, "t", AnchorPosition::Top).unwrap();
        assert_eq!(below.target, node(&t, "f"));
        assert_eq!(below.margin, 6.0);
        assert!(anchor(&t, "t", AnchorPosition::TopBottom).is_none());

        let report = crate::layout::solver::verify(&t, &h.config).unwrap();
        assert!(report.is_consistent(), "{:?}", report.mismatches);
    }

    #[test]
    fn test_shifted_members_push_the_driver_down() {
        let mut t = tree(
            r#"
            box root [width: 300, height: 40] {
                text a [y: 10, width: 60, height: 20]
                text up [x: 60, y: 4, width: 30, height: 14, vertical_align: super]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        let a = t.get(t.find("a").unwrap());
        assert_eq!(a.params.margin.top, 6.0);
        assert_eq!(a.constraint.get(AnchorPosition::Top).unwrap().margin, 4.0);
        let up = anchor(&t, "up", AnchorPosition::Baseline).unwrap();
        assert_eq!(up.target, node(&t, "a"));
        assert_eq!(up.margin, -12.0);

        let report = crate::layout::solver::verify(&t, &h.config).unwrap();
        assert!(report.is_consistent(), "{:?}", report.mismatches);
    }

    #[test]
    fn test_flow_chains_from_left_float() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 40] {
                box f [float: left, width: 100, height: 40]
                text t [x: 100, width: 200, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        assert_eq!(anchor(&t, "f", AnchorPosition::Left).unwrap().target, AnchorTarget::Parent);
        assert_eq!(anchor(&t, "t", AnchorPosition::LeftRight).unwrap().target, node(&t, "f"));
        assert_eq!(anchor(&t, "t", AnchorPosition::Right).unwrap().target, AnchorTarget::Parent);
    }

    #[test]
    fn test_clear_uses_barrier() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 70] {
                box f [float: left, width: 100, height: 50]
                box a [x: 100, width: 300, height: 20]
                box c [clear: left, y: 50, width: 400, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        let c = t.get(t.find("c").unwrap());
        let barrier = *c.constraint.barrier.get(&Edge::Bottom).expect("barrier recorded");
        let link = c.constraint.get(AnchorPosition::TopBottom).unwrap();
        assert_eq!(link.target, AnchorTarget::Helper(barrier));
        assert_eq!(link.margin, 0.0);
        assert_eq!(helper_position(&t, barrier), 50.0);
        assert!(c.constraint.anchored());
    }

    #[test]
    fn test_absolute_child_gets_guidelines() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 100] {
                box a [width: 200, height: 20]
                box abs [position: absolute, x: 20, y: 10, width: 5, height: 5]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);

        assert_eq!(t.helpers().len(), 2);
        let offsets: Vec<_> = t
            .helpers()
            .iter()
            .map(|helper| match helper.kind {
                HelperKind::Guideline { axis, offset } => (axis, offset),
                _ => panic!("expected guideline"),
            })
            .collect();
        assert!(offsets.contains(&(Axis::Horizontal, GuidelineOffset::Begin(20.0))));
        assert!(offsets.contains(&(Axis::Vertical, GuidelineOffset::Begin(10.0))));
        let left = anchor(&t, "abs", AnchorPosition::Left).unwrap();
        assert!(matches!(left.target, AnchorTarget::Helper(_)));
        assert!(t.get(t.find("abs").unwrap()).constraint.anchored());
    }

    #[test]
    fn test_guidelines_are_shared() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 100] {
                box a [width: 200, height: 20]
                box p [position: absolute, x: 20, y: 30, width: 5, height: 5]
                box q [position: absolute, x: 20, y: 60, width: 5, height: 5]
            }
            "#,
        );
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);
        assert_eq!(t.helpers().len(), 3);
        assert_eq!(
            anchor(&t, "p", AnchorPosition::Left).unwrap().target,
            anchor(&t, "q", AnchorPosition::Left).unwrap().target
        );
    }

    #[test]
    fn test_guideline_from_end_inset() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 100] {
                box a [width: 200, height: 20]
                box abs [position: absolute, right: 10, top: 30, x: 150, y: 30, width: 40, height: 5]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        let right = anchor(&t, "abs", AnchorPosition::Right).unwrap();
        let AnchorTarget::Helper(helper) = right.target else {
            panic!("expected a guideline target");
        };
        assert_eq!(helper_position(&t, helper), 190.0);
    }

    #[test]
    fn test_guideline_fails_outside_constraint() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 100] {
                box abs [position: absolute, x: 20, y: 10, width: 5, height: 5]
            }
            "#,
        );
        let root = t.root().unwrap();
        let abs = t.find("abs").unwrap();
        let mut h = Harness::new(&t);
        t.get_mut(root).container = Some(ContainerKind::Frame);
        let mut ctx = SynthContext {
            config: &h.config,
            clear_map: &h.clear_map,
            guidelines: &mut h.guidelines,
            failures: &mut h.failures,
        };
        assert!(!add_guideline(&mut t, root, abs, Axis::Horizontal, &mut ctx));
        assert_eq!(h.failures.len(), 1);
        assert_eq!(h.failures[0].node, abs);
        assert!(t.helpers().is_empty());
    }

    #[test]
    fn test_sweep_leaves_cycles_unresolved() {
        let mut t = tree("box root { box a box b }");
        let root = t.root().unwrap();
        t.get_mut(root).container = Some(ContainerKind::Constraint);
        let a = t.find("a").unwrap();
        let b = t.find("b").unwrap();
        t.get_mut(a).constraint.anchor(AnchorPosition::LeftRight, AnchorTarget::Node(b), 0.0);
        t.get_mut(b).constraint.anchor(AnchorPosition::LeftRight, AnchorTarget::Node(a), 0.0);
        t.get_mut(b).constraint.anchor(AnchorPosition::Top, AnchorTarget::Parent, 0.0);
        t.get_mut(a).constraint.anchor(AnchorPosition::TopBottom, AnchorTarget::Node(b), 0.0);

        assert_eq!(evaluate_anchors(&mut t, 8), 2);
        assert!(t.get(b).constraint.vertical);
        assert!(t.get(a).constraint.vertical);
        assert!(!t.get(a).constraint.horizontal);
        assert!(!t.get(b).constraint.horizontal);
    }

    #[test]
    fn test_resynthesis_is_a_no_op() {
        let mut t = tree(INLINE_ROW);
        let root = t.root().unwrap();
        let mut h = Harness::new(&t);
        h.run(&mut t, root, ContainerKind::Constraint);
        let before: Vec<_> = t.iter().map(|n| n.constraint.clone()).collect();
        h.run(&mut t, root, ContainerKind::Constraint);
        let after: Vec<_> = t.iter().map(|n| n.constraint.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_relative_sequence() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 40] {
                box a [display: inline-block, width: 100, height: 20]
                box b [display: inline-block, x: 110, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Relative);
        let link = anchor(&t, "b", AnchorPosition::LeftRight).unwrap();
        assert_eq!(link.target, node(&t, "a"));
        assert_eq!(link.margin, 10.0);
        assert_eq!(anchor(&t, "b", AnchorPosition::Top).unwrap().target, AnchorTarget::Parent);
    }

    #[test]
    fn test_frame_gravity() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f [float: right, x: 300, width: 80, height: 40]
                box b [y: 50, width: 400, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Frame);
        let f = t.get(t.find("f").unwrap());
        assert_eq!(f.params.gravity, Some(Gravity::End));
        assert_eq!(f.params.margin.right, 20.0);
        let b = t.get(t.find("b").unwrap());
        assert_eq!(b.params.gravity, Some(Gravity::Start));
        assert_eq!(b.params.margin.top, 50.0);
        assert!(b.constraint.anchored());
    }

    #[test]
    fn test_linear_vertical_margins() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 60] {
                box a [y: 0, width: 200, height: 20]
                box b [y: 30, width: 100, height: 20, margin_left: auto, margin_right: auto, x: 50]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Linear(Orientation::Vertical));
        let b = t.get(t.find("b").unwrap());
        assert_eq!(b.params.margin.top, 10.0);
        assert_eq!(b.params.gravity, Some(Gravity::Center));
        assert_eq!(t.get(t.find("a").unwrap()).params.width, Sizing::MatchParent);
    }

    #[test]
    fn test_linear_rtl_margins_run_from_the_right() {
        let mut t = tree(
            r#"
            box root [dir: rtl, width: 400, height: 20] {
                box a [display: inline-block, x: 290, width: 100, height: 20]
                box b [display: inline-block, x: 130, width: 150, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Linear(Orientation::Horizontal));
        let margins = |name: &str| {
            let m = t.get(t.find(name).unwrap()).params.margin;
            (m.left, m.right)
        };
        assert_eq!(margins("a"), (0.0, 10.0));
        assert_eq!(margins("b"), (0.0, 10.0));
    }

    #[test]
    fn test_grid_cells() {
        let mut t = tree(
            r#"
            box root [display: grid, width: 200, height: 40] {
                box a [width: 100, height: 20]
                box b [x: 100, width: 100, height: 20]
                box c [y: 20, width: 100, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        Harness::new(&t).run(&mut t, root, ContainerKind::Grid);
        assert_eq!(t.get(root).params.grid_columns, Some(2));
        assert_eq!(t.get(t.find("b").unwrap()).params.grid_cell, Some((0, 1)));
        assert_eq!(t.get(t.find("c").unwrap()).params.grid_cell, Some((1, 0)));
    }

    #[test]
    fn test_cell_off_every_track_is_reported() {
        let mut t = tree(
            r#"
            box root [display: grid, width: 200, height: 40] {
                box a [width: 100, height: 20]
                box b [x: 100, width: 100, height: 20]
            }
            "#,
        );
        assert_eq!(grid_track(&[0.0, 100.0], 100.4, 0.5), Some(1));
        assert_eq!(grid_track(&[0.0, 100.0], 60.0, 0.5), None);

        let b = t.find("b").unwrap();
        let mut h = Harness::new(&t);
        let mut ctx = SynthContext {
            config: &h.config,
            clear_map: &h.clear_map,
            guidelines: &mut h.guidelines,
            failures: &mut h.failures,
        };
        assert!(!place_cell(&mut t, b, &[0.0], &[0.0], &mut ctx));
        assert_eq!(t.get(b).params.grid_cell, None);
        assert_eq!(h.failures.len(), 1);
        assert_eq!(h.failures[0].node, b);
        assert_eq!(h.failures[0].axis, Axis::Horizontal);
        assert!(h.failures[0].reason.contains("no grid track"));
    }

    #[test]
    fn test_flex_center_and_stretch() {
        let mut t = tree(
            r#"
            box root [flex: row, justify: center, width: 300, height: 40] {
                box a [x: 50, width: 100, height: 40]
                box b [x: 150, width: 100, height: 40]
            }
            "#,
        );
        let root = t.root().unwrap();
        t.get_mut(root).flags = AlignmentFlags::FLEX | AlignmentFlags::HORIZONTAL;
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        let a = t.get(t.find("a").unwrap());
        assert_eq!(a.params.horizontal_chain, Some(ChainStyle::Packed));
        assert_eq!(a.params.horizontal_bias, Some(0.5));
        assert_eq!(a.params.height, Sizing::MatchConstraint);
        assert_eq!(a.constraint.get(AnchorPosition::Top).unwrap().target, AnchorTarget::Parent);
        assert_eq!(a.constraint.get(AnchorPosition::Bottom).unwrap().target, AnchorTarget::Parent);
    }

    #[test]
    fn test_flex_wrapped_lines_hang_from_tallest() {
        let mut t = tree(
            r#"
            box root [flex: row, wrap: true, align_items: start, width: 200, height: 70] {
                box a [width: 100, height: 30]
                box b [x: 100, width: 100, height: 20]
                box c [y: 30, width: 100, height: 40]
            }
            "#,
        );
        let root = t.root().unwrap();
        t.get_mut(root).flags = AlignmentFlags::FLEX | AlignmentFlags::HORIZONTAL | AlignmentFlags::MULTILINE;
        Harness::new(&t).run(&mut t, root, ContainerKind::Constraint);
        assert_eq!(anchor(&t, "a", AnchorPosition::Top).unwrap().target, AnchorTarget::Parent);
        assert_eq!(anchor(&t, "b", AnchorPosition::Top).unwrap().target, node(&t, "a"));
        assert_eq!(anchor(&t, "c", AnchorPosition::TopBottom).unwrap().target, node(&t, "a"));
        assert_eq!(t.get(t.find("c").unwrap()).row, Some(1));
    }
}
