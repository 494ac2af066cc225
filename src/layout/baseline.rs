//! Baseline selection and inline vertical alignment for one row

use log::trace;

use super::config::LayoutConfig;
use super::constraint::{AnchorPosition, AnchorTarget};
use super::types::{Axis, Node, NodeId, NodeTree, VerticalAlign};

/// Outcome of aligning a row on its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAlignment {
    /// Member that receives the row's own vertical placement
    pub driver: NodeId,
    /// Selected text baseline
    pub baseline: NodeId,
}

fn on_baseline(node: &Node) -> bool {
    node.inline_vertical() && node.baseline_eligible && node.vertical_align == VerticalAlign::Baseline
}

fn tallest<'a>(tree: &NodeTree, ids: impl Iterator<Item = &'a NodeId>) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for &id in ids {
        let height = tree.get(id).effective_height();
        if best.map_or(true, |(_, h)| height > h) {
            best = Some((id, height));
        }
    }
    best.map(|(id, _)| id)
}

/// Pick the row's baseline: the tallest text on the baseline, otherwise the
/// tallest eligible element.
pub fn select_baseline(tree: &NodeTree, members: &[NodeId]) -> Option<NodeId> {
    tallest(
        tree,
        members.iter().filter(|id| {
            let node = tree.get(**id);
            node.is_text() && on_baseline(node)
        }),
    )
    .or_else(|| tallest(tree, members.iter().filter(|id| on_baseline(tree.get(**id)))))
}

/// Image taller than the baseline that the rest of the row hangs from.
///
/// Images are visited in order; a taller image displaces the current one.
fn image_driver(tree: &NodeTree, members: &[NodeId], baseline: NodeId) -> Option<NodeId> {
    let mut height = tree.get(baseline).effective_height();
    let mut driver: Option<NodeId> = None;
    for &id in members {
        let node = tree.get(id);
        if id == baseline || !node.is_image() || !on_baseline(node) {
            continue;
        }
        if node.effective_height() > height {
            if let Some(previous) = driver {
                trace!(
                    "image '{}' displaces '{}' as row baseline",
                    node.name,
                    tree.get(previous).name
                );
            }
            height = node.effective_height();
            driver = Some(id);
        }
    }
    driver
}

/// Align the inline members of a row against a shared baseline.
///
/// Every inline member except the returned driver is anchored here; the
/// caller places the driver and any block-level members.
pub fn align_row(
    tree: &mut NodeTree,
    parent: NodeId,
    members: &[NodeId],
    first_row: bool,
    single_row: bool,
    config: &LayoutConfig,
) -> Option<RowAlignment> {
    let inline: Vec<NodeId> = members
        .iter()
        .copied()
        .filter(|id| tree.get(*id).inline_vertical())
        .collect();
    if inline.len() < 2 {
        return None;
    }
    let baseline = select_baseline(tree, &inline)?;
    let driver = if config.image_baseline {
        image_driver(tree, &inline, baseline).unwrap_or(baseline)
    } else {
        baseline
    };

    for &id in &inline {
        if id != driver {
            align_member(tree, parent, id, driver, baseline, first_row, single_row, config);
        }
    }
    apply_overshoot(tree, driver, &inline, config);
    trace!(
        "row baseline '{}' driven by '{}'",
        tree.get(baseline).name,
        tree.get(driver).name
    );
    Some(RowAlignment { driver, baseline })
}

#[allow(clippy::too_many_arguments)]
fn align_member(
    tree: &mut NodeTree,
    parent: NodeId,
    id: NodeId,
    driver: NodeId,
    baseline: NodeId,
    first_row: bool,
    single_row: bool,
    config: &LayoutConfig,
) {
    let node = tree.get(id);
    let bounds = node.bounds;
    let driver_box = tree.get(driver).bounds;
    let baseline_box = tree.get(baseline).bounds;
    let parent_box = tree.get(parent).content();
    let align = node.vertical_align;
    let is_image = node.is_image();

    let constraint = &mut tree.get_mut(id).constraint;
    match align {
        VerticalAlign::Top if first_row => {
            constraint.anchor(
                AnchorPosition::Top,
                AnchorTarget::Parent,
                config.truncate(bounds.top() - parent_box.top()),
            );
        }
        VerticalAlign::Top => {
            constraint.anchor(
                AnchorPosition::Top,
                AnchorTarget::Node(driver),
                config.truncate(bounds.top() - driver_box.top()),
            );
        }
        VerticalAlign::TextTop => {
            constraint.anchor(
                AnchorPosition::Top,
                AnchorTarget::Node(baseline),
                config.truncate(bounds.top() - baseline_box.top()),
            );
        }
        VerticalAlign::Middle => {
            let (target, reference) = if single_row {
                (AnchorTarget::Parent, parent_box)
            } else {
                (AnchorTarget::Node(driver), driver_box)
            };
            constraint.anchor(AnchorPosition::Top, target, 0.0);
            constraint.anchor(AnchorPosition::Bottom, target, 0.0);
            let slack = reference.height - bounds.height;
            let bias = if slack > config.edge_tolerance {
                ((bounds.top() - reference.top()) / slack).clamp(0.0, 1.0)
            } else {
                0.5
            };
            tree.get_mut(id)
                .params
                .set_bias(Axis::Vertical, config.truncate(bias));
        }
        VerticalAlign::Bottom => {
            constraint.anchor(
                AnchorPosition::Bottom,
                AnchorTarget::Node(driver),
                config.truncate(driver_box.bottom() - bounds.bottom()),
            );
        }
        VerticalAlign::TextBottom => {
            constraint.anchor(
                AnchorPosition::Bottom,
                AnchorTarget::Node(baseline),
                config.truncate(baseline_box.bottom() - bounds.bottom()),
            );
        }
        VerticalAlign::Baseline
        | VerticalAlign::Sub
        | VerticalAlign::Super
        | VerticalAlign::Length(_) => {
            let target = if id == baseline || (is_image && config.image_baseline) {
                driver
            } else {
                baseline
            };
            // offset between the measured baselines
            let margin = tree.get(id).baseline() - tree.get(target).baseline();
            trace!(
                "'{}' sits {} off the baseline ({:?})",
                tree.get(id).name,
                margin,
                align
            );
            tree.get_mut(id).constraint.anchor(
                AnchorPosition::Baseline,
                AnchorTarget::Node(target),
                config.truncate(margin),
            );
        }
    }
}

/// Room a row needs above and below its driver for members shifted off the
/// baseline.
///
/// Only sub, super and length shifts count; members aligned by their box
/// edges already sit inside the row. The result replaces whatever the driver
/// carried before, so running the pass again leaves it unchanged.
fn apply_overshoot(tree: &mut NodeTree, driver: NodeId, members: &[NodeId], config: &LayoutConfig) {
    let driver_box = tree.get(driver).bounds;
    let mut above = 0.0_f64;
    let mut below = 0.0_f64;
    for &id in members {
        let node = tree.get(id);
        if id == driver || !node.vertical_align.is_shift() {
            continue;
        }
        above = above.max(driver_box.top() - node.bounds.top());
        below = below.max(node.bounds.bottom() - driver_box.bottom());
    }
    let margin = &mut tree.get_mut(driver).params.margin;
    margin.top = config.truncate(above);
    margin.bottom = config.truncate(below);
}
