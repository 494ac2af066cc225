//! Container-type classifier
//!
//! Picks one [`ContainerKind`] and a set of [`AlignmentFlags`] for a parent and
//! its children. The decision is an ordered table of `(name, predicate,
//! outcome)` rules; the first matching predicate wins and the last rule always
//! matches.

use std::collections::HashSet;

use log::debug;

use super::config::LayoutConfig;
use super::partition::{box_width, partition_rows, ClearMap};
use super::types::{
    AlignmentFlags, ContainerKind, Display, FlexDirection, FloatSide, Node, NodeId, NodeTree,
    Orientation, TextAlign, VerticalAlign,
};

/// Classification result for one parent
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub parent: NodeId,
    pub kind: ContainerKind,
    pub flags: AlignmentFlags,
    /// Name of the rule that decided
    pub rule: &'static str,
    /// Runs of children to wrap into groups before synthesis
    pub wraps: Vec<Vec<NodeId>>,
    /// Children folded into the parent
    pub collapse: Vec<NodeId>,
}

impl Layout {
    fn new(parent: NodeId) -> Self {
        Self {
            parent,
            kind: ContainerKind::Constraint,
            flags: AlignmentFlags::UNKNOWN,
            rule: "fallback",
            wraps: Vec::new(),
            collapse: Vec::new(),
        }
    }

    fn set(&mut self, kind: ContainerKind, flags: AlignmentFlags) {
        self.kind = kind;
        self.flags = flags;
    }
}

/// Read-only view of the group being classified
pub struct Group<'a> {
    tree: &'a NodeTree,
    clear_map: &'a ClearMap,
    parent: NodeId,
    children: &'a [NodeId],
    flow: Vec<NodeId>,
    off_flow: Vec<NodeId>,
    sides: Vec<FloatSide>,
    tolerance: f64,
}

impl<'a> Group<'a> {
    pub fn new(
        tree: &'a NodeTree,
        clear_map: &'a ClearMap,
        parent: NodeId,
        tolerance: f64,
    ) -> Self {
        let children = tree.children(parent);
        let (flow, off_flow): (Vec<NodeId>, Vec<NodeId>) =
            children.iter().partition(|id| tree.get(**id).page_flow());
        let mut sides = Vec::new();
        for id in &flow {
            if let Some(side) = tree.get(*id).float_side() {
                if !sides.contains(&side) {
                    sides.push(side);
                }
            }
        }
        Self {
            tree,
            clear_map,
            parent,
            children,
            flow,
            off_flow,
            sides,
            tolerance,
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.flow.iter().map(|id| self.tree.get(*id))
    }

    /// Children that are not line breaks
    fn real(&self) -> Vec<NodeId> {
        self.children
            .iter()
            .copied()
            .filter(|id| !self.tree.get(*id).is_line_break())
            .collect()
    }

    fn has_floats(&self) -> bool {
        !self.sides.is_empty()
    }

    /// Consecutive flow children share a line in writing direction
    pub fn linear_x(&self) -> bool {
        let rtl = self.tree.get(self.parent).rtl;
        self.flow.windows(2).all(|pair| {
            let a = self.tree.get(pair[0]).linear();
            let b = self.tree.get(pair[1]).linear();
            let advances = if rtl {
                b.right() <= a.right() + self.tolerance
            } else {
                b.left() >= a.left() - self.tolerance
            };
            b.top() < a.bottom() - self.tolerance && b.bottom() > a.top() + self.tolerance && advances
        })
    }

    /// Consecutive flow children stack top to bottom
    pub fn linear_y(&self) -> bool {
        self.flow.len() > 1
            && self.flow.windows(2).all(|pair| {
                let a = self.tree.get(pair[0]).linear();
                let b = self.tree.get(pair[1]).linear();
                b.top() >= a.bottom() - self.tolerance
            })
    }

    /// Pairwise vertical stacking that lets floats and clears break the line
    fn aligned_vertically(&self) -> bool {
        self.flow.windows(2).all(|pair| {
            let a = self.tree.get(pair[0]);
            let b = self.tree.get(pair[1]);
            b.linear().top() >= a.linear().bottom() - self.tolerance
                || self.clear_map.contains(b.id)
                || a.is_line_break()
                || (a.floating() && b.block_static())
        })
    }

    fn line_break_inside(&self) -> bool {
        let last_real = self
            .children
            .iter()
            .rposition(|id| !self.tree.get(*id).is_line_break());
        match last_real {
            Some(last) => self.children[..last]
                .iter()
                .any(|id| self.tree.get(*id).is_line_break()),
            None => false,
        }
    }

    fn adjacent_inline_runs(&self) -> bool {
        self.flow.windows(2).any(|pair| {
            self.tree.get(pair[0]).inline_flow() && self.tree.get(pair[1]).inline_flow()
        })
    }

    /// Float-merge frame test
    pub fn float_merge_frame(&self) -> bool {
        if self.sides.is_empty() || self.sides.len() > 2 {
            return false;
        }
        let parent = self.tree.get(self.parent);
        let centered = parent.text_align == TextAlign::Center
            && self.nodes().any(|n| !n.floating() && !n.block_static());
        let right_only = self.sides == [FloatSide::Right]
            && self.nodes().any(|n| !n.floating())
            && !self.linear_x();
        let leading_float = self.nodes().next().is_some_and(|n| n.floating())
            && (self.linear_y()
                || self
                    .nodes()
                    .skip(1)
                    .any(|n| n.block_static() || n.is_line_break()));
        let both_sides = self.sides.len() == 2
            && (self.linear_y()
                || self.nodes().any(|n| !n.inline_flow() && !n.floating())
                || self.nodes().next().is_some_and(|n| n.is_line_break()));
        centered || right_only || leading_float || both_sides
    }

    /// Constraint-horizontal test
    pub fn constraint_horizontal(&self) -> bool {
        if self.flow.len() < 2 {
            return false;
        }
        if self.sides.len() == 2 && self.flow.iter().any(|id| self.clear_map.contains(*id)) {
            return false;
        }
        let left_aligned = self.nodes().any(|n| {
            n.float_side() == Some(FloatSide::Left)
                || (n.auto_margin.right && !n.auto_margin.left)
        });
        let right_aligned = self.nodes().any(|n| n.right_aligned());
        if left_aligned && right_aligned {
            return false;
        }
        let parent_height = self.tree.get(self.parent).has_height();
        self.nodes().any(|n| {
            n.block_static()
                || n.percent_width().is_some_and(|p| p > 0.0 && p < 1.0)
                || n.margin.top < 0.0
                || (n.vertical_align == VerticalAlign::Bottom && !parent_height)
        })
    }

    /// Linear-horizontal test
    pub fn linear_horizontal(&self) -> bool {
        let Some(first) = self.nodes().next() else {
            return false;
        };
        let (font_size, line_height) = (first.font_size, first.line_height);
        let uniform = self.nodes().all(|n| {
            n.line_height == 0.0 && n.font_size == font_size && n.line_height == line_height
        });
        let left_only = self.sides.iter().all(|side| *side == FloatSide::Left);
        let plain = self
            .nodes()
            .all(|n| !n.is_control() && !n.position_relative());
        if !(uniform && left_only && plain && self.off_flow.is_empty()) {
            return false;
        }
        let width: f64 = self.nodes().map(|n| n.linear().width).sum();
        width < box_width(self.tree, self.parent)
    }
}

type Predicate = fn(&Group) -> bool;
type Outcome = fn(&Group, &mut Layout, &LayoutConfig);

struct Rule {
    name: &'static str,
    applies: Predicate,
    outcome: Outcome,
}

const RULES: &[Rule] = &[
    Rule {
        name: "grid",
        applies: |g| {
            matches!(
                g.tree.get(g.parent).display,
                Display::Grid | Display::Table
            )
        },
        outcome: |_, layout, _| layout.set(ContainerKind::Grid, AlignmentFlags::empty()),
    },
    Rule {
        name: "flex",
        applies: |g| g.tree.get(g.parent).flex_container.is_some(),
        outcome: flex_outcome,
    },
    Rule {
        name: "absolute",
        applies: |g| {
            let float_consensus =
                !g.flow.is_empty() && g.sides.len() == 1 && g.nodes().all(|n| n.floating());
            !g.off_flow.is_empty() && !float_consensus
        },
        outcome: |_, layout, _| {
            layout.set(
                ContainerKind::Constraint,
                AlignmentFlags::ABSOLUTE | AlignmentFlags::UNKNOWN,
            )
        },
    },
    Rule {
        name: "single",
        applies: |g| g.real().len() == 1 && g.off_flow.is_empty(),
        outcome: single_outcome,
    },
    Rule {
        name: "line-break",
        applies: |g| g.line_break_inside(),
        outcome: |g, layout, config| {
            vertical_outcome(g, layout, config);
            layout.flags |= AlignmentFlags::MULTILINE;
        },
    },
    Rule {
        name: "float-constraint",
        applies: |g| {
            g.has_floats()
                && g.nodes().any(|n| !n.floating())
                && g.nodes().filter(|n| !n.is_line_break()).all(|n| {
                    n.floating()
                        || n.auto_margin_horizontal()
                        || (n.inline_flow() && n.has_width() && !n.is_control())
                        || n.is_image()
                        || n.has_negative_margin()
                })
        },
        outcome: |g, layout, _| {
            let mut flags = AlignmentFlags::FLOAT;
            if g.nodes().any(|n| n.block_static()) {
                flags |= AlignmentFlags::BLOCK;
            }
            layout.set(ContainerKind::Constraint, flags);
        },
    },
    Rule {
        name: "linear-x",
        applies: |g| g.flow.len() > 1 && g.linear_x(),
        outcome: horizontal_outcome,
    },
    Rule {
        name: "linear-y",
        applies: |g| g.linear_y(),
        outcome: |g, layout, _| {
            let is_root = g.tree.get(g.parent).parent.is_none();
            if is_root || g.adjacent_inline_runs() {
                layout.set(
                    ContainerKind::Constraint,
                    AlignmentFlags::VERTICAL | AlignmentFlags::UNKNOWN,
                );
            } else {
                layout.set(
                    ContainerKind::Linear(Orientation::Vertical),
                    AlignmentFlags::VERTICAL,
                );
            }
        },
    },
    Rule {
        name: "inline-flow",
        applies: |g| g.nodes().all(|n| n.inline_flow() || n.floating()),
        outcome: |g, layout, config| {
            if g.float_merge_frame() {
                float_frame_outcome(g, layout);
            } else {
                vertical_outcome(g, layout, config);
            }
        },
    },
    Rule {
        name: "aligned-vertically",
        applies: |_| true,
        outcome: |g, layout, config| {
            if g.aligned_vertically() {
                vertical_outcome(g, layout, config);
            } else {
                layout.set(ContainerKind::Constraint, AlignmentFlags::UNKNOWN);
            }
        },
    },
];

fn flex_outcome(g: &Group, layout: &mut Layout, _: &LayoutConfig) {
    let Some(flex) = g.tree.get(g.parent).flex_container else {
        return;
    };
    let mut flags = AlignmentFlags::FLEX;
    flags |= match flex.direction {
        FlexDirection::Row => AlignmentFlags::HORIZONTAL,
        FlexDirection::Column => AlignmentFlags::VERTICAL,
    };
    if flex.wrap {
        flags |= AlignmentFlags::MULTILINE;
    }
    layout.set(ContainerKind::Constraint, flags);
}

fn single_outcome(g: &Group, layout: &mut Layout, _: &LayoutConfig) {
    let real = g.real();
    let child = g.tree.get(real[0]);
    let parent = g.tree.get(g.parent);
    if child.plain_text() {
        layout.set(ContainerKind::Frame, AlignmentFlags::INLINE_TEXT);
        layout.collapse.push(child.id);
    } else if child.percent_width().is_some()
        || child.auto_margin_horizontal()
        || child.max_width.is_some()
    {
        let mut flags = AlignmentFlags::SINGLE;
        if child.percent_width().is_some() {
            flags |= AlignmentFlags::PERCENT;
        }
        layout.set(ContainerKind::Constraint, flags);
    } else if parent.inline_flow() {
        layout.set(
            ContainerKind::Linear(Orientation::Horizontal),
            AlignmentFlags::HORIZONTAL | AlignmentFlags::SINGLE,
        );
    } else if child.position_relative() {
        layout.set(ContainerKind::Relative, AlignmentFlags::SINGLE);
    } else {
        layout.set(ContainerKind::Frame, AlignmentFlags::SINGLE);
    }
}

fn horizontal_outcome(g: &Group, layout: &mut Layout, _: &LayoutConfig) {
    if g.float_merge_frame() {
        float_frame_outcome(g, layout);
    } else if g.constraint_horizontal() {
        let mut flags = AlignmentFlags::HORIZONTAL;
        if g.nodes().any(|n| n.percent_width().is_some()) {
            flags |= AlignmentFlags::PERCENT;
        }
        layout.set(ContainerKind::Constraint, flags);
    } else if g.linear_horizontal() {
        let mut flags = AlignmentFlags::HORIZONTAL;
        if g.nodes().filter(|n| n.inline_vertical()).count() > 1 {
            flags |= AlignmentFlags::BASELINE;
        }
        layout.set(ContainerKind::Linear(Orientation::Horizontal), flags);
    } else if g.nodes().any(|n| n.position_relative()) {
        layout.set(ContainerKind::Relative, AlignmentFlags::HORIZONTAL);
    } else {
        layout.set(ContainerKind::Constraint, AlignmentFlags::HORIZONTAL);
    }
}

/// Frame with same-side float runs wrapped together
fn float_frame_outcome(g: &Group, layout: &mut Layout) {
    let mut flags = AlignmentFlags::HORIZONTAL | AlignmentFlags::FLOAT;
    if g.sides.contains(&FloatSide::Right) {
        flags |= AlignmentFlags::RIGHT;
    }
    layout.set(ContainerKind::Frame, flags);

    let mut run: Vec<NodeId> = Vec::new();
    let mut side: Option<FloatSide> = None;
    for &id in g.children {
        let current = g.tree.get(id).float_side();
        if current.is_some() && current == side {
            run.push(id);
            continue;
        }
        if run.len() > 1 {
            layout.wraps.push(std::mem::take(&mut run));
        }
        run = vec![id];
        side = current;
    }
    if run.len() > 1 && side.is_some() {
        layout.wraps.push(run);
    }
    layout.wraps.retain(|run| run.len() < g.children.len());
    if !layout.wraps.is_empty() {
        layout.flags |= AlignmentFlags::SEGMENTED;
    }
}

/// Stack rows vertically, wrapping each multi-member row into a group
fn vertical_outcome(g: &Group, layout: &mut Layout, config: &LayoutConfig) {
    let partition = partition_rows(
        g.tree,
        g.clear_map,
        g.parent,
        g.children,
        config.edge_tolerance,
    );
    if partition.rows.len() < 2 {
        layout.set(
            ContainerKind::Constraint,
            AlignmentFlags::VERTICAL | AlignmentFlags::UNKNOWN,
        );
        return;
    }
    let kind = if g.nodes().any(|n| n.position_relative()) || !partition.off_flow.is_empty() {
        ContainerKind::Constraint
    } else {
        ContainerKind::Linear(Orientation::Vertical)
    };
    layout.set(kind, AlignmentFlags::VERTICAL);
    layout.wraps = partition
        .rows
        .into_iter()
        .filter(|row| row.len() > 1)
        .map(|row| row.items)
        .collect();
    if !layout.wraps.is_empty() {
        layout.flags |= AlignmentFlags::SEGMENTED;
    }
}

/// Classify the children of `parent`.
///
/// Re-entering a parent that is already being classified yields an
/// unknown constraint container instead of recursing.
pub fn classify(
    tree: &NodeTree,
    clear_map: &ClearMap,
    parent: NodeId,
    classifying: &mut HashSet<NodeId>,
    config: &LayoutConfig,
) -> Layout {
    let mut layout = Layout::new(parent);
    if !classifying.insert(parent) {
        debug!("re-entered classification of '{}'", tree.get(parent).name);
        layout.rule = "re-entry";
        return layout;
    }

    let group = Group::new(tree, clear_map, parent, config.edge_tolerance);
    for rule in RULES {
        if (rule.applies)(&group) {
            (rule.outcome)(&group, &mut layout, config);
            layout.rule = rule.name;
            break;
        }
    }
    classifying.remove(&parent);

    debug!(
        "classified '{}' as {} [{}] by rule {}",
        tree.get(parent).name,
        layout.kind,
        layout.flags,
        layout.rule
    );
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::facts::build_tree;
    use crate::parser::parse;

    fn tree(source: &str) -> NodeTree {
        build_tree(&parse(source).expect("sheet should parse")).expect("tree should build")
    }

    fn classify_root(tree: &NodeTree) -> Layout {
        let root = tree.root().unwrap();
        let mut clear_map = ClearMap::new();
        clear_map.register(tree, root);
        classify(tree, &clear_map, root, &mut HashSet::new(), &LayoutConfig::default())
    }

    #[test]
    fn test_grid_wins_first() {
        let t = tree("box root [display: grid] { box a box b [position: absolute] }");
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Grid);
        assert_eq!(layout.rule, "grid");
    }

    #[test]
    fn test_flex_column_wrap() {
        let t = tree("box root [flex: column, wrap: true] { box a box b }");
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert_eq!(
            layout.flags,
            AlignmentFlags::FLEX | AlignmentFlags::VERTICAL | AlignmentFlags::MULTILINE
        );
    }

    #[test]
    fn test_absolute_children() {
        let t = tree(
            r#"
            box root [width: 200, height: 100] {
                box a [width: 200, height: 20]
                box abs [position: absolute, x: 20, y: 10]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.rule, "absolute");
        assert!(layout.flags.contains(AlignmentFlags::ABSOLUTE | AlignmentFlags::UNKNOWN));
    }

    #[test]
    fn test_single_plain_text_collapses() {
        let t = tree(r#"box root { text t "hello" }"#);
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Frame);
        assert_eq!(layout.flags, AlignmentFlags::INLINE_TEXT);
        assert_eq!(layout.collapse, vec![t.find("t").unwrap()]);
    }

    #[test]
    fn test_single_percent_child_forces_constraint() {
        let t = tree("box root { box a [css_width: 50%] }");
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert!(layout.flags.contains(AlignmentFlags::PERCENT));
    }

    #[test]
    fn test_single_inside_inline_parent() {
        let t = tree("box root { box span [display: inline] { image i } }");
        let span = t.find("span").unwrap();
        let layout = classify(&t, &ClearMap::new(), span, &mut HashSet::new(), &LayoutConfig::default());
        assert_eq!(layout.kind, ContainerKind::Linear(Orientation::Horizontal));
    }

    #[test]
    fn test_line_break_stacks_rows() {
        let t = tree(
            r#"
            box root [width: 400, height: 40] {
                text a [width: 50, height: 20]
                text b [x: 50, width: 50, height: 20]
                br [x: 100, height: 20]
                text c [y: 20, width: 50, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.rule, "line-break");
        assert_eq!(layout.kind, ContainerKind::Linear(Orientation::Vertical));
        assert!(layout.flags.contains(AlignmentFlags::MULTILINE));
        assert_eq!(layout.wraps.len(), 1);
        assert_eq!(layout.wraps[0].len(), 3);
    }

    #[test]
    fn test_trailing_line_break_is_ignored() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                text a [width: 50, height: 20, font_size: 12]
                text b [x: 50, width: 50, height: 20]
                br [x: 100, height: 20]
            }
            "#,
        );
        assert_ne!(classify_root(&t).rule, "line-break");
    }

    #[test]
    fn test_float_constraint() {
        let t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f [float: left, width: 100, height: 100]
                image pic [x: 100, width: 50, height: 50]
                box c [margin_left: auto, margin_right: auto, x: 200, y: 50, width: 100, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.rule, "float-constraint");
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert!(layout.flags.contains(AlignmentFlags::FLOAT | AlignmentFlags::BLOCK));
    }

    #[test]
    fn test_float_left_with_block_is_frame() {
        let t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f [float: left, width: 100, height: 60]
                box b [x: 100, width: 300, height: 100]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.rule, "linear-x");
        assert_eq!(layout.kind, ContainerKind::Frame);
        assert!(layout.flags.contains(AlignmentFlags::HORIZONTAL | AlignmentFlags::FLOAT));
        assert!(layout.wraps.is_empty());
    }

    #[test]
    fn test_float_runs_are_wrapped() {
        let t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f1 [float: left, width: 50, height: 60]
                box f2 [float: left, x: 50, width: 50, height: 60]
                box b [x: 100, width: 300, height: 100]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Frame);
        assert_eq!(layout.wraps, vec![vec![t.find("f1").unwrap(), t.find("f2").unwrap()]]);
        assert!(layout.flags.contains(AlignmentFlags::SEGMENTED));
    }

    #[test]
    fn test_uniform_inline_row_is_linear() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, width: 100, height: 20]
                box b [display: inline-block, x: 100, width: 150, height: 20]
                box c [display: inline-block, x: 250, width: 120, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Linear(Orientation::Horizontal));
        assert!(layout.flags.contains(AlignmentFlags::BASELINE));
    }

    #[test]
    fn test_rtl_row_reads_right_to_left() {
        let t = tree(
            r#"
            box root [dir: rtl, width: 400, height: 20] {
                box a [display: inline-block, x: 300, width: 100, height: 20]
                box b [display: inline-block, x: 150, width: 150, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.rule, "linear-x");
        assert_eq!(layout.kind, ContainerKind::Linear(Orientation::Horizontal));
    }

    #[test]
    fn test_mixed_fonts_fall_back_to_constraint() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, width: 100, height: 20, font_size: 12]
                box b [display: inline-block, x: 100, width: 150, height: 20]
                box c [display: inline-block, x: 250, width: 120, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert_eq!(layout.flags, AlignmentFlags::HORIZONTAL);
    }

    #[test]
    fn test_row_overflowing_box_width_is_not_linear() {
        let t = tree(
            r#"
            box root [width: 300, height: 20] {
                box a [display: inline-block, width: 150, height: 20]
                box b [display: inline-block, x: 150, width: 150, height: 20]
            }
            "#,
        );
        assert_eq!(classify_root(&t).kind, ContainerKind::Constraint);
    }

    #[test]
    fn test_percent_block_in_row_is_constraint_horizontal() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, css_width: 25%, width: 100, height: 20]
                box b [display: inline-block, x: 100, width: 100, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert_eq!(layout.flags, AlignmentFlags::HORIZONTAL | AlignmentFlags::PERCENT);
    }

    #[test]
    fn test_relative_offsets_pick_relative() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, width: 100, height: 20, position: relative, left: 4]
                box b [display: inline-block, x: 100, width: 100, height: 20]
            }
            "#,
        );
        assert_eq!(classify_root(&t).kind, ContainerKind::Relative);
    }

    #[test]
    fn test_vertical_stack() {
        let t = tree(
            r#"
            box root [width: 200, height: 60] {
                box wrapper [width: 200, height: 60] {
                    box a [width: 200, height: 20]
                    box b [y: 20, width: 200, height: 20]
                    box c [y: 40, width: 200, height: 20]
                }
            }
            "#,
        );
        let wrapper = t.find("wrapper").unwrap();
        let layout = classify(&t, &ClearMap::new(), wrapper, &mut HashSet::new(), &LayoutConfig::default());
        assert_eq!(layout.kind, ContainerKind::Linear(Orientation::Vertical));
        assert_eq!(layout.rule, "linear-y");

        // the same stack at the root stays open for anchors
        let root_layout = classify_root(&t);
        assert_eq!(root_layout.rule, "single");
    }

    #[test]
    fn test_root_stack_is_unknown_constraint() {
        let t = tree(
            r#"
            box root [width: 200, height: 40] {
                box a [width: 200, height: 20]
                box b [y: 20, width: 200, height: 20]
            }
            "#,
        );
        let layout = classify_root(&t);
        assert_eq!(layout.kind, ContainerKind::Constraint);
        assert_eq!(layout.flags, AlignmentFlags::VERTICAL | AlignmentFlags::UNKNOWN);
    }

    #[test]
    fn test_reentry_guard() {
        let t = tree("box root { box a box b }");
        let root = t.root().unwrap();
        let mut classifying = HashSet::from([root]);
        let layout = classify(&t, &ClearMap::new(), root, &mut classifying, &LayoutConfig::default());
        assert_eq!(layout.rule, "re-entry");
        assert_eq!(layout.flags, AlignmentFlags::UNKNOWN);
    }

    #[test]
    fn test_rule_names_are_unique() {
        let names: HashSet<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), RULES.len());
        assert_eq!(RULES.last().map(|r| r.name), Some("aligned-vertically"));
    }
}
