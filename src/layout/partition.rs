//! Chain partitioner: split a sibling list into visual rows
//!
//! Rows break on line-break markers, registered clears, vertical gaps after
//! flow-breaking boxes and inline content that no longer fits the box width.
//! Floated items open a slot that later items in the same run anchor against.

use std::collections::HashMap;

use log::{debug, trace};

use super::types::{ClearSide, FloatSide, Node, NodeId, NodeTree};

/// Process-wide map of boxes whose `clear` actually moves them below a float
#[derive(Debug, Clone, Default)]
pub struct ClearMap {
    entries: HashMap<NodeId, ClearSide>,
}

impl ClearMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cleared children of `parent`.
    ///
    /// A clear only counts when a float on that side precedes it; entries are
    /// written once and never replaced.
    pub fn register(&mut self, tree: &NodeTree, parent: NodeId) {
        let mut left_seen = false;
        let mut right_seen = false;
        for &id in tree.children(parent) {
            let node = tree.get(id);
            if let Some(side) = node.clear {
                let clears_float = (left_seen && side.clears(FloatSide::Left))
                    || (right_seen && side.clears(FloatSide::Right));
                if clears_float && node.page_flow() {
                    self.entries.entry(id).or_insert(side);
                }
            }
            match node.float_side() {
                Some(FloatSide::Left) => left_seen = true,
                Some(FloatSide::Right) => right_seen = true,
                None => {}
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<ClearSide> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One visual line of siblings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub items: Vec<NodeId>,
    /// For each item, the float whose slot was open when it was placed
    pub floated: Vec<Option<NodeId>>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Float slot the item anchors against, if any
    pub fn slot_of(&self, id: NodeId) -> Option<NodeId> {
        self.items
            .iter()
            .position(|item| *item == id)
            .and_then(|index| self.floated[index])
    }

    fn push(&mut self, id: NodeId, slot: Option<NodeId>) {
        self.items.push(id);
        self.floated.push(slot);
    }
}

/// Partitioner output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub rows: Vec<Row>,
    /// Absolute and fixed children, kept in source order
    pub off_flow: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy)]
struct FloatSlot {
    node: NodeId,
    width: f64,
    height: f64,
    accumulated: f64,
}

/// Available inline width of `parent`: its content box minus the intrusion of
/// floating siblings that overlap it.
pub fn box_width(tree: &NodeTree, parent: NodeId) -> f64 {
    let node = tree.get(parent);
    let content = node.content();
    let mut width = content.width;
    if let Some(grandparent) = node.parent {
        for &sibling in tree.children(grandparent) {
            if sibling == parent {
                continue;
            }
            let other = tree.get(sibling);
            if !other.floating() {
                continue;
            }
            let b = other.linear();
            if b.top() >= content.bottom() || b.bottom() <= content.top() {
                continue;
            }
            let overlap = b.right().min(content.right()) - b.left().max(content.left());
            if overlap > 0.0 {
                width -= overlap;
            }
        }
    }
    width.max(0.0)
}

/// Split `children` of `parent` into rows
pub fn partition_rows(
    tree: &NodeTree,
    clear_map: &ClearMap,
    parent: NodeId,
    children: &[NodeId],
    tolerance: f64,
) -> Partition {
    let width = box_width(tree, parent);
    let indent = tree.get(parent).text_indent;

    let mut partition = Partition::default();
    let mut current = Row::default();
    let mut row_width = 0.0;
    let mut slot: Option<FloatSlot> = None;
    let mut pending_break = false;
    let mut prev: Option<NodeId> = None;

    for &id in children {
        let node = tree.get(id);
        if !node.page_flow() {
            partition.off_flow.push(id);
            continue;
        }

        if let Some(prev_id) = prev.filter(|_| !current.is_empty()) {
            let float_offset = match slot {
                Some(s) if !current.items.contains(&s.node) => s.width,
                _ => 0.0,
            };
            let first_row_indent = if partition.rows.is_empty() { indent } else { 0.0 };
            let fits = row_width + node.linear().width + float_offset + first_row_indent
                <= width + tolerance;
            let reason = break_reason(
                node,
                tree.get(prev_id),
                clear_map,
                pending_break,
                fits,
                tolerance,
            );
            if let Some(reason) = reason {
                trace!("row break before '{}': {}", node.name, reason);
                if let Some(open) = slot.as_mut() {
                    open.accumulated += row_height(tree, &current, open.node);
                    if open.accumulated >= open.height - tolerance {
                        slot = None;
                    }
                }
                let cleared = match (clear_map.get(id), slot) {
                    (Some(side), Some(open)) => tree
                        .get(open.node)
                        .float_side()
                        .is_some_and(|float| side.clears(float)),
                    _ => false,
                };
                if cleared {
                    slot = None;
                }
                partition.rows.push(std::mem::take(&mut current));
                row_width = 0.0;
                pending_break = false;
            }
        }

        let anchor_slot = slot.map(|s| s.node).filter(|_| !node.floating());
        current.push(id, anchor_slot);
        row_width += node.linear().width;
        if node.floating() {
            let b = node.linear();
            slot = Some(FloatSlot {
                node: id,
                width: b.width,
                height: b.height,
                accumulated: 0.0,
            });
        }
        if node.is_line_break() {
            pending_break = true;
        }
        prev = Some(id);
    }

    if !current.is_empty() {
        partition.rows.push(current);
    }
    debug!(
        "partitioned '{}' into {} row(s), {} off-flow",
        tree.get(parent).name,
        partition.rows.len(),
        partition.off_flow.len()
    );
    partition
}

fn break_reason(
    node: &Node,
    prev: &Node,
    clear_map: &ClearMap,
    pending_break: bool,
    fits: bool,
    tolerance: f64,
) -> Option<&'static str> {
    if pending_break {
        return Some("line break");
    }
    if clear_map.contains(node.id) {
        return Some("clear");
    }
    let gap = node.linear().top() - prev.linear().bottom();
    let flow_breaking = node.block_static() || node.floating() || prev.block_static();
    if flow_breaking && gap > -tolerance {
        return Some("vertical gap");
    }
    if node.inline_flow() {
        if !fits {
            return Some("width");
        }
        if gap > -tolerance && node.linear().left() < prev.linear().right() - tolerance {
            return Some("wrapped line");
        }
    }
    None
}

/// Height a row contributes towards closing a float slot
fn row_height(tree: &NodeTree, row: &Row, float: NodeId) -> f64 {
    row.items
        .iter()
        .filter(|id| **id != float)
        .map(|id| tree.get(*id).linear().height)
        .fold(0.0, f64::max)
}

/// Wrap contiguous fragments sharing a text source into one group per run.
///
/// Returns the created groups. A run covering every child is left alone since
/// the parent already stands for that text.
pub fn merge_fragments(tree: &mut NodeTree, parent: NodeId) -> Vec<NodeId> {
    let children = tree.children(parent).to_vec();
    let mut runs: Vec<(String, Vec<NodeId>)> = Vec::new();
    let mut run: Vec<NodeId> = Vec::new();
    let mut key: Option<String> = None;

    for id in children.iter().copied() {
        let source = tree.get(id).text_source.clone();
        if source.is_some() && source == key {
            run.push(id);
            continue;
        }
        if let (Some(k), true) = (key.take(), run.len() >= 2) {
            runs.push((k, std::mem::take(&mut run)));
        }
        run = vec![id];
        key = source;
    }
    if let (Some(k), true) = (key, run.len() >= 2) {
        runs.push((k, run));
    }

    let mut groups = Vec::new();
    for (source, run) in runs {
        if run.len() == children.len() {
            continue;
        }
        if let Some(group) = tree.wrap(parent, &run) {
            debug!(
                "merged {} fragments of '{}' into '{}'",
                run.len(),
                source,
                tree.get(group).name
            );
            tree.get_mut(group).text_source = Some(source);
            groups.push(group);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::facts::build_tree;
    use crate::parser::parse;

    fn tree(source: &str) -> NodeTree {
        build_tree(&parse(source).expect("sheet should parse")).expect("tree should build")
    }

    fn rows_of(tree: &NodeTree) -> Partition {
        let root = tree.root().unwrap();
        let mut clear_map = ClearMap::new();
        clear_map.register(tree, root);
        partition_rows(tree, &clear_map, root, tree.children(root), 0.5)
    }

    fn names(tree: &NodeTree, row: &Row) -> Vec<String> {
        row.items.iter().map(|id| tree.get(*id).name.clone()).collect()
    }

    #[test]
    fn test_inline_siblings_share_one_row() {
        let t = tree(
            r#"
            box root [width: 400, height: 20] {
                box a [display: inline-block, x: 0, width: 100, height: 20]
                box b [display: inline-block, x: 100, width: 150, height: 20]
                box c [display: inline-block, x: 250, width: 120, height: 20]
            }
            "#,
        );
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 1);
        assert_eq!(names(&t, &partition.rows[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_float_opens_slot_for_block() {
        let t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f [float: left, width: 100, height: 60]
                box b [x: 100, width: 300, height: 100]
            }
            "#,
        );
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 1);
        let row = &partition.rows[0];
        assert_eq!(row.slot_of(t.find("b").unwrap()), t.find("f"));
        assert_eq!(row.slot_of(t.find("f").unwrap()), None);
    }

    #[test]
    fn test_slot_closes_after_float_height() {
        let t = tree(
            r#"
            box root [width: 400, height: 120] {
                box f [float: left, width: 100, height: 40]
                text l1 [display: inline, x: 100, y: 0, width: 200, height: 20]
                text l2 [display: inline, x: 100, y: 20, width: 200, height: 20]
                text l3 [display: inline, x: 0, y: 40, width: 200, height: 20]
            }
            "#,
        );
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 3);
        let l2 = t.find("l2").unwrap();
        let l3 = t.find("l3").unwrap();
        assert_eq!(partition.rows[1].slot_of(l2), t.find("f"));
        assert_eq!(partition.rows[2].slot_of(l3), None);
    }

    #[test]
    fn test_line_break_starts_new_row() {
        let t = tree(
            r#"
            box root [width: 400, height: 40] {
                text a [x: 0, y: 0, width: 50, height: 20]
                br
                text b [x: 0, y: 20, width: 50, height: 20]
            }
            "#,
        );
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 2);
        assert_eq!(partition.rows[0].len(), 2);
        assert_eq!(names(&t, &partition.rows[1]), vec!["b"]);
    }

    #[test]
    fn test_text_that_does_not_fit_wraps() {
        let t = tree(
            r#"
            box root [width: 200, height: 20, text_indent: 30] {
                text a [x: 30, width: 100, height: 20]
                text b [x: 130, width: 80, height: 20]
            }
            "#,
        );
        // 100 + 80 + indent 30 exceeds 200
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 2);
    }

    #[test]
    fn test_stacked_blocks_each_get_a_row() {
        let t = tree(
            r#"
            box root [width: 200, height: 60] {
                box a [y: 0, width: 200, height: 20]
                box b [y: 20, width: 200, height: 20]
                box c [y: 40, width: 200, height: 20]
            }
            "#,
        );
        assert_eq!(rows_of(&t).rows.len(), 3);
    }

    #[test]
    fn test_off_flow_children_are_separate() {
        let t = tree(
            r#"
            box root [width: 200, height: 60] {
                box a [width: 200, height: 20]
                box abs [position: absolute, x: 10, y: 10, width: 5, height: 5]
            }
            "#,
        );
        let partition = rows_of(&t);
        assert_eq!(partition.rows.len(), 1);
        assert_eq!(partition.off_flow, vec![t.find("abs").unwrap()]);
    }

    #[test]
    fn test_clear_registered_only_after_float() {
        let t = tree(
            r#"
            box root [width: 200, height: 80] {
                box early [clear: both, width: 200, height: 20]
                box f [float: left, y: 20, width: 50, height: 40]
                box late [clear: left, y: 60, width: 200, height: 20]
                box other [clear: right, y: 80, width: 200, height: 20]
            }
            "#,
        );
        let mut clear_map = ClearMap::new();
        clear_map.register(&t, t.root().unwrap());
        assert!(!clear_map.contains(t.find("early").unwrap()));
        assert_eq!(clear_map.get(t.find("late").unwrap()), Some(ClearSide::Left));
        assert!(!clear_map.contains(t.find("other").unwrap()));
        assert_eq!(clear_map.len(), 1);
    }

    #[test]
    fn test_box_width_subtracts_sibling_float() {
        let t = tree(
            r#"
            box root [width: 400, height: 100] {
                box f [float: left, width: 100, height: 100]
                box p [x: 0, width: 400, height: 50] {
                    text t [x: 100, width: 50, height: 20]
                }
            }
            "#,
        );
        assert_eq!(box_width(&t, t.find("p").unwrap()), 300.0);
    }

    #[test]
    fn test_merge_fragments_wraps_contiguous_run() {
        let mut t = tree(
            r#"
            box root [width: 200, height: 60] {
                box lead [width: 200, height: 20]
                text a [text_source: p1, y: 20, width: 200, height: 20]
                text b [text_source: p1, y: 40, width: 120, height: 20]
                box tail [y: 60, width: 200, height: 20]
            }
            "#,
        );
        let root = t.root().unwrap();
        let groups = merge_fragments(&mut t, root);
        assert_eq!(groups.len(), 1);
        assert_eq!(t.children(root).len(), 3);
        assert_eq!(t.children(groups[0]).len(), 2);
        assert_eq!(t.get(groups[0]).text_source.as_deref(), Some("p1"));
    }

    #[test]
    fn test_merge_fragments_skips_whole_parent() {
        let mut t = tree(
            r#"
            box root {
                text a [text_source: p1]
                text b [text_source: p1]
            }
            "#,
        );
        let root = t.root().unwrap();
        assert!(merge_fragments(&mut t, root).is_empty());
    }
}
