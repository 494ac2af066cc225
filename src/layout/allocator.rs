//! Percentage budget and flex grow/shrink weights along a chain

use log::{debug, trace};

use super::config::LayoutConfig;
use super::types::{Axis, Dimension, NodeId, NodeTree, Sizing};

/// Fraction of the parent still free for percentage sizing after `members`
pub fn available_percent(
    tree: &NodeTree,
    parent: NodeId,
    members: &[NodeId],
    axis: Axis,
    config: &LayoutConfig,
) -> f64 {
    let container = tree.get(parent).content().size(axis);
    if container <= 0.0 {
        return 0.0;
    }
    let mut available = 1.0;
    for &id in members {
        let node = tree.get(id);
        if !node.page_flow() {
            continue;
        }
        available -= match (node.percent(axis), node.css_size(axis).px()) {
            (Some(percent), _) => percent,
            (None, Some(length)) => (length + node.margin.along(axis)) / container,
            (None, None) => node.linear().size(axis) / container,
        };
    }
    config.truncate(available.max(0.0))
}

/// Assign a sizing directive to every member along `axis` and return the
/// remaining percentage budget.
pub fn allocate_sizing(
    tree: &mut NodeTree,
    parent: NodeId,
    members: &[NodeId],
    axis: Axis,
    config: &LayoutConfig,
) -> f64 {
    let container = tree.get(parent).content().size(axis);
    for &id in members {
        let node = tree.get(id);
        if !node.page_flow() {
            continue;
        }
        let sizing = match node.css_size(axis) {
            Dimension::Percent(p) => Sizing::Percent(config.truncate(p)),
            Dimension::Px(length) => Sizing::Fixed(length),
            Dimension::Auto
                if axis == Axis::Horizontal
                    && node.block_static()
                    && (node.linear().width - container).abs() <= config.edge_tolerance =>
            {
                Sizing::MatchParent
            }
            Dimension::Auto => Sizing::WrapContent,
        };
        tree.get_mut(id).params.set_sizing(axis, sizing);
    }
    available_percent(tree, parent, members, axis, config)
}

/// Weights assigned to one flex line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlexWeights {
    pub governing: Option<NodeId>,
    pub weights: Vec<(NodeId, f64)>,
}

impl FlexWeights {
    pub fn weight(&self, id: NodeId) -> Option<f64> {
        self.weights
            .iter()
            .find(|(member, _)| *member == id)
            .map(|(_, w)| *w)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

struct FlexEntry {
    id: NodeId,
    size: f64,
    basis: f64,
    /// Read against its grow ratio rather than its shrink ratio
    grows: bool,
    ratio: f64,
}

fn resolved_basis(tree: &NodeTree, id: NodeId, axis: Axis, container: f64) -> f64 {
    let node = tree.get(id);
    match node.flex.basis {
        Dimension::Px(length) => length,
        Dimension::Percent(p) => p * container,
        Dimension::Auto => node
            .css_size(axis)
            .px()
            .or_else(|| node.natural_size(axis))
            .unwrap_or_else(|| node.bounds.size(axis)),
    }
}

fn same(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Turn flex grow/shrink into chain weights relative to a governing item.
///
/// Each item is read in grow or shrink mode on its own: an item smaller than
/// its basis shrank, anything else grew. The governing item is the largest
/// grower, or the smallest shrinker when nothing grew. It gets weight 1, as do
/// items tied with it on mode, basis and ratio; everything else gets a
/// proportional share. When a share comes out above 1 the whole line is scaled
/// down so the largest weight is 1. Members that are spaced only by auto
/// margins split an even weight among themselves.
pub fn adjust_grow_ratio(
    tree: &mut NodeTree,
    parent: NodeId,
    members: &[NodeId],
    axis: Axis,
    config: &LayoutConfig,
) -> FlexWeights {
    let container = tree.get(parent).content().size(axis);
    let tolerance = config.edge_tolerance;
    let entries: Vec<FlexEntry> = members
        .iter()
        .copied()
        .filter(|id| {
            let node = tree.get(*id);
            node.page_flow() && !node.flex.is_default()
        })
        .map(|id| {
            let node = tree.get(id);
            let size = node.bounds.size(axis);
            let basis = resolved_basis(tree, id, axis, container);
            let grows = size >= basis - tolerance;
            FlexEntry {
                id,
                size,
                basis,
                grows,
                ratio: if grows { node.flex.grow } else { node.flex.shrink },
            }
        })
        .collect();

    let mut result = FlexWeights::default();
    let governing = entries
        .iter()
        .filter(|e| e.grows && e.ratio > 0.0)
        .fold(None::<&FlexEntry>, |best, e| match best {
            Some(b) if b.ratio >= e.ratio => best,
            _ => Some(e),
        })
        .or_else(|| {
            entries
                .iter()
                .filter(|e| !e.grows)
                .fold(None::<&FlexEntry>, |best, e| match best {
                    Some(b) if b.ratio <= e.ratio => best,
                    _ => Some(e),
                })
        })
        .or_else(|| entries.first());

    if let Some(governing) = governing {
        debug!(
            "flex line under '{}': governing '{}' ({} {})",
            tree.get(parent).name,
            tree.get(governing.id).name,
            if governing.grows { "grow" } else { "shrink" },
            governing.ratio
        );

        let raw: Vec<(NodeId, f64)> = entries
            .iter()
            .map(|entry| {
                let weight = if entry.id == governing.id
                    || (entry.grows == governing.grows
                        && same(entry.basis, governing.basis, tolerance)
                        && same(entry.ratio, governing.ratio, f64::EPSILON))
                {
                    1.0
                } else if governing.size <= 0.0 {
                    1.0
                } else if same(entry.basis, governing.basis, tolerance)
                    || entry.basis <= 0.0
                    || governing.basis <= 0.0
                {
                    entry.size / governing.size
                } else {
                    (entry.size / entry.basis) / (governing.size / governing.basis) * entry.basis
                        / governing.basis
                };
                (entry.id, weight.max(0.0))
            })
            .collect();
        let largest = raw.iter().map(|(_, w)| *w).fold(1.0_f64, f64::max);
        if largest > 1.0 {
            debug!("flex weights under '{}' scaled by 1/{}", tree.get(parent).name, largest);
        }
        result
            .weights
            .extend(raw.into_iter().map(|(id, w)| (id, config.truncate(w / largest))));
        result.governing = Some(governing.id);
    }

    let spacers: Vec<NodeId> = members
        .iter()
        .copied()
        .filter(|id| {
            let node = tree.get(*id);
            node.page_flow()
                && node.flex.is_default()
                && match axis {
                    Axis::Horizontal => node.auto_margin.horizontal(),
                    Axis::Vertical => node.auto_margin.top || node.auto_margin.bottom,
                }
        })
        .collect();
    if !spacers.is_empty() {
        let share = config.truncate(1.0 / spacers.len() as f64);
        result.weights.extend(spacers.iter().map(|id| (*id, share)));
    }

    for (id, weight) in &result.weights {
        trace!("'{}' {} weight {}", tree.get(*id).name, axis, weight);
        let params = &mut tree.get_mut(*id).params;
        params.set_weight(axis, *weight);
        params.set_sizing(axis, Sizing::Weighted(*weight));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::facts::build_tree;
    use crate::parser::parse;

    fn tree(source: &str) -> NodeTree {
        build_tree(&parse(source).expect("sheet should parse")).expect("tree should build")
    }

    fn root_and_members(tree: &NodeTree) -> (NodeId, Vec<NodeId>) {
        let root = tree.root().unwrap();
        (root, tree.children(root).to_vec())
    }

    #[test]
    fn test_available_percent_after_percent_members() {
        let t = tree(
            r#"
            box root [width: 400] {
                box a [css_width: 25%, width: 100]
                box b [css_width: 40%, width: 160]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let available = available_percent(&t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        assert!((available + 0.25 + 0.40 - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_available_percent_mixed_members() {
        let t = tree(
            r#"
            box root [width: 400] {
                box fixed [css_width: 80, margin_left: 10, margin_right: 10, width: 80]
                box measured [x: 100, width: 100]
                box abs [position: absolute, width: 400]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let available = available_percent(&t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        // 1 - 100/400 - 100/400
        assert_eq!(available, 0.5);
    }

    #[test]
    fn test_available_percent_clamps_and_zero_container() {
        let t = tree("box root [width: 100] { box a [width: 300] }");
        let (root, members) = root_and_members(&t);
        let config = LayoutConfig::default();
        assert_eq!(available_percent(&t, root, &members, Axis::Horizontal, &config), 0.0);
        assert_eq!(available_percent(&t, root, &members, Axis::Vertical, &config), 0.0);
    }

    #[test]
    fn test_allocate_sizing_directives() {
        let mut t = tree(
            r#"
            box root [width: 400, height: 100] {
                box full [width: 400, height: 20]
                box pct [css_width: 50%, width: 200, y: 20, height: 20]
                box px [css_width: 120, width: 120, y: 40, height: 20]
                text t [width: 40, y: 60, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        allocate_sizing(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        let sizing = |name: &str| t.get(t.find(name).unwrap()).params.width;
        assert_eq!(sizing("full"), Sizing::MatchParent);
        assert_eq!(sizing("pct"), Sizing::Percent(0.5));
        assert_eq!(sizing("px"), Sizing::Fixed(120.0));
        assert_eq!(sizing("t"), Sizing::WrapContent);
    }

    #[test]
    fn test_grow_weights_equal_basis() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 300, height: 20] {
                box a [grow: 1, basis: 0, width: 75, height: 20]
                box b [grow: 2, basis: 0, x: 75, width: 150, height: 20]
                box c [grow: 1, basis: 0, x: 225, width: 75, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        let id = |name: &str| t.find(name).unwrap();
        assert_eq!(weights.governing, Some(id("b")));
        assert_eq!(weights.weight(id("a")), Some(0.5));
        assert_eq!(weights.weight(id("b")), Some(1.0));
        assert_eq!(weights.weight(id("c")), Some(0.5));
        assert_eq!(t.get(id("a")).params.horizontal_weight, Some(0.5));
        assert_eq!(t.get(id("a")).params.width, Sizing::Weighted(0.5));
    }

    #[test]
    fn test_ties_share_full_weight() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 300, height: 20] {
                box a [grow: 1, basis: 0, width: 150, height: 20]
                box b [grow: 1, basis: 0, x: 150, width: 150, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        assert!(weights.weights.iter().all(|(_, w)| *w == 1.0));
        assert_eq!(weights.governing, t.find("a"));
    }

    #[test]
    fn test_shrink_mode_picks_minimal_shrink() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 200, height: 20] {
                box a [shrink: 2, basis: 150, width: 80, height: 20]
                box b [shrink: 1, basis: 150, x: 80, width: 120, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        let b = t.find("b").unwrap();
        let a = t.find("a").unwrap();
        assert_eq!(weights.governing, Some(b));
        assert_eq!(weights.weight(b), Some(1.0));
        // equal basis: 80 / 120
        assert_eq!(weights.weight(a), Some(0.666));
    }

    #[test]
    fn test_weights_above_one_scale_the_line() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 400, height: 20] {
                box a [grow: 1, basis: 50, width: 250, height: 20]
                box b [grow: 3, basis: 100, x: 250, width: 150, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        let a = t.find("a").unwrap();
        let b = t.find("b").unwrap();
        assert_eq!(weights.governing, Some(b));
        // a works out to 5/3 of b before scaling
        assert_eq!(weights.weight(a), Some(1.0));
        let scaled = weights.weight(b).unwrap();
        assert!((scaled - 0.6).abs() < 0.002, "{}", scaled);
    }

    #[test]
    fn test_mixed_grow_and_shrink_line() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 550, height: 20] {
                box a [grow: 1, basis: 100, width: 150, height: 20]
                box b [shrink: 1, basis: 200, x: 150, width: 100, height: 20]
                box c [grow: 0.5, basis: 100, x: 250, width: 300, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        let id = |name: &str| t.find(name).unwrap();
        assert_eq!(weights.governing, Some(id("a")));
        assert_eq!(weights.weight(id("a")), Some(0.5));
        assert_eq!(weights.weight(id("c")), Some(1.0));
        assert_eq!(weights.weight(id("b")), Some(0.333));
        let ordered: Vec<f64> = ["b", "a", "c"]
            .iter()
            .filter_map(|name| weights.weight(id(name)))
            .collect();
        assert!(ordered.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_auto_margin_spacers_split_evenly() {
        let mut t = tree(
            r#"
            box root [flex: row, width: 300, height: 20] {
                box a [margin_left: auto, width: 50, height: 20]
                box b [margin_right: auto, x: 250, width: 50, height: 20]
            }
            "#,
        );
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        assert_eq!(weights.governing, None);
        assert!(weights.weights.iter().all(|(_, w)| *w == 0.5));
    }

    #[test]
    fn test_default_items_get_no_weight() {
        let mut t = tree("box root [flex: row, width: 100] { box a [width: 50] }");
        let (root, members) = root_and_members(&t);
        let weights = adjust_grow_ratio(&mut t, root, &members, Axis::Horizontal, &LayoutConfig::default());
        assert!(weights.is_empty());
        assert_eq!(t.get(t.find("a").unwrap()).params.horizontal_weight, None);
    }
}
