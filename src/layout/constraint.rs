//! Per-node anchor state and the synthetic helper entries anchors may target

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::types::{Axis, Edge, NodeId};

/// Directional anchor keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorPosition {
    Left,
    Right,
    Top,
    Bottom,
    LeftRight,
    RightLeft,
    TopBottom,
    BottomTop,
    Baseline,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 9] = [
        AnchorPosition::Left,
        AnchorPosition::Right,
        AnchorPosition::Top,
        AnchorPosition::Bottom,
        AnchorPosition::LeftRight,
        AnchorPosition::RightLeft,
        AnchorPosition::TopBottom,
        AnchorPosition::BottomTop,
        AnchorPosition::Baseline,
    ];

    /// Leading edge to the same edge of the target (`left`, `top`)
    pub fn start(axis: Axis) -> AnchorPosition {
        match axis {
            Axis::Horizontal => AnchorPosition::Left,
            Axis::Vertical => AnchorPosition::Top,
        }
    }

    /// Trailing edge to the same edge of the target (`right`, `bottom`)
    pub fn end(axis: Axis) -> AnchorPosition {
        match axis {
            Axis::Horizontal => AnchorPosition::Right,
            Axis::Vertical => AnchorPosition::Bottom,
        }
    }

    /// Leading edge to the trailing edge of the target (`leftRight`, `topBottom`)
    pub fn after(axis: Axis) -> AnchorPosition {
        match axis {
            Axis::Horizontal => AnchorPosition::LeftRight,
            Axis::Vertical => AnchorPosition::TopBottom,
        }
    }

    /// Trailing edge to the leading edge of the target (`rightLeft`, `bottomTop`)
    pub fn before(axis: Axis) -> AnchorPosition {
        match axis {
            Axis::Horizontal => AnchorPosition::RightLeft,
            Axis::Vertical => AnchorPosition::BottomTop,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            AnchorPosition::Left
            | AnchorPosition::Right
            | AnchorPosition::LeftRight
            | AnchorPosition::RightLeft => Axis::Horizontal,
            _ => Axis::Vertical,
        }
    }

    /// Edge of the anchored node this position constrains
    pub fn source_edge(self) -> Edge {
        match self {
            AnchorPosition::Left | AnchorPosition::LeftRight => Edge::Left,
            AnchorPosition::Right | AnchorPosition::RightLeft => Edge::Right,
            AnchorPosition::Top | AnchorPosition::TopBottom | AnchorPosition::Baseline => {
                Edge::Top
            }
            AnchorPosition::Bottom | AnchorPosition::BottomTop => Edge::Bottom,
        }
    }

    /// Edge of the target the source edge aligns with
    pub fn target_edge(self) -> Edge {
        match self {
            AnchorPosition::Left | AnchorPosition::RightLeft => Edge::Left,
            AnchorPosition::Right | AnchorPosition::LeftRight => Edge::Right,
            AnchorPosition::Top | AnchorPosition::BottomTop | AnchorPosition::Baseline => {
                Edge::Top
            }
            AnchorPosition::Bottom | AnchorPosition::TopBottom => Edge::Bottom,
        }
    }

    /// Position linking `source` of this node to `target` of another
    pub fn from_edges(source: Edge, target: Edge) -> Option<AnchorPosition> {
        let position = match (source, target) {
            (Edge::Left, Edge::Left) => AnchorPosition::Left,
            (Edge::Left, Edge::Right) => AnchorPosition::LeftRight,
            (Edge::Right, Edge::Left) => AnchorPosition::RightLeft,
            (Edge::Right, Edge::Right) => AnchorPosition::Right,
            (Edge::Top, Edge::Top) => AnchorPosition::Top,
            (Edge::Top, Edge::Bottom) => AnchorPosition::TopBottom,
            (Edge::Bottom, Edge::Top) => AnchorPosition::BottomTop,
            (Edge::Bottom, Edge::Bottom) => AnchorPosition::Bottom,
            _ => return None,
        };
        Some(position)
    }

    /// Anchors that pin the leading edge of the axis
    pub fn is_start(self) -> bool {
        matches!(
            self,
            AnchorPosition::Left
                | AnchorPosition::LeftRight
                | AnchorPosition::Top
                | AnchorPosition::TopBottom
                | AnchorPosition::Baseline
        )
    }

    /// Emitted attribute name
    pub fn attribute(self) -> &'static str {
        match self {
            AnchorPosition::Left => "constraint-left",
            AnchorPosition::Right => "constraint-right",
            AnchorPosition::Top => "constraint-top",
            AnchorPosition::Bottom => "constraint-bottom",
            AnchorPosition::LeftRight => "constraint-left-right",
            AnchorPosition::RightLeft => "constraint-right-left",
            AnchorPosition::TopBottom => "constraint-top-bottom",
            AnchorPosition::BottomTop => "constraint-bottom-top",
            AnchorPosition::Baseline => "constraint-baseline",
        }
    }
}

impl fmt::Display for AnchorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            AnchorPosition::Left => "left",
            AnchorPosition::Right => "right",
            AnchorPosition::Top => "top",
            AnchorPosition::Bottom => "bottom",
            AnchorPosition::LeftRight => "leftRight",
            AnchorPosition::RightLeft => "rightLeft",
            AnchorPosition::TopBottom => "topBottom",
            AnchorPosition::BottomTop => "bottomTop",
            AnchorPosition::Baseline => "baseline",
        };
        write!(f, "{}", keyword)
    }
}

/// Index of a guideline or barrier in the [`NodeTree`](super::types::NodeTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HelperId(pub usize);

/// What an anchor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorTarget {
    Parent,
    Node(NodeId),
    Helper(HelperId),
}

/// A resolved anchor entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub target: AnchorTarget,
    /// Axis tag recorded with the anchor
    pub horizontal: bool,
    pub margin: f64,
}

/// Anchor state for one node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraint {
    /// Horizontal position reaches the parent
    pub horizontal: bool,
    /// Vertical position reaches the parent
    pub vertical: bool,
    pub current: BTreeMap<AnchorPosition, Anchor>,
    /// Barrier synthesized on behalf of this node, keyed by direction
    pub barrier: BTreeMap<Edge, HelperId>,
    locked_horizontal: bool,
    locked_vertical: bool,
}

impl Constraint {
    /// Set an anchor, overwriting any previous entry for the same key.
    ///
    /// Returns false when the axis is locked or the entry is unchanged.
    pub fn anchor(&mut self, position: AnchorPosition, target: AnchorTarget, margin: f64) -> bool {
        let axis = position.axis();
        if self.is_locked(axis) {
            return false;
        }
        let anchor = Anchor {
            target,
            horizontal: axis == Axis::Horizontal,
            margin,
        };
        if self.current.get(&position) == Some(&anchor) {
            return false;
        }
        self.current.insert(position, anchor);
        true
    }

    pub fn get(&self, position: AnchorPosition) -> Option<&Anchor> {
        self.current.get(&position)
    }

    pub fn remove(&mut self, position: AnchorPosition) -> Option<Anchor> {
        if self.is_locked(position.axis()) {
            return None;
        }
        self.current.remove(&position)
    }

    /// Anchors recorded for one axis
    pub fn on_axis(&self, axis: Axis) -> impl Iterator<Item = (AnchorPosition, &Anchor)> {
        self.current
            .iter()
            .filter(move |(position, _)| position.axis() == axis)
            .map(|(position, anchor)| (*position, anchor))
    }

    pub fn has_axis(&self, axis: Axis) -> bool {
        self.on_axis(axis).next().is_some()
    }

    /// Drop every anchor on an axis and mark it unresolved
    pub fn clear_axis(&mut self, axis: Axis) {
        if self.is_locked(axis) {
            return;
        }
        self.current.retain(|position, _| position.axis() != axis);
        self.set_resolved(axis, false);
    }

    pub fn is_resolved(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    pub fn set_resolved(&mut self, axis: Axis, resolved: bool) {
        match axis {
            Axis::Horizontal => self.horizontal = resolved,
            Axis::Vertical => self.vertical = resolved,
        }
    }

    /// Both axes reach the parent
    pub fn anchored(&self) -> bool {
        self.horizontal && self.vertical
    }

    pub fn lock(&mut self, axis: Axis) {
        match axis {
            Axis::Horizontal => self.locked_horizontal = true,
            Axis::Vertical => self.locked_vertical = true,
        }
    }

    pub fn is_locked(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.locked_horizontal,
            Axis::Vertical => self.locked_vertical,
        }
    }
}

/// Guideline placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuidelineOffset {
    /// Pixels from the parent's leading edge
    Begin(f64),
    /// Pixels from the parent's trailing edge
    End(f64),
    /// Fraction of the parent size
    Percent(f64),
}

impl GuidelineOffset {
    fn kind(&self) -> u8 {
        match self {
            GuidelineOffset::Begin(_) => 0,
            GuidelineOffset::End(_) => 1,
            GuidelineOffset::Percent(_) => 2,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            GuidelineOffset::Begin(v) | GuidelineOffset::End(v) | GuidelineOffset::Percent(v) => {
                *v
            }
        }
    }
}

impl fmt::Display for GuidelineOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuidelineOffset::Begin(v) => write!(f, "guide-begin -> {}", v),
            GuidelineOffset::End(v) => write!(f, "guide-end -> {}", v),
            GuidelineOffset::Percent(v) => write!(f, "guide-percent -> {}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HelperKind {
    /// Invisible line across the parent, perpendicular to `axis`
    Guideline {
        axis: Axis,
        offset: GuidelineOffset,
    },
    /// Extreme `edge` of the referenced nodes
    Barrier {
        edge: Edge,
        referenced: Vec<NodeId>,
    },
}

/// Synthetic sibling entry appended to a parent's output
#[derive(Debug, Clone, PartialEq)]
pub struct Helper {
    pub id: HelperId,
    pub parent: NodeId,
    pub name: String,
    pub kind: HelperKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GuidelineKey {
    parent: NodeId,
    axis: Axis,
    kind: u8,
    /// Offset scaled by the precision so equal emitted values share a key
    offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BarrierKey {
    parent: NodeId,
    edge: Edge,
    referenced: Vec<NodeId>,
}

/// Per-parent guideline and barrier cache for one resolution call
#[derive(Debug, Clone, Default)]
pub struct GuidelineCache {
    precision: u32,
    guidelines: HashMap<GuidelineKey, HelperId>,
    barriers: HashMap<BarrierKey, HelperId>,
}

impl GuidelineCache {
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    fn guideline_key(&self, parent: NodeId, axis: Axis, offset: GuidelineOffset) -> GuidelineKey {
        let scale = 10f64.powi(self.precision as i32);
        GuidelineKey {
            parent,
            axis,
            kind: offset.kind(),
            offset: (offset.value() * scale).trunc() as i64,
        }
    }

    /// Return the cached guideline or create it through `insert`.
    ///
    /// Only successful insertions are cached.
    pub fn guideline(
        &mut self,
        parent: NodeId,
        axis: Axis,
        offset: GuidelineOffset,
        insert: impl FnOnce() -> Option<HelperId>,
    ) -> Option<HelperId> {
        let key = self.guideline_key(parent, axis, offset);
        if let Some(id) = self.guidelines.get(&key) {
            return Some(*id);
        }
        let id = insert()?;
        self.guidelines.insert(key, id);
        Some(id)
    }

    /// Return the cached barrier over the same referenced set or create it
    pub fn barrier(
        &mut self,
        parent: NodeId,
        edge: Edge,
        referenced: &[NodeId],
        insert: impl FnOnce() -> Option<HelperId>,
    ) -> Option<HelperId> {
        let mut sorted = referenced.to_vec();
        sorted.sort();
        let key = BarrierKey {
            parent,
            edge,
            referenced: sorted,
        };
        if let Some(id) = self.barriers.get(&key) {
            return Some(*id);
        }
        let id = insert()?;
        self.barriers.insert(key, id);
        Some(id)
    }

    /// Record a helper that already exists in the tree
    pub fn register(&mut self, helper: &Helper) {
        match &helper.kind {
            HelperKind::Guideline { axis, offset } => {
                let key = self.guideline_key(helper.parent, *axis, *offset);
                self.guidelines.entry(key).or_insert(helper.id);
            }
            HelperKind::Barrier { edge, referenced } => {
                let mut sorted = referenced.clone();
                sorted.sort();
                let key = BarrierKey {
                    parent: helper.parent,
                    edge: *edge,
                    referenced: sorted,
                };
                self.barriers.entry(key).or_insert(helper.id);
            }
        }
    }

    pub fn guideline_count(&self) -> usize {
        self.guidelines.len()
    }
}
