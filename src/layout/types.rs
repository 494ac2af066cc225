//! Core types for the layout resolution engine
//!
//! The source tree lives in a [`NodeTree`] arena. Nodes refer to each other
//! through [`NodeId`]s only: the parent owns its `children` list, every other
//! relationship (anchor targets, wrappers, helper entries) is a plain id lookup.

use std::fmt;

use bitflags::bitflags;

use super::constraint::{AnchorTarget, Constraint, Helper, HelperId, HelperKind};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Stable index of a node inside a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bounding box in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Coordinate of one edge
    pub fn edge(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Left => self.left(),
            Edge::Top => self.top(),
            Edge::Right => self.right(),
            Edge::Bottom => self.bottom(),
        }
    }

    /// Extent along an axis
    pub fn size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Start coordinate along an axis
    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    /// End coordinate along an axis
    pub fn end(&self, axis: Axis) -> f64 {
        self.start(axis) + self.size(axis)
    }

    /// Check if this bounding box intersects another
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Grow the box outward by the given edges (negative values shrink it)
    pub fn outset(&self, edges: &BoxEdges) -> BoundingBox {
        BoundingBox::new(
            self.x - edges.left,
            self.y - edges.top,
            self.width + edges.horizontal(),
            self.height + edges.vertical(),
        )
    }

    /// Shrink the box inward by the given edges, never below zero size
    pub fn inset(&self, edges: &BoxEdges) -> BoundingBox {
        BoundingBox::new(
            self.x + edges.left,
            self.y + edges.top,
            (self.width - edges.horizontal()).max(0.0),
            (self.height - edges.vertical()).max(0.0),
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-side lengths (margin, padding, border)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxEdges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoxEdges {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    pub fn get(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
        }
    }

    pub fn set(&mut self, edge: Edge, value: f64) {
        match edge {
            Edge::Top => self.top = value,
            Edge::Right => self.right = value,
            Edge::Bottom => self.bottom = value,
            Edge::Left => self.left = value,
        }
    }

    /// Combined length of both sides along an axis
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.horizontal(),
            Axis::Vertical => self.vertical(),
        }
    }
}

/// Layout axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// Leading edge of the axis
    pub fn start_edge(self) -> Edge {
        match self {
            Axis::Horizontal => Edge::Left,
            Axis::Vertical => Edge::Top,
        }
    }

    /// Trailing edge of the axis
    pub fn end_edge(self) -> Edge {
        match self {
            Axis::Horizontal => Edge::Right,
            Axis::Vertical => Edge::Bottom,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// One side of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Edge {
    Left,
    Top,
    Right,
    Bottom,
}

impl Edge {
    pub fn axis(self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::Horizontal,
            Edge::Top | Edge::Bottom => Axis::Vertical,
        }
    }

    pub fn opposite(self) -> Edge {
        match self {
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
            Edge::Top => Edge::Bottom,
            Edge::Bottom => Edge::Top,
        }
    }

    pub fn is_start(self) -> bool {
        matches!(self, Edge::Left | Edge::Top)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Left => write!(f, "left"),
            Edge::Top => write!(f, "top"),
            Edge::Right => write!(f, "right"),
            Edge::Bottom => write!(f, "bottom"),
        }
    }
}

/// Side a box is floated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatSide {
    Left,
    Right,
}

/// Side(s) a box clears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearSide {
    Left,
    Right,
    Both,
}

impl ClearSide {
    /// Whether clearing this side moves the box below a float on `side`
    pub fn clears(self, side: FloatSide) -> bool {
        matches!(
            (self, side),
            (ClearSide::Both, _)
                | (ClearSide::Left, FloatSide::Left)
                | (ClearSide::Right, FloatSide::Right)
        )
    }
}

/// Outer display type as computed by the style provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    Grid,
    Table,
    ListItem,
}

impl Display {
    pub fn is_block_level(self) -> bool {
        matches!(
            self,
            Display::Block | Display::Flex | Display::Grid | Display::Table | Display::ListItem
        )
    }
}

/// Positioning scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
    Fixed,
}

/// Horizontal alignment of inline content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
    Justify,
}

/// Computed `vertical-align`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalAlign {
    Baseline,
    Top,
    TextTop,
    Middle,
    Bottom,
    TextBottom,
    Sub,
    Super,
    /// Raise (positive) or lower (negative) by a pixel amount
    Length(f64),
}

impl VerticalAlign {
    /// Whether the box is moved off the baseline rather than sitting on it
    pub fn is_shift(self) -> bool {
        matches!(
            self,
            VerticalAlign::Sub | VerticalAlign::Super | VerticalAlign::Length(_)
        )
    }
}

/// A specified size: auto, a pixel length, or a fraction of the container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Px(f64),
    /// Fraction in [0, 1]
    Percent(f64),
}

impl Dimension {
    pub fn is_auto(&self) -> bool {
        matches!(self, Dimension::Auto)
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Dimension::Percent(p) => Some(*p),
            _ => None,
        }
    }

    pub fn px(&self) -> Option<f64> {
        match self {
            Dimension::Px(v) => Some(*v),
            _ => None,
        }
    }
}

/// Kind of source element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Element,
    Text,
    Image,
    /// Buttons, inputs, media and other form controls
    Control,
    LineBreak,
}

/// Main axis direction of a flex container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

impl FlexDirection {
    pub fn main_axis(self) -> Axis {
        match self {
            FlexDirection::Row => Axis::Horizontal,
            FlexDirection::Column => Axis::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyContent {
    #[default]
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignItems {
    Start,
    End,
    Center,
    #[default]
    Stretch,
    Baseline,
}

/// Flex container properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexContainer {
    pub direction: FlexDirection,
    pub wrap: bool,
    pub justify: JustifyContent,
    pub align_items: AlignItems,
    pub row_gap: f64,
    pub column_gap: f64,
}

impl FlexContainer {
    pub fn new(direction: FlexDirection) -> Self {
        Self {
            direction,
            wrap: false,
            justify: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            row_gap: 0.0,
            column_gap: 0.0,
        }
    }
}

/// Flex item properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexItem {
    pub grow: f64,
    pub shrink: f64,
    pub basis: Dimension,
    pub align_self: Option<AlignItems>,
}

impl FlexItem {
    /// True when grow, shrink and basis are all at their initial values
    pub fn is_default(&self) -> bool {
        self.grow == 0.0 && self.shrink == 1.0 && self.basis.is_auto()
    }
}

impl Default for FlexItem {
    fn default() -> Self {
        Self {
            grow: 0.0,
            shrink: 1.0,
            basis: Dimension::Auto,
            align_self: None,
        }
    }
}

/// Which margins were specified as `auto`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoMargins {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl AutoMargins {
    pub fn any(&self) -> bool {
        self.top || self.right || self.bottom || self.left
    }

    pub fn horizontal(&self) -> bool {
        self.left || self.right
    }
}

/// Offsets of a positioned box (`top`, `right`, `bottom`, `left`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: Dimension,
    pub right: Dimension,
    pub bottom: Dimension,
    pub left: Dimension,
}

impl Insets {
    pub fn get(&self, edge: Edge) -> Dimension {
        match edge {
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
        }
    }

    pub fn is_zero(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|d| matches!(d, Dimension::Auto) || *d == Dimension::Px(0.0))
    }
}

/// Stacking direction of a linear container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Native container archetype selected for a group of children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Frame,
    Linear(Orientation),
    Relative,
    Constraint,
    Grid,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Frame => write!(f, "frame"),
            ContainerKind::Linear(Orientation::Horizontal) => write!(f, "linear-horizontal"),
            ContainerKind::Linear(Orientation::Vertical) => write!(f, "linear-vertical"),
            ContainerKind::Relative => write!(f, "relative"),
            ContainerKind::Constraint => write!(f, "constraint"),
            ContainerKind::Grid => write!(f, "grid"),
        }
    }
}

bitflags! {
    /// Accumulated alignment facts about a container's children
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AlignmentFlags: u32 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL = 1 << 1;
        /// Children include absolute or fixed boxes
        const ABSOLUTE = 1 << 2;
        /// Arrangement could not be read off the geometry; anchors decide
        const UNKNOWN = 1 << 3;
        const FLOAT = 1 << 4;
        const RIGHT = 1 << 5;
        const BLOCK = 1 << 6;
        const PERCENT = 1 << 7;
        const MULTILINE = 1 << 8;
        const SINGLE = 1 << 9;
        const BASELINE = 1 << 10;
        const FLEX = 1 << 11;
        /// The only child was plain text and was folded into the parent
        const INLINE_TEXT = 1 << 12;
        const SEGMENTED = 1 << 13;
    }
}

impl fmt::Display for AlignmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

/// How a node is sized along one axis in the emitted layout
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sizing {
    #[default]
    WrapContent,
    MatchParent,
    Fixed(f64),
    /// Zero-sized, distributed by chain weight
    Weighted(f64),
    /// Fraction of the parent
    Percent(f64),
    /// Stretched between its two anchors
    MatchConstraint,
}

impl fmt::Display for Sizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sizing::WrapContent => write!(f, "wrap_content"),
            Sizing::MatchParent => write!(f, "match_parent"),
            Sizing::Fixed(v) => write!(f, "{}px", v),
            Sizing::Weighted(w) => write!(f, "0px weight={}", w),
            Sizing::Percent(p) => write!(f, "percent={}", p),
            Sizing::MatchConstraint => write!(f, "match_constraint"),
        }
    }
}

/// Chain style applied by a chain head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStyle {
    Packed,
    Spread,
    SpreadInside,
}

impl fmt::Display for ChainStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStyle::Packed => write!(f, "packed"),
            ChainStyle::Spread => write!(f, "spread"),
            ChainStyle::SpreadInside => write!(f, "spread_inside"),
        }
    }
}

/// Placement of a child inside a frame or linear container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    Start,
    Center,
    End,
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gravity::Start => write!(f, "start"),
            Gravity::Center => write!(f, "center"),
            Gravity::End => write!(f, "end"),
        }
    }
}

/// Emitted per-node layout attributes besides anchors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutParams {
    pub width: Sizing,
    pub height: Sizing,
    pub horizontal_chain: Option<ChainStyle>,
    pub vertical_chain: Option<ChainStyle>,
    pub horizontal_bias: Option<f64>,
    pub vertical_bias: Option<f64>,
    pub horizontal_weight: Option<f64>,
    pub vertical_weight: Option<f64>,
    /// Margin adjustments emitted on top of anchor margins
    pub margin: BoxEdges,
    /// Gravity for children of frame and linear containers
    pub gravity: Option<Gravity>,
    /// Linear containers: align children on their baselines
    pub baseline_aligned: Option<bool>,
    /// Grid containers: column count; grid children: (row, column)
    pub grid_columns: Option<usize>,
    pub grid_cell: Option<(usize, usize)>,
}

impl LayoutParams {
    pub fn chain_style(&self, axis: Axis) -> Option<ChainStyle> {
        match axis {
            Axis::Horizontal => self.horizontal_chain,
            Axis::Vertical => self.vertical_chain,
        }
    }

    pub fn set_chain_style(&mut self, axis: Axis, style: ChainStyle) {
        match axis {
            Axis::Horizontal => self.horizontal_chain = Some(style),
            Axis::Vertical => self.vertical_chain = Some(style),
        }
    }

    pub fn bias(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Horizontal => self.horizontal_bias,
            Axis::Vertical => self.vertical_bias,
        }
    }

    pub fn set_bias(&mut self, axis: Axis, bias: f64) {
        match axis {
            Axis::Horizontal => self.horizontal_bias = Some(bias),
            Axis::Vertical => self.vertical_bias = Some(bias),
        }
    }

    pub fn weight(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Horizontal => self.horizontal_weight,
            Axis::Vertical => self.vertical_weight,
        }
    }

    pub fn set_weight(&mut self, axis: Axis, weight: f64) {
        match axis {
            Axis::Horizontal => self.horizontal_weight = Some(weight),
            Axis::Vertical => self.vertical_weight = Some(weight),
        }
    }

    pub fn sizing(&self, axis: Axis) -> Sizing {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    pub fn set_sizing(&mut self, axis: Axis, sizing: Sizing) {
        match axis {
            Axis::Horizontal => self.width = sizing,
            Axis::Vertical => self.height = sizing,
        }
    }
}

/// One element of the source tree plus its resolution state
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Source identity used in diagnostics
    pub name: String,
    pub span: Span,
    pub role: NodeRole,
    pub text: Option<String>,
    /// Fragments of one multiline source text share this key
    pub text_source: Option<String>,

    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub child_index: usize,
    /// Synthetic wrapper standing in for a run of children
    pub group: bool,
    pub helpers: Vec<HelperId>,

    pub bounds: BoundingBox,
    pub margin: BoxEdges,
    pub padding: BoxEdges,
    pub border: BoxEdges,

    pub display: Display,
    pub position: Position,
    pub float: Option<FloatSide>,
    pub clear: Option<ClearSide>,
    pub insets: Insets,
    pub css_width: Dimension,
    pub css_height: Dimension,
    pub max_width: Option<f64>,
    pub auto_margin: AutoMargins,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub font_size: f64,
    pub line_height: f64,
    pub text_indent: f64,
    pub rtl: bool,
    pub baseline_eligible: bool,
    /// Distance from the top border edge to the first baseline
    pub baseline_offset: Option<f64>,
    /// Main size with flex growing suppressed
    pub natural_width: Option<f64>,
    pub natural_height: Option<f64>,
    pub flex_container: Option<FlexContainer>,
    pub flex: FlexItem,

    pub container: Option<ContainerKind>,
    pub flags: AlignmentFlags,
    pub constraint: Constraint,
    pub params: LayoutParams,
    /// Plain text folded into its parent, or a line break
    pub collapsed: bool,
    /// Row index assigned by the partitioner
    pub row: Option<usize>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, role: NodeRole) -> Self {
        let display = match role {
            NodeRole::Element => Display::Block,
            NodeRole::Text | NodeRole::LineBreak => Display::Inline,
            NodeRole::Image | NodeRole::Control => Display::InlineBlock,
        };
        Self {
            id,
            name: name.into(),
            span: 0..0,
            role,
            text: None,
            text_source: None,
            parent: None,
            children: Vec::new(),
            child_index: 0,
            group: false,
            helpers: Vec::new(),
            bounds: BoundingBox::zero(),
            margin: BoxEdges::default(),
            padding: BoxEdges::default(),
            border: BoxEdges::default(),
            display,
            position: Position::Static,
            float: None,
            clear: None,
            insets: Insets::default(),
            css_width: Dimension::Auto,
            css_height: Dimension::Auto,
            max_width: None,
            auto_margin: AutoMargins::default(),
            text_align: TextAlign::Start,
            vertical_align: VerticalAlign::Baseline,
            font_size: 16.0,
            line_height: 0.0,
            text_indent: 0.0,
            rtl: false,
            baseline_eligible: !matches!(role, NodeRole::LineBreak),
            baseline_offset: None,
            natural_width: None,
            natural_height: None,
            flex_container: None,
            flex: FlexItem::default(),
            container: None,
            flags: AlignmentFlags::empty(),
            constraint: Constraint::default(),
            params: LayoutParams::default(),
            collapsed: false,
            row: None,
        }
    }

    /// Participates in normal flow (static or relative)
    pub fn page_flow(&self) -> bool {
        matches!(self.position, Position::Static | Position::Relative)
    }

    pub fn floating(&self) -> bool {
        self.page_flow() && self.float.is_some()
    }

    pub fn float_side(&self) -> Option<FloatSide> {
        if self.page_flow() {
            self.float
        } else {
            None
        }
    }

    /// In-flow block-level box
    pub fn block_static(&self) -> bool {
        self.page_flow() && !self.floating() && self.display.is_block_level()
    }

    /// In-flow inline-level box
    pub fn inline_flow(&self) -> bool {
        self.page_flow() && !self.floating() && !self.display.is_block_level()
    }

    /// Inline-level box that honours `vertical-align`
    pub fn inline_vertical(&self) -> bool {
        self.inline_flow() && !self.is_line_break()
    }

    /// Relatively positioned with a non-zero offset
    pub fn position_relative(&self) -> bool {
        self.position == Position::Relative && !self.insets.is_zero()
    }

    pub fn right_aligned(&self) -> bool {
        self.float_side() == Some(FloatSide::Right)
            || (self.auto_margin.left && !self.auto_margin.right)
    }

    pub fn center_aligned(&self) -> bool {
        self.auto_margin.left && self.auto_margin.right
    }

    pub fn auto_margin_horizontal(&self) -> bool {
        self.auto_margin.horizontal()
    }

    pub fn is_text(&self) -> bool {
        self.role == NodeRole::Text
    }

    pub fn is_image(&self) -> bool {
        self.role == NodeRole::Image
    }

    pub fn is_control(&self) -> bool {
        self.role == NodeRole::Control
    }

    pub fn is_line_break(&self) -> bool {
        self.role == NodeRole::LineBreak
    }

    pub fn has_width(&self) -> bool {
        self.css_width.px().is_some()
    }

    pub fn has_height(&self) -> bool {
        self.css_height.px().is_some()
    }

    pub fn percent_width(&self) -> Option<f64> {
        self.css_width.percent()
    }

    pub fn percent_height(&self) -> Option<f64> {
        self.css_height.percent()
    }

    pub fn percent(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Horizontal => self.percent_width(),
            Axis::Vertical => self.percent_height(),
        }
    }

    pub fn css_size(&self, axis: Axis) -> Dimension {
        match axis {
            Axis::Horizontal => self.css_width,
            Axis::Vertical => self.css_height,
        }
    }

    pub fn natural_size(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Horizontal => self.natural_width,
            Axis::Vertical => self.natural_height,
        }
    }

    pub fn has_negative_margin(&self) -> bool {
        self.margin.top < 0.0
            || self.margin.right < 0.0
            || self.margin.bottom < 0.0
            || self.margin.left < 0.0
    }

    /// Margin box
    pub fn linear(&self) -> BoundingBox {
        self.bounds.outset(&self.margin)
    }

    /// Border box minus borders; guideline offsets are measured against it
    pub fn padding_box(&self) -> BoundingBox {
        self.bounds.inset(&self.border)
    }

    /// Content box
    pub fn content(&self) -> BoundingBox {
        self.bounds.inset(&self.padding).inset(&self.border)
    }

    /// Absolute y of the first baseline
    pub fn baseline(&self) -> f64 {
        self.bounds.y + self.baseline_offset.unwrap_or(self.bounds.height)
    }

    /// Rendered height including half-leading from the line height
    pub fn effective_height(&self) -> f64 {
        self.bounds.height.max(self.line_height)
    }

    /// Single-line plain text that can fold into its parent
    pub fn plain_text(&self) -> bool {
        self.is_text() && self.children.is_empty() && self.page_flow() && !self.floating()
    }
}

/// Arena holding the source tree and the synthetic helper entries
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
    helpers: Vec<Helper>,
    root: Option<NodeId>,
    group_count: usize,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node with default facts under `parent` (or as the root)
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        role: NodeRole,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = Node::new(id, name, role);
        node.parent = parent;
        match parent {
            Some(pid) => {
                let siblings = &mut self.nodes[pid.0].children;
                node.child_index = siblings.len();
                siblings.push(id);
            }
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Find a node by its source name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Pre-order walk starting at `id`
    pub fn depth_first(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            order.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev());
        }
        order
    }

    /// Children in post-order below `id` (descendants before ancestors)
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.collect_post_order(id, &mut order);
        order
    }

    fn collect_post_order(&self, id: NodeId, order: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.0].children {
            self.collect_post_order(child, order);
        }
        order.push(id);
    }

    /// Wrap a contiguous run of `parent`'s children in a new group node.
    ///
    /// The run is moved out of the parent and into the group in one step; the
    /// group takes the position of the first wrapped child.
    pub fn wrap(&mut self, parent: NodeId, run: &[NodeId]) -> Option<NodeId> {
        let siblings = self.nodes[parent.0].children.clone();
        let start = siblings.iter().position(|id| Some(id) == run.first())?;
        if start + run.len() > siblings.len() || siblings[start..start + run.len()] != *run {
            return None;
        }

        self.group_count += 1;
        let name = format!("{}_group{}", self.nodes[parent.0].name, self.group_count);
        let id = NodeId(self.nodes.len());
        let mut group = Node::new(id, name, NodeRole::Element);
        group.group = true;
        group.parent = Some(parent);
        group.span = self.nodes[run[0].0].span.clone();
        group.text_align = self.nodes[parent.0].text_align;
        group.rtl = self.nodes[parent.0].rtl;
        group.font_size = self.nodes[run[0].0].font_size;
        group.line_height = self.nodes[run[0].0].line_height;

        // line breaks carry no geometry of their own
        let mut measured = run
            .iter()
            .filter(|m| !self.nodes[m.0].is_line_break())
            .map(|m| self.nodes[m.0].linear());
        if let Some(first) = measured.next() {
            group.bounds = measured.fold(first, |acc, b| acc.union(&b));
        }

        let members: Vec<&Node> = run.iter().map(|m| &self.nodes[m.0]).collect();
        group.display = if members.iter().any(|m| m.block_static()) {
            Display::Block
        } else {
            Display::InlineBlock
        };
        let first_float = members[0].float_side();
        if first_float.is_some() && members.iter().all(|m| m.float_side() == first_float) {
            group.float = first_float;
        }
        group.children = run.to_vec();
        self.nodes.push(group);

        for (index, member) in run.iter().enumerate() {
            let node = &mut self.nodes[member.0];
            node.parent = Some(id);
            node.child_index = index;
        }

        let mut remaining: Vec<NodeId> = Vec::with_capacity(siblings.len() - run.len() + 1);
        remaining.extend_from_slice(&siblings[..start]);
        remaining.push(id);
        remaining.extend_from_slice(&siblings[start + run.len()..]);
        for (index, child) in remaining.iter().enumerate() {
            self.nodes[child.0].child_index = index;
        }
        self.nodes[parent.0].children = remaining;
        Some(id)
    }

    /// Register a guideline or barrier as a sibling entry under `parent`
    pub fn add_helper(&mut self, parent: NodeId, kind: HelperKind) -> HelperId {
        let id = HelperId(self.helpers.len());
        let prefix = match kind {
            HelperKind::Guideline { .. } => "guideline",
            HelperKind::Barrier { .. } => "barrier",
        };
        let name = format!("{}_{}{}", self.nodes[parent.0].name, prefix, id.0);
        self.helpers.push(Helper {
            id,
            parent,
            name,
            kind,
        });
        self.nodes[parent.0].helpers.push(id);
        id
    }

    /// Display name of an anchor target
    pub fn target_name(&self, target: AnchorTarget) -> String {
        match target {
            AnchorTarget::Parent => "parent".to_string(),
            AnchorTarget::Node(id) => self.get(id).name.clone(),
            AnchorTarget::Helper(id) => self.helper(id).name.clone(),
        }
    }

    pub fn helper(&self, id: HelperId) -> &Helper {
        &self.helpers[id.0]
    }

    pub fn helpers(&self) -> &[Helper] {
        &self.helpers
    }
}
