//! Turn a parsed box-facts sheet into a [`NodeTree`]

use std::collections::HashMap;

use log::debug;

use crate::parser::ast::{BoxDecl, BoxKind, Document, Property, Span, Spanned, Value};

use super::error::LayoutError;
use super::types::*;

/// Every property key a box accepts
pub const KNOWN_KEYS: &[&str] = &[
    "x",
    "y",
    "width",
    "height",
    "margin",
    "margin_top",
    "margin_right",
    "margin_bottom",
    "margin_left",
    "padding",
    "padding_top",
    "padding_right",
    "padding_bottom",
    "padding_left",
    "border",
    "border_top",
    "border_right",
    "border_bottom",
    "border_left",
    "display",
    "position",
    "float",
    "clear",
    "top",
    "right",
    "bottom",
    "left",
    "css_width",
    "css_height",
    "max_width",
    "text_align",
    "vertical_align",
    "font_size",
    "line_height",
    "text_indent",
    "dir",
    "baseline",
    "baseline_offset",
    "text_source",
    "natural_width",
    "natural_height",
    "flex",
    "wrap",
    "justify",
    "align_items",
    "row_gap",
    "column_gap",
    "grow",
    "shrink",
    "basis",
    "align_self",
];

/// Build the node arena from a parsed sheet.
///
/// The sheet must contain exactly one top-level box.
pub fn build_tree(doc: &Document) -> Result<NodeTree, LayoutError> {
    let root = match doc.boxes.as_slice() {
        [] => return Err(LayoutError::EmptyDocument),
        [root] => root,
        [_, second, ..] => {
            return Err(LayoutError::MultipleRoots {
                count: doc.boxes.len(),
                span: second.span.clone(),
            })
        }
    };

    let mut builder = TreeBuilder::default();
    builder.add(root, None)?;
    debug!("built node tree with {} nodes", builder.tree.len());
    Ok(builder.tree)
}

#[derive(Default)]
struct TreeBuilder {
    tree: NodeTree,
    names: HashMap<String, Span>,
    anonymous: usize,
}

/// Flex container keys seen on one box, applied after all properties
#[derive(Default)]
struct PendingFlex {
    direction: Option<FlexDirection>,
    wrap: Option<bool>,
    justify: Option<JustifyContent>,
    align_items: Option<AlignItems>,
    row_gap: Option<f64>,
    column_gap: Option<f64>,
    display_set: bool,
}

impl PendingFlex {
    fn any(&self) -> bool {
        self.direction.is_some()
            || self.wrap.is_some()
            || self.justify.is_some()
            || self.align_items.is_some()
            || self.row_gap.is_some()
            || self.column_gap.is_some()
    }
}

impl TreeBuilder {
    fn add(&mut self, decl: &Spanned<BoxDecl>, parent: Option<NodeId>) -> Result<NodeId, LayoutError> {
        let name = match &decl.node.name {
            Some(name) => {
                if let Some(first) = self.names.get(&name.node) {
                    return Err(LayoutError::DuplicateName {
                        name: name.node.clone(),
                        span: name.span.clone(),
                        first: first.clone(),
                    });
                }
                self.names.insert(name.node.clone(), name.span.clone());
                name.node.clone()
            }
            None => {
                self.anonymous += 1;
                format!("{}{}", decl.node.kind.node, self.anonymous)
            }
        };

        let role = match decl.node.kind.node {
            BoxKind::Box => NodeRole::Element,
            BoxKind::Text => NodeRole::Text,
            BoxKind::Image => NodeRole::Image,
            BoxKind::Input => NodeRole::Control,
            BoxKind::Br => NodeRole::LineBreak,
        };

        let id = self.tree.add_node(name, role, parent);
        {
            let node = self.tree.get_mut(id);
            node.span = decl.span.clone();
            node.text = decl.node.text.as_ref().map(|t| t.node.clone());
            let mut pending = PendingFlex::default();
            for property in &decl.node.properties {
                apply_property(node, &property.node, &mut pending)?;
            }
            finish_flex(node, pending);
        }

        for child in &decl.node.children {
            self.add(child, Some(id))?;
        }
        Ok(id)
    }
}

fn finish_flex(node: &mut Node, pending: PendingFlex) {
    let is_flex_display = matches!(node.display, Display::Flex | Display::InlineFlex);
    if !pending.any() && !is_flex_display {
        return;
    }
    let mut container = FlexContainer::new(pending.direction.unwrap_or(FlexDirection::Row));
    container.wrap = pending.wrap.unwrap_or(false);
    container.justify = pending.justify.unwrap_or_default();
    container.align_items = pending.align_items.unwrap_or_default();
    container.row_gap = pending.row_gap.unwrap_or(0.0);
    container.column_gap = pending.column_gap.unwrap_or(0.0);
    node.flex_container = Some(container);
    if !pending.display_set {
        node.display = Display::Flex;
    }
}

fn apply_property(node: &mut Node, prop: &Property, pending: &mut PendingFlex) -> Result<(), LayoutError> {
    let key = prop.key.node.as_str();
    match key {
        "x" => node.bounds.x = number(prop)?,
        "y" => node.bounds.y = number(prop)?,
        "width" => node.bounds.width = non_negative(prop)?,
        "height" => node.bounds.height = non_negative(prop)?,

        "margin" => {
            for edge in [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left] {
                set_margin(node, edge, prop)?;
            }
        }
        "margin_top" => set_margin(node, Edge::Top, prop)?,
        "margin_right" => set_margin(node, Edge::Right, prop)?,
        "margin_bottom" => set_margin(node, Edge::Bottom, prop)?,
        "margin_left" => set_margin(node, Edge::Left, prop)?,

        "padding" => node.padding = BoxEdges::uniform(non_negative(prop)?),
        "padding_top" => node.padding.top = non_negative(prop)?,
        "padding_right" => node.padding.right = non_negative(prop)?,
        "padding_bottom" => node.padding.bottom = non_negative(prop)?,
        "padding_left" => node.padding.left = non_negative(prop)?,

        "border" => node.border = BoxEdges::uniform(non_negative(prop)?),
        "border_top" => node.border.top = non_negative(prop)?,
        "border_right" => node.border.right = non_negative(prop)?,
        "border_bottom" => node.border.bottom = non_negative(prop)?,
        "border_left" => node.border.left = non_negative(prop)?,

        "display" => {
            node.display = match keyword(prop)? {
                "block" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" | "inline_block" => Display::InlineBlock,
                "flex" => Display::Flex,
                "inline-flex" | "inline_flex" => Display::InlineFlex,
                "grid" => Display::Grid,
                "table" => Display::Table,
                "list-item" | "list_item" => Display::ListItem,
                _ => return Err(bad_keyword(prop, "block, inline, inline-block, flex, inline-flex, grid, table or list-item")),
            };
            pending.display_set = true;
        }
        "position" => {
            node.position = match keyword(prop)? {
                "static" => Position::Static,
                "relative" => Position::Relative,
                "absolute" => Position::Absolute,
                "fixed" => Position::Fixed,
                _ => return Err(bad_keyword(prop, "static, relative, absolute or fixed")),
            }
        }
        "float" => {
            node.float = match keyword(prop)? {
                "left" => Some(FloatSide::Left),
                "right" => Some(FloatSide::Right),
                "none" => None,
                _ => return Err(bad_keyword(prop, "left, right or none")),
            }
        }
        "clear" => {
            node.clear = match keyword(prop)? {
                "left" => Some(ClearSide::Left),
                "right" => Some(ClearSide::Right),
                "both" => Some(ClearSide::Both),
                "none" => None,
                _ => return Err(bad_keyword(prop, "left, right, both or none")),
            }
        }

        "top" => node.insets.top = dimension(prop, false)?,
        "right" => node.insets.right = dimension(prop, false)?,
        "bottom" => node.insets.bottom = dimension(prop, false)?,
        "left" => node.insets.left = dimension(prop, false)?,
        "css_width" => node.css_width = dimension(prop, true)?,
        "css_height" => node.css_height = dimension(prop, true)?,
        "max_width" => node.max_width = Some(non_negative(prop)?),

        "text_align" => {
            node.text_align = match keyword(prop)? {
                "left" | "start" => TextAlign::Start,
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::End,
                "justify" => TextAlign::Justify,
                _ => return Err(bad_keyword(prop, "left, center, right or justify")),
            }
        }
        "vertical_align" => {
            node.vertical_align = match &prop.value.node {
                Value::Number(n) => VerticalAlign::Length(*n),
                Value::Keyword(k) => match k.as_str() {
                    "baseline" => VerticalAlign::Baseline,
                    "top" => VerticalAlign::Top,
                    "text-top" | "text_top" => VerticalAlign::TextTop,
                    "middle" => VerticalAlign::Middle,
                    "bottom" => VerticalAlign::Bottom,
                    "text-bottom" | "text_bottom" => VerticalAlign::TextBottom,
                    "sub" => VerticalAlign::Sub,
                    "super" => VerticalAlign::Super,
                    _ => return Err(bad_keyword(prop, "a vertical-align keyword or a length")),
                },
                _ => return Err(bad_keyword(prop, "a vertical-align keyword or a length")),
            }
        }
        "font_size" => node.font_size = non_negative(prop)?,
        "line_height" => node.line_height = non_negative(prop)?,
        "text_indent" => node.text_indent = number(prop)?,
        "dir" => {
            node.rtl = match keyword(prop)? {
                "ltr" => false,
                "rtl" => true,
                _ => return Err(bad_keyword(prop, "ltr or rtl")),
            }
        }
        "baseline" => node.baseline_eligible = boolean(prop)?,
        "baseline_offset" => node.baseline_offset = Some(number(prop)?),
        "text_source" => {
            node.text_source = Some(match &prop.value.node {
                Value::String(s) | Value::Keyword(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Percent(_) => return Err(bad_keyword(prop, "a name")),
            })
        }
        "natural_width" => node.natural_width = Some(non_negative(prop)?),
        "natural_height" => node.natural_height = Some(non_negative(prop)?),

        "flex" => {
            pending.direction = Some(match keyword(prop)? {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => return Err(bad_keyword(prop, "row or column")),
            })
        }
        "wrap" => {
            pending.wrap = Some(match &prop.value.node {
                Value::Keyword(k) if k == "wrap" => true,
                Value::Keyword(k) if k == "nowrap" => false,
                _ => boolean(prop)?,
            })
        }
        "justify" => {
            pending.justify = Some(match keyword(prop)? {
                "start" | "flex-start" | "left" => JustifyContent::Start,
                "end" | "flex-end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => return Err(bad_keyword(prop, "start, end, center, space-between, space-around or space-evenly")),
            })
        }
        "align_items" => pending.align_items = Some(align(prop)?),
        "row_gap" => pending.row_gap = Some(non_negative(prop)?),
        "column_gap" => pending.column_gap = Some(non_negative(prop)?),
        "grow" => node.flex.grow = non_negative(prop)?,
        "shrink" => node.flex.shrink = non_negative(prop)?,
        "basis" => node.flex.basis = dimension(prop, true)?,
        "align_self" => {
            node.flex.align_self = match &prop.value.node {
                Value::Keyword(k) if k == "auto" => None,
                _ => Some(align(prop)?),
            }
        }

        _ => {
            return Err(LayoutError::unknown_key(
                key,
                prop.key.span.clone(),
                find_similar(KNOWN_KEYS, key, 2),
            ))
        }
    }
    Ok(())
}

fn set_margin(node: &mut Node, edge: Edge, prop: &Property) -> Result<(), LayoutError> {
    let auto = matches!(&prop.value.node, Value::Keyword(k) if k == "auto");
    let value = if auto { 0.0 } else { number(prop)? };
    node.margin.set(edge, value);
    match edge {
        Edge::Top => node.auto_margin.top = auto,
        Edge::Right => node.auto_margin.right = auto,
        Edge::Bottom => node.auto_margin.bottom = auto,
        Edge::Left => node.auto_margin.left = auto,
    }
    Ok(())
}

fn align(prop: &Property) -> Result<AlignItems, LayoutError> {
    Ok(match keyword(prop)? {
        "start" | "flex-start" => AlignItems::Start,
        "end" | "flex-end" => AlignItems::End,
        "center" => AlignItems::Center,
        "stretch" => AlignItems::Stretch,
        "baseline" => AlignItems::Baseline,
        _ => return Err(bad_keyword(prop, "start, end, center, stretch or baseline")),
    })
}

fn number(prop: &Property) -> Result<f64, LayoutError> {
    match &prop.value.node {
        Value::Number(n) => Ok(*n),
        other => Err(wrong_type(prop, other, "a number")),
    }
}

fn non_negative(prop: &Property) -> Result<f64, LayoutError> {
    let value = number(prop)?;
    if value < 0.0 {
        return Err(LayoutError::negative_size(
            prop.key.node.clone(),
            value,
            prop.value.span.clone(),
        ));
    }
    Ok(value)
}

fn keyword(prop: &Property) -> Result<&str, LayoutError> {
    match &prop.value.node {
        Value::Keyword(k) => Ok(k.as_str()),
        other => Err(wrong_type(prop, other, "a keyword")),
    }
}

fn boolean(prop: &Property) -> Result<bool, LayoutError> {
    match keyword(prop)? {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(bad_keyword(prop, "true or false")),
    }
}

/// Pixel length, percentage or `auto`
fn dimension(prop: &Property, size: bool) -> Result<Dimension, LayoutError> {
    match &prop.value.node {
        Value::Number(n) if size && *n < 0.0 => Err(LayoutError::negative_size(
            prop.key.node.clone(),
            *n,
            prop.value.span.clone(),
        )),
        Value::Number(n) => Ok(Dimension::Px(*n)),
        Value::Percent(p) => {
            if !(0.0..=100.0).contains(p) {
                return Err(LayoutError::percent_out_of_range(
                    prop.key.node.clone(),
                    *p,
                    prop.value.span.clone(),
                ));
            }
            Ok(Dimension::Percent(p / 100.0))
        }
        Value::Keyword(k) if k == "auto" => Ok(Dimension::Auto),
        other => Err(wrong_type(prop, other, "a length, a percentage or auto")),
    }
}

fn wrong_type(prop: &Property, found: &Value, expected: &str) -> LayoutError {
    LayoutError::invalid_value(
        prop.key.node.clone(),
        format!("{} ({})", found, found.describe()),
        expected,
        prop.value.span.clone(),
    )
}

fn bad_keyword(prop: &Property, expected: &str) -> LayoutError {
    LayoutError::invalid_value(
        prop.key.node.clone(),
        prop.value.node.to_string(),
        expected,
        prop.value.span.clone(),
    )
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();
    if a_chars.is_empty() {
        return n;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Find known names within `max_distance` edits of `target`, closest first
fn find_similar(known: &[&str], target: &str, max_distance: usize) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = known
        .iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= max_distance && dist > 0).then_some((*name, dist))
        })
        .collect();

    candidates.sort_by_key(|(_, d)| *d);
    candidates
        .into_iter()
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn build(source: &str) -> Result<NodeTree, LayoutError> {
        build_tree(&parse(source).expect("sheet should parse"))
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("width", "width"), 0);
        assert_eq!(levenshtein_distance("widht", "width"), 2);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("float", "flat"), 1);
    }

    #[test]
    fn test_build_geometry_and_flow() {
        let tree = build(
            r#"
            box root [x: 0, y: 0, width: 400, height: 100] {
                box a [x: 0, y: 0, width: 100, height: 20, float: left, margin: 4]
                text t "hi" [x: 108, y: 0, width: 40, height: 20, vertical_align: middle]
            }
            "#,
        )
        .unwrap();

        let root = tree.root().unwrap();
        assert_eq!(tree.children(root).len(), 2);
        let a = tree.get(tree.find("a").unwrap());
        assert_eq!(a.float, Some(FloatSide::Left));
        assert_eq!(a.margin, BoxEdges::uniform(4.0));
        assert!(a.floating());
        let t = tree.get(tree.find("t").unwrap());
        assert_eq!(t.role, NodeRole::Text);
        assert_eq!(t.text.as_deref(), Some("hi"));
        assert_eq!(t.vertical_align, VerticalAlign::Middle);
        assert!(t.inline_flow());
    }

    #[test]
    fn test_auto_margin_and_percent() {
        let tree = build("box r { box a [margin_left: auto, margin_right: auto, css_width: 25%] }").unwrap();
        let a = tree.get(tree.find("a").unwrap());
        assert!(a.center_aligned());
        assert_eq!(a.percent_width(), Some(0.25));
    }

    #[test]
    fn test_flex_container_defaults() {
        let tree = build("box r [flex: row, justify: space-between] { box a [grow: 1, basis: 0] }").unwrap();
        let r = tree.get(tree.root().unwrap());
        assert_eq!(r.display, Display::Flex);
        let flex = r.flex_container.unwrap();
        assert_eq!(flex.direction, FlexDirection::Row);
        assert_eq!(flex.justify, JustifyContent::SpaceBetween);
        let a = tree.get(tree.find("a").unwrap());
        assert_eq!(a.flex.grow, 1.0);
        assert_eq!(a.flex.basis, Dimension::Px(0.0));
        assert!(!a.flex.is_default());
    }

    #[test]
    fn test_display_flex_implies_container() {
        let tree = build("box r [display: flex]").unwrap();
        assert!(tree.get(tree.root().unwrap()).flex_container.is_some());
    }

    #[test]
    fn test_anonymous_names() {
        let tree = build("box { box box }").unwrap();
        let names: Vec<_> = tree.iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["box1", "box2", "box3"]);
    }

    #[test]
    fn test_unknown_key_suggests() {
        let err = build("box a [widht: 10]").unwrap_err();
        let first = err.suggestions().and_then(|s| s.first()).map(String::as_str);
        assert_eq!(first, Some("width"));
    }

    #[test]
    fn test_wrong_value_type() {
        let err = build(r#"box a [width: "wide"]"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidValue { ref key, .. } if key == "width"));
    }

    #[test]
    fn test_percent_out_of_range() {
        let err = build("box a [css_width: 150%]").unwrap_err();
        assert!(matches!(err, LayoutError::PercentOutOfRange { value, .. } if value == 150.0));
    }

    #[test]
    fn test_negative_size() {
        let err = build("box a [padding: -1]").unwrap_err();
        assert!(matches!(err, LayoutError::NegativeSize { .. }));
    }

    #[test]
    fn test_negative_margin_allowed() {
        let tree = build("box a [margin_top: -8]").unwrap();
        assert!(tree.get(tree.root().unwrap()).has_negative_margin());
    }

    #[test]
    fn test_duplicate_name() {
        let err = build("box r { box a box a }").unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateName { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_root_count() {
        assert_eq!(build("").unwrap_err(), LayoutError::EmptyDocument);
        assert!(matches!(
            build("box a box b").unwrap_err(),
            LayoutError::MultipleRoots { count: 2, .. }
        ));
    }
}
