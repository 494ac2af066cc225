//! Attribute-per-line dump of a resolved tree

use std::fmt::Display;

use crate::layout::{Axis, HelperId, HelperKind, Node, NodeId, NodeTree};

use super::ReportConfig;

/// Build report lines incrementally
struct ReportBuilder<'a> {
    tree: &'a NodeTree,
    config: &'a ReportConfig,
    lines: Vec<String>,
}

impl<'a> ReportBuilder<'a> {
    fn new(tree: &'a NodeTree, config: &'a ReportConfig) -> Self {
        Self {
            tree,
            config,
            lines: vec![],
        }
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        let indent = " ".repeat(depth * self.config.indent);
        self.lines.push(format!("{}{}", indent, text.as_ref()));
    }

    fn attribute(&mut self, depth: usize, key: &str, value: impl Display) {
        self.line(depth, format!("{} -> {}", key, value));
    }

    fn header(&self, node: &Node) -> String {
        let mut header = node.name.clone();
        if let Some(kind) = node.container {
            header.push_str(&format!(" : {}", kind));
        }
        if self.config.show_geometry {
            let b = node.bounds;
            header.push_str(&format!(" @ {},{} {}x{}", b.x, b.y, b.width, b.height));
        }
        header
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let tree = self.tree;
        let node = tree.get(id);
        let params = &node.params;
        let inner = depth + 1;
        self.line(depth, self.header(node));

        if let Some(text) = &node.text {
            self.attribute(inner, "text", format!("{:?}", text));
        }
        if !node.flags.is_empty() {
            self.attribute(inner, "flags", node.flags);
        }
        if node.collapsed {
            self.attribute(inner, "collapsed", true);
        }
        self.attribute(inner, "width", params.width);
        self.attribute(inner, "height", params.height);

        for (position, anchor) in &node.constraint.current {
            let target = tree.target_name(anchor.target);
            if anchor.margin == 0.0 {
                self.attribute(inner, position.attribute(), target);
            } else {
                let value = format!("{} margin={}", target, anchor.margin);
                self.attribute(inner, position.attribute(), value);
            }
        }
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if let Some(style) = params.chain_style(axis) {
                self.attribute(inner, &format!("{}-chain-style", axis), style);
            }
            if let Some(bias) = params.bias(axis) {
                self.attribute(inner, &format!("{}-bias", axis), bias);
            }
            if let Some(weight) = params.weight(axis) {
                self.attribute(inner, &format!("{}-weight", axis), weight);
            }
        }

        let m = params.margin;
        if m.top != 0.0 || m.right != 0.0 || m.bottom != 0.0 || m.left != 0.0 {
            let value = format!("{} {} {} {}", m.top, m.right, m.bottom, m.left);
            self.attribute(inner, "margin", value);
        }
        if let Some(gravity) = params.gravity {
            self.attribute(inner, "gravity", gravity);
        }
        if let Some(aligned) = params.baseline_aligned {
            self.attribute(inner, "baseline-aligned", aligned);
        }
        if let Some(columns) = params.grid_columns {
            self.attribute(inner, "column-count", columns);
        }
        if let Some((row, column)) = params.grid_cell {
            self.attribute(inner, "cell", format!("{},{}", row, column));
        }

        for &child in &node.children {
            self.node(child, inner);
        }
        if self.config.show_helpers {
            for &helper in &node.helpers {
                self.helper(helper, inner);
            }
        }
    }

    fn helper(&mut self, id: HelperId, depth: usize) {
        let tree = self.tree;
        let helper = tree.helper(id);
        match &helper.kind {
            HelperKind::Guideline { axis, offset } => {
                self.line(depth, format!("{} : guideline", helper.name));
                self.attribute(depth + 1, "axis", axis);
                self.line(depth + 1, offset.to_string());
            }
            HelperKind::Barrier { edge, referenced } => {
                self.line(depth, format!("{} : barrier", helper.name));
                self.attribute(depth + 1, "barrier-direction", edge);
                let names: Vec<&str> = referenced.iter().map(|r| tree.get(*r).name.as_str()).collect();
                self.attribute(depth + 1, "referenced-ids", names.join(", "));
            }
        }
    }

    fn build(mut self) -> String {
        if let Some(root) = self.tree.root() {
            self.node(root, 0);
        }
        let mut output = self.lines.join("\n");
        if !output.is_empty() {
            output.push('\n');
        }
        output
    }
}

/// Render the emitted attributes of every node below the root
pub fn render_report(tree: &NodeTree, config: &ReportConfig) -> String {
    ReportBuilder::new(tree, config).build()
}
