//! Visual-tree arena.
//!
//! The external typesetting engine produces a tree of visual nodes; this
//! module owns the arena those nodes live in. The session layer mutates
//! node styling in place (fill colors, error styling, font size stamp) and
//! exports the tree as markup for the host; the matcher reads it.
//!
//! # Design
//!
//! - Nodes are keyed by [`NodeId`] in a slotmap; matches and paint targets
//!   are id lists, never borrows, so styling can mutate freely.
//! - At most one tree is live per session: the store owns an
//!   `Option<VisualTree>` and replacing it drops the previous arena,
//!   invalidating every outstanding id.

use std::fmt::Write as _;

use slotmap::{
  SecondaryMap,
  SlotMap,
  new_key_type,
};

new_key_type! {
  /// Key of one visual node inside its owning [`VisualTree`].
  pub struct NodeId;
}

/// Fixed fill applied to error/placeholder nodes, regardless of any
/// requested styling.
pub const ERROR_FILL: &str = "CC0000";
/// Fixed background applied to error/placeholder nodes.
pub const ERROR_BACKGROUND: &str = "FFEEEE";

/// Layout origin of a node on the output surface, in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// One node of the rendered visual tree.
///
/// `tag` and `node_type` come straight from the engine output; `literal`
/// carries the single rendered character for token nodes. Structure
/// (children/parent) is owned by the arena, not the node.
#[derive(Debug, Clone, Default)]
pub struct VisualNode {
  pub tag:       String,
  pub node_type: Option<String>,
  pub literal:   Option<String>,
  pub origin:    Option<Point>,
  pub fill:      Option<String>,
  pub is_error:  bool,
  children:      Vec<NodeId>,
  parent:        Option<NodeId>,
}

impl VisualNode {
  pub fn new(tag: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      ..Default::default()
    }
  }

  pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
    self.node_type = Some(node_type.into());
    self
  }

  pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
    self.literal = Some(literal.into());
    self
  }

  pub fn with_origin(mut self, origin: Point) -> Self {
    self.origin = Some(origin);
    self
  }

  pub fn error(mut self) -> Self {
    self.is_error = true;
    self
  }
}

/// Arena of visual nodes plus tree-wide presentation state.
#[derive(Debug, Clone)]
pub struct VisualTree {
  nodes:      SlotMap<NodeId, VisualNode>,
  root:       NodeId,
  background: Option<String>,
  font_size:  Option<f32>,
}

impl VisualTree {
  pub fn new(root: VisualNode) -> Self {
    let mut nodes = SlotMap::with_key();
    let root = nodes.insert(root);
    Self {
      nodes,
      root,
      background: None,
      font_size: None,
    }
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn node(&self, id: NodeId) -> Option<&VisualNode> {
    self.nodes.get(id)
  }

  pub fn node_mut(&mut self, id: NodeId) -> Option<&mut VisualNode> {
    self.nodes.get_mut(id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Append a child under `parent`, returning the new node's id.
  pub fn add_child(&mut self, parent: NodeId, node: VisualNode) -> NodeId {
    debug_assert!(self.nodes.contains_key(parent));
    let id = self.nodes.insert(node);
    if let Some(node) = self.nodes.get_mut(id) {
      node.parent = Some(parent);
    }
    if let Some(parent) = self.nodes.get_mut(parent) {
      parent.children.push(id);
    }
    id
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    self
      .nodes
      .get(id)
      .map(|node| node.children.as_slice())
      .unwrap_or(&[])
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id).and_then(|node| node.parent)
  }

  /// The sibling immediately after `id` under the same parent.
  pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
    let parent = self.parent(id)?;
    let siblings = self.children(parent);
    let index = siblings.iter().position(|&sibling| sibling == id)?;
    siblings.get(index + 1).copied()
  }

  /// Preorder traversal of the subtree rooted at `id`, including `id`.
  pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
      if !self.nodes.contains_key(id) {
        continue;
      }
      out.push(id);
      for &child in self.children(id).iter().rev() {
        stack.push(child);
      }
    }
    out
  }

  /// Document-order rank of every node, computed by preorder traversal
  /// from the root.
  pub fn preorder_ranks(&self) -> SecondaryMap<NodeId, usize> {
    let mut ranks = SecondaryMap::new();
    for (rank, id) in self.descendants(self.root).into_iter().enumerate() {
      ranks.insert(id, rank);
    }
    ranks
  }

  /// The first node tagged `math` (the engine's formula wrapper), falling
  /// back to the root when the engine output has no such wrapper.
  pub fn math_root(&self) -> NodeId {
    self
      .descendants(self.root)
      .into_iter()
      .find(|&id| {
        self
          .node(id)
          .is_some_and(|node| node.tag == "math")
      })
      .unwrap_or(self.root)
  }

  /// Set the fill color on `id` and recursively on everything beneath it.
  ///
  /// Error/placeholder nodes are skipped: they keep their fixed error
  /// styling no matter what color the caller requested.
  pub fn set_fill_subtree(&mut self, id: NodeId, color: &str) {
    for id in self.descendants(id) {
      if let Some(node) = self.nodes.get_mut(id) {
        if node.is_error {
          continue;
        }
        node.fill = Some(color.to_string());
      }
    }
  }

  /// Set the base fill color on the whole tree, skipping error nodes.
  pub fn set_fill_all(&mut self, color: &str) {
    let root = self.root;
    self.set_fill_subtree(root, color);
  }

  /// Stamp the fixed error styling onto every error node's subtree.
  pub fn apply_error_styling(&mut self) {
    let error_roots: Vec<NodeId> = self
      .descendants(self.root)
      .into_iter()
      .filter(|&id| self.node(id).is_some_and(|node| node.is_error))
      .collect();
    for id in error_roots {
      for id in self.descendants(id) {
        if let Some(node) = self.nodes.get_mut(id) {
          node.fill = Some(ERROR_FILL.to_string());
        }
      }
    }
  }

  pub fn set_background(&mut self, color: &str) {
    self.background = Some(color.to_string());
  }

  pub fn background(&self) -> Option<&str> {
    self.background.as_deref()
  }

  pub fn stamp_font_size(&mut self, size: f32) {
    self.font_size = Some(size);
  }

  pub fn font_size(&self) -> Option<f32> {
    self.font_size
  }

  /// Export the tree as markup for the host artifact.
  ///
  /// Shape: nested elements with the engine tags, `data-type` for the
  /// semantic node type, `data-c` for literal characters, and inline
  /// `style` for fills. This is the exportable form carried by the sync
  /// update; the host rasterizes it.
  pub fn to_markup(&self) -> String {
    let mut out = String::new();
    if self.font_size.is_some() || self.background.is_some() {
      out.push_str("<formula style=\"");
      if let Some(size) = self.font_size {
        let _ = write!(out, "font-size:{size}px;");
      }
      if let Some(background) = &self.background {
        let _ = write!(out, "background:#{background};");
      }
      out.pop();
      out.push_str("\">");
    } else {
      out.push_str("<formula>");
    }
    self.write_markup(self.root, &mut out);
    out.push_str("</formula>");
    out
  }

  fn write_markup(&self, id: NodeId, out: &mut String) {
    let Some(node) = self.node(id) else {
      return;
    };
    let _ = write!(out, "<{}", node.tag);
    if let Some(node_type) = &node.node_type {
      let _ = write!(out, r#" data-type="{node_type}""#);
    }
    if let Some(literal) = &node.literal {
      let _ = write!(out, r#" data-c="{literal}""#);
    }
    match (&node.fill, node.is_error) {
      (_, true) => {
        let _ = write!(
          out,
          r##" style="color:#{ERROR_FILL};background:#{ERROR_BACKGROUND}""##
        );
      },
      (Some(fill), false) => {
        let _ = write!(out, r##" style="color:#{fill}""##);
      },
      (None, false) => {},
    }
    out.push('>');
    if let Some(literal) = &node.literal {
      out.push_str(literal);
    }
    for &child in self.children(id) {
      self.write_markup(child, out);
    }
    let _ = write!(out, "</{}>", node.tag);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn token(tree: &mut VisualTree, parent: NodeId, tag: &str, literal: &str) -> NodeId {
    tree.add_child(parent, VisualNode::new(tag).with_literal(literal))
  }

  #[test]
  fn preorder_ranks_follow_document_order() {
    let mut tree = VisualTree::new(VisualNode::new("math"));
    let root = tree.root();
    let a = token(&mut tree, root, "mi", "a");
    let plus = token(&mut tree, root, "mo", "+");
    let frac = tree.add_child(root, VisualNode::new("mfrac"));
    let b = token(&mut tree, frac, "mi", "b");

    let ranks = tree.preorder_ranks();
    assert_eq!(ranks[root], 0);
    assert_eq!(ranks[a], 1);
    assert_eq!(ranks[plus], 2);
    assert_eq!(ranks[frac], 3);
    assert_eq!(ranks[b], 4);
  }

  #[test]
  fn next_sibling_walks_forward_only() {
    let mut tree = VisualTree::new(VisualNode::new("math"));
    let root = tree.root();
    let a = token(&mut tree, root, "mi", "a");
    let b = token(&mut tree, root, "mi", "b");

    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.next_sibling(b), None);
    assert_eq!(tree.next_sibling(root), None);
  }

  #[test]
  fn fill_skips_error_nodes() {
    let mut tree = VisualTree::new(VisualNode::new("math"));
    let root = tree.root();
    let a = token(&mut tree, root, "mi", "a");
    let err = tree.add_child(root, VisualNode::new("merror").error());

    tree.set_fill_all("1A2B3C");
    assert_eq!(tree.node(a).unwrap().fill.as_deref(), Some("1A2B3C"));
    assert_eq!(tree.node(err).unwrap().fill, None);

    tree.apply_error_styling();
    assert_eq!(tree.node(err).unwrap().fill.as_deref(), Some(ERROR_FILL));
  }

  #[test]
  fn markup_carries_styling_and_literals() {
    let mut tree = VisualTree::new(VisualNode::new("math"));
    let root = tree.root();
    token(&mut tree, root, "mi", "x");
    tree.stamp_font_size(16.0);
    tree.set_background("FFFFFF");
    tree.set_fill_all("000000");

    let markup = tree.to_markup();
    assert!(markup.starts_with("<formula "));
    assert!(markup.contains("font-size:16px"));
    assert!(markup.contains("background:#FFFFFF"));
    assert!(markup.contains(r##"<mi data-c="x" style="color:#000000">x</mi>"##));
  }

  #[test]
  fn markup_keeps_background_without_a_font_size() {
    let mut tree = VisualTree::new(VisualNode::new("math"));
    let root = tree.root();
    token(&mut tree, root, "mi", "x");
    tree.set_background("2C2C2C");

    let markup = tree.to_markup();
    assert!(markup.starts_with(r##"<formula style="background:#2C2C2C">"##));

    // And neither attribute yields a bare wrapper.
    let plain = VisualTree::new(VisualNode::new("math"));
    assert!(plain.to_markup().starts_with("<formula>"));
  }
}
