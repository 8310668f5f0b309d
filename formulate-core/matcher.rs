//! Sub-expression tree matching.
//!
//! Given a rendered main tree and a rendered reference tree, find every
//! occurrence of the reference inside the main tree. Two complementary
//! match kinds are searched during a single depth-first traversal:
//!
//! - **deep match**: a main node's entire subtree structurally equals the
//!   reference root's subtree; yields a one-node match.
//! - **sequential run match**: a contiguous forward run of siblings
//!   corresponds, in lock-step, to the reference root's top-level children
//!   (each pair deep-equal). This catches a sub-expression spread across
//!   adjacent tokens that the engine never wrapped in one group node, e.g.
//!   `a+b` rendered as three siblings.
//!
//! The traversal covers every node strictly below the main root, so nested
//! and repeated occurrences are all discovered; the main root wrapper
//! itself is the document, not an occurrence. Zero matches is a valid
//! outcome, not an error; the caller decides whether it is reportable.

use std::cmp::Ordering;

use smallvec::SmallVec;
use thiserror::Error;

use crate::tree::{
  NodeId,
  Point,
  VisualTree,
};

/// One occurrence: an ordered, non-empty list of sibling node ids in the
/// main tree.
pub type Match = SmallVec<[NodeId; 4]>;

/// Vertical band within which two matches count as being on the same line.
pub const LINE_TOLERANCE: f64 = 1.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
  /// The reference tree has no renderable content under its root.
  #[error("reference expression rendered to an empty tree")]
  EmptyReference,
}

/// Find all occurrences of `reference` (rooted at `ref_root`) inside the
/// subtree of `main` rooted at `main_root`, sorted in reading order.
pub fn find_matches(
  main: &VisualTree,
  main_root: NodeId,
  reference: &VisualTree,
  ref_root: NodeId,
) -> Result<Vec<Match>, MatchError> {
  let ref_node = reference.node(ref_root).ok_or(MatchError::EmptyReference)?;
  if reference.children(ref_root).is_empty() && ref_node.literal.is_none() {
    return Err(MatchError::EmptyReference);
  }

  let ref_children = reference.children(ref_root);
  let mut matches: Vec<Match> = Vec::new();

  for candidate in main.descendants(main_root) {
    if candidate == main_root {
      continue;
    }

    if subtree_equal(main, candidate, reference, ref_root) {
      matches.push(SmallVec::from_slice(&[candidate]));
    }

    if let Some(run) = sibling_run(main, candidate, reference, ref_children) {
      if matches.last() != Some(&run) {
        matches.push(run);
      }
    }
  }

  let ranks = main.preorder_ranks();
  matches.sort_by(|a, b| {
    let lhs = a.first().copied();
    let rhs = b.first().copied();
    match (lhs, rhs) {
      (Some(lhs), Some(rhs)) => reading_order(
        ranks.get(lhs).copied(),
        main.node(lhs).and_then(|node| node.origin),
        ranks.get(rhs).copied(),
        main.node(rhs).and_then(|node| node.origin),
      ),
      _ => Ordering::Equal,
    }
  });
  matches.dedup();

  Ok(matches)
}

/// Reading-order comparison of two match representatives.
///
/// Document order (preorder rank) wins whenever both sides carry one;
/// geometric comparison is the fallback for cross-tree comparisons:
/// vertical position first, with matches inside [`LINE_TOLERANCE`] treated
/// as the same line, then horizontal position.
pub fn reading_order(
  lhs_rank: Option<usize>,
  lhs_origin: Option<Point>,
  rhs_rank: Option<usize>,
  rhs_origin: Option<Point>,
) -> Ordering {
  if let (Some(lhs), Some(rhs)) = (lhs_rank, rhs_rank) {
    return lhs.cmp(&rhs);
  }
  let (Some(lhs), Some(rhs)) = (lhs_origin, rhs_origin) else {
    return Ordering::Equal;
  };
  if (lhs.y - rhs.y).abs() > LINE_TOLERANCE {
    return lhs.y.partial_cmp(&rhs.y).unwrap_or(Ordering::Equal);
  }
  lhs.x.partial_cmp(&rhs.x).unwrap_or(Ordering::Equal)
}

/// Shallow node equality: same tag, same semantic node type, and (when
/// either side carries one) the same literal character.
fn node_equal(
  main: &VisualTree,
  lhs: NodeId,
  reference: &VisualTree,
  rhs: NodeId,
) -> bool {
  let (Some(lhs), Some(rhs)) = (main.node(lhs), reference.node(rhs)) else {
    return false;
  };
  if lhs.tag != rhs.tag || lhs.node_type != rhs.node_type {
    return false;
  }
  if lhs.literal.is_some() || rhs.literal.is_some() {
    return lhs.literal == rhs.literal;
  }
  true
}

/// Recursive structural equality of two subtrees: node equality at every
/// level plus identical child count and order.
fn subtree_equal(
  main: &VisualTree,
  lhs: NodeId,
  reference: &VisualTree,
  rhs: NodeId,
) -> bool {
  if !node_equal(main, lhs, reference, rhs) {
    return false;
  }
  let lhs_children = main.children(lhs);
  let rhs_children = reference.children(rhs);
  if lhs_children.len() != rhs_children.len() {
    return false;
  }
  lhs_children
    .iter()
    .zip(rhs_children)
    .all(|(&lhs, &rhs)| subtree_equal(main, lhs, reference, rhs))
}

/// Try to consume a forward sibling run starting at `start` against the
/// reference root's top-level children. The walk must consume exactly
/// every reference child; each stepwise pair recurses into its subtree.
fn sibling_run(
  main: &VisualTree,
  start: NodeId,
  reference: &VisualTree,
  ref_children: &[NodeId],
) -> Option<Match> {
  if ref_children.is_empty() {
    return None;
  }

  let mut run: Match = SmallVec::new();
  let mut cursor = Some(start);
  for &expected in ref_children {
    let current = cursor?;
    if !subtree_equal(main, current, reference, expected) {
      return None;
    }
    run.push(current);
    cursor = main.next_sibling(current);
  }
  Some(run)
}
