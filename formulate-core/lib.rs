//! Core data model and algorithms for formulate.
//!
//! This crate is deliberately small and synchronous: it owns the visual-tree
//! arena, the sub-expression matcher, and the value objects shared between
//! the session layer and external collaborators. No IO, no async, no
//! engine bindings. Pure state in, state out.

pub mod color;
pub mod matcher;
pub mod options;
pub mod style;
pub mod tree;

pub use color::normalize_hex;
pub use matcher::{Match, MatchError, find_matches};
pub use options::{RenderOptions, Theme};
pub use style::{StyleIssue, StyleReport, SubExpressionStyle};
pub use tree::{NodeId, Point, VisualNode, VisualTree};
