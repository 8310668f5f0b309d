//! Sub-expression style entries and their validation outcomes.
//!
//! Each entry pairs a reference expression with a color and an optional
//! occurrence filter. Validation failures are tagged per-entry results
//! carrying structured data (matched count, valid range, offending token);
//! UI-facing callbacks adapt these at the boundary, they are not part of
//! the core contract.

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

/// One user-configured sub-expression styling rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubExpressionStyle {
  pub expression:  String,
  pub color:       String,
  /// Comma-separated 1-based occurrence indices; `None` or blank means
  /// "apply to every match".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub occurrences: Option<String>,
}

impl SubExpressionStyle {
  pub fn new(expression: impl Into<String>, color: impl Into<String>) -> Self {
    Self {
      expression:  expression.into(),
      color:       color.into(),
      occurrences: None,
    }
  }

  pub fn with_occurrences(mut self, occurrences: impl Into<String>) -> Self {
    self.occurrences = Some(occurrences.into());
    self
  }

  /// True when the occurrence filter is absent or blank.
  pub fn applies_to_all(&self) -> bool {
    self
      .occurrences
      .as_deref()
      .is_none_or(|raw| raw.trim().is_empty())
  }
}

/// Per-entry validation failure. One issue aborts coloring for its entry
/// only; other entries and the base render proceed.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleIssue {
  #[error("expression not found: {expression}")]
  ExpressionNotFound { expression: String },

  #[error("occurrences must be comma-separated integers, got `{token}`")]
  InvalidOccurrenceToken { token: String },

  #[error("occurrence {index} is out of range, valid range is 1..={max}")]
  OccurrenceOutOfRange { index: i64, max: usize },
}

/// A validation issue attached to the style entry that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleReport {
  /// Index of the entry in the configured style list.
  pub entry: usize,
  pub issue: StyleIssue,
}

/// Parse an occurrence filter into zero-based match indices.
///
/// Tokens are validated in order: the first unparsable token or the first
/// index outside `[1, match_count]` fails the whole filter, and nothing is
/// painted for the entry.
pub fn parse_occurrences(raw: &str, match_count: usize) -> Result<Vec<usize>, StyleIssue> {
  let mut selected = Vec::new();
  for token in raw.split(',') {
    let token = token.trim();
    let index: i64 = token.parse().map_err(|_| StyleIssue::InvalidOccurrenceToken {
      token: token.to_string(),
    })?;
    if index < 1 || index as usize > match_count {
      return Err(StyleIssue::OccurrenceOutOfRange {
        index,
        max: match_count,
      });
    }
    selected.push(index as usize - 1);
  }
  Ok(selected)
}
