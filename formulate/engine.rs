//! Typesetting engine seam.
//!
//! The actual typesetting of source text into a visual tree happens in an
//! external engine; this module only defines the contract the session layer
//! programs against. The engine must support resetting its internal
//! numbering state so that independent renders (main expression vs each
//! reference sub-expression) never cross-contaminate automatic numbering.

use async_trait::async_trait;
use formulate_core::VisualTree;
use thiserror::Error;

/// Layout metrics for one render, computed against the output surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
  /// Width of the output surface available to the formula.
  pub container_width: f64,
  /// Em size the engine should lay out against.
  pub em_size:         f32,
}

impl LayoutMetrics {
  pub fn new(container_width: f64, em_size: f32) -> Self {
    Self {
      container_width,
      em_size,
    }
  }
}

impl Default for LayoutMetrics {
  fn default() -> Self {
    Self {
      container_width: 480.0,
      em_size:         16.0,
    }
  }
}

/// Failure of one typesetting attempt. Fatal to that render only; the
/// session survives and the next edit retries from scratch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesetError {
  #[error("typesetting engine is not available")]
  Unavailable,

  #[error("{0}")]
  Failed(String),
}

/// The external typesetting engine.
#[async_trait]
pub trait Typesetter: Send + Sync {
  /// Typeset `source` into a fresh visual tree.
  async fn typeset(
    &self,
    source: &str,
    display_mode: bool,
    metrics: LayoutMetrics,
  ) -> Result<VisualTree, TypesetError>;

  /// Reset internal counters (automatic equation numbering) before an
  /// independent render.
  fn reset_counters(&self);

  /// The engine's baseline font size; the sync scale factor is the
  /// requested font size relative to this.
  fn baseline_font_size(&self) -> f32;
}
