//! Host document-editor seam.
//!
//! The host canvas owns the placed artifacts. We produce a single message
//! shape ("materialize or update an artifact") and consume selection events
//! the host derives by walking an artifact's containment ancestry for saved
//! data. How the artifact is rasterized and stored is the host's business.

use formulate_core::{
  RenderOptions,
  SubExpressionStyle,
};
use serde::{
  Deserialize,
  Serialize,
};

/// Identifier of a host-side artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl ArtifactId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }
}

impl std::fmt::Display for ArtifactId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// The full desired artifact state, pushed as one coalesced message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactUpdate {
  pub source:          String,
  /// Exportable markup of the current visual tree.
  pub markup:          String,
  /// Requested font size relative to the engine baseline.
  pub scale:           f32,
  pub display_mode:    bool,
  pub background:      String,
  pub font_color:      String,
  pub font_size:       f32,
  pub styles:          Vec<SubExpressionStyle>,
  /// Update the tracked artifact instead of materializing a new one.
  pub update_existing: bool,
}

/// Selection change reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionEvent {
  /// Nothing with saved data is selected.
  Cleared,
  /// An artifact with saved render options was found in the selection's
  /// ancestry.
  Loaded {
    artifact: ArtifactId,
    options:  RenderOptions,
  },
}

/// Outbound channel to the host. Fire-and-forget: no acknowledgement is
/// awaited for updates.
pub trait HostSink: Send + Sync {
  /// Push the coalesced state of the tracked artifact.
  fn push_update(&self, update: ArtifactUpdate);

  /// Materialize a brand-new artifact and return its id.
  fn create_artifact(&self, update: ArtifactUpdate) -> ArtifactId;
}
