//! Test doubles for the external collaborators.

use std::sync::{
  Mutex,
  atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
  },
};

use async_trait::async_trait;
use formulate_core::{
  Point,
  VisualNode,
  VisualTree,
};

use crate::{
  engine::{
    LayoutMetrics,
    TypesetError,
    Typesetter,
  },
  host::{
    ArtifactId,
    ArtifactUpdate,
    HostSink,
  },
  prefs::{
    PreferenceStore,
    StoredDefaults,
  },
};

/// Deterministic engine: tokenizes source text into one sibling node per
/// non-whitespace character under a `math` root, with left-to-right
/// origins. Structurally faithful enough for matcher and dispatcher
/// behavior without any real typesetting.
#[derive(Default)]
pub struct FakeTypesetter {
  typeset_calls:  AtomicUsize,
  counter_resets: AtomicUsize,
  fail_next:      Mutex<Option<TypesetError>>,
}

impl FakeTypesetter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn typeset_calls(&self) -> usize {
    self.typeset_calls.load(Ordering::SeqCst)
  }

  pub fn counter_resets(&self) -> usize {
    self.counter_resets.load(Ordering::SeqCst)
  }

  /// Make the next `typeset` call fail with `err`.
  pub fn fail_next(&self, err: TypesetError) {
    *self.fail_next.lock().unwrap() = Some(err);
  }

  pub fn build_tree(&self, source: &str) -> VisualTree {
    let mut tree = VisualTree::new(VisualNode::new("math").with_type("math"));
    let root = tree.root();
    for (index, c) in source.chars().filter(|c| !c.is_whitespace()).enumerate() {
      let tag = if c.is_alphabetic() {
        "mi"
      } else if c.is_ascii_digit() {
        "mn"
      } else {
        "mo"
      };
      tree.add_child(
        root,
        VisualNode::new(tag)
          .with_literal(c.to_string())
          .with_origin(Point::new(index as f64 * 8.0, 0.0)),
      );
    }
    tree
  }
}

#[async_trait]
impl Typesetter for FakeTypesetter {
  async fn typeset(
    &self,
    source: &str,
    _display_mode: bool,
    _metrics: LayoutMetrics,
  ) -> Result<VisualTree, TypesetError> {
    self.typeset_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.fail_next.lock().unwrap().take() {
      return Err(err);
    }
    Ok(self.build_tree(source))
  }

  fn reset_counters(&self) {
    self.counter_resets.fetch_add(1, Ordering::SeqCst);
  }

  fn baseline_font_size(&self) -> f32 {
    16.0
  }
}

/// Host that records every message it receives.
#[derive(Default)]
pub struct RecordingHost {
  updates: Mutex<Vec<ArtifactUpdate>>,
  created: AtomicUsize,
}

impl RecordingHost {
  pub fn updates(&self) -> Vec<ArtifactUpdate> {
    self.updates.lock().unwrap().clone()
  }

  pub fn created(&self) -> usize {
    self.created.load(Ordering::SeqCst)
  }
}

impl HostSink for RecordingHost {
  fn push_update(&self, update: ArtifactUpdate) {
    self.updates.lock().unwrap().push(update);
  }

  fn create_artifact(&self, update: ArtifactUpdate) -> ArtifactId {
    let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
    self.updates.lock().unwrap().push(update);
    ArtifactId::new(format!("artifact-{n}"))
  }
}

/// In-memory preference store with injectable write failures.
#[derive(Default)]
pub struct MemoryPrefs {
  record:      Mutex<Option<StoredDefaults>>,
  fail_writes: AtomicBool,
}

impl MemoryPrefs {
  pub fn with_record(record: StoredDefaults) -> Self {
    Self {
      record:      Mutex::new(Some(record)),
      fail_writes: AtomicBool::new(false),
    }
  }

  pub fn record(&self) -> Option<StoredDefaults> {
    self.record.lock().unwrap().clone()
  }

  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl PreferenceStore for MemoryPrefs {
  async fn load(&self) -> anyhow::Result<Option<StoredDefaults>> {
    Ok(self.record.lock().unwrap().clone())
  }

  async fn store(&self, defaults: StoredDefaults) -> anyhow::Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      anyhow::bail!("preference backend rejected the write");
    }
    *self.record.lock().unwrap() = Some(defaults);
    Ok(())
  }
}
