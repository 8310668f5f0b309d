//! Persistent preference store seam and debounced autosave.
//!
//! One "last used defaults" record is persisted: the render options plus an
//! optional draft sub-record. Reads happen once at session start; writes
//! are debounced and only occur while in create mode. Persistence failures
//! are logged and swallowed; the session continues on in-memory defaults
//! and the user never sees a blocking error.

use std::sync::Arc;

use async_trait::async_trait;
use formulate_core::RenderOptions;
use formulate_event::AsyncHook;
use serde::{
  Deserialize,
  Serialize,
};
use tokio::time::{
  Duration,
  Instant,
};

use crate::state::Mode;

/// Quiet interval before a preference write goes out.
pub const PREFS_DEBOUNCE_MS: u64 = 800;

/// The persisted "last used defaults" record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDefaults {
  pub options: RenderOptions,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub draft:   Option<RenderOptions>,
}

/// The external preference store.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
  async fn load(&self) -> anyhow::Result<Option<StoredDefaults>>;
  async fn store(&self, defaults: StoredDefaults) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub enum PrefsEvent {
  /// The defaults record changed; persist it after the quiet interval.
  Changed(Box<StoredDefaults>),
  /// The session switched modes; writes are create-mode only.
  ModeChanged(Mode),
}

/// Debounced preference writer.
pub struct PrefsAutosave<P> {
  prefs:   Arc<P>,
  pending: Option<StoredDefaults>,
  mode:    Mode,
}

impl<P> PrefsAutosave<P> {
  pub fn new(prefs: Arc<P>) -> Self {
    Self {
      prefs,
      pending: None,
      mode: Mode::Create,
    }
  }
}

impl<P: PreferenceStore + 'static> AsyncHook for PrefsAutosave<P> {
  type Event = PrefsEvent;

  fn handle_event(&mut self, event: Self::Event, deadline: Option<Instant>) -> Option<Instant> {
    match event {
      PrefsEvent::Changed(defaults) => {
        if self.mode != Mode::Create {
          return deadline;
        }
        self.pending = Some(*defaults);
        Some(Instant::now() + Duration::from_millis(PREFS_DEBOUNCE_MS))
      },
      PrefsEvent::ModeChanged(mode) => {
        self.mode = mode;
        if mode != Mode::Create {
          self.pending = None;
        }
        deadline
      },
    }
  }

  fn finish_debounce(&mut self) {
    if self.mode != Mode::Create {
      self.pending = None;
      return;
    }
    let Some(defaults) = self.pending.take() else {
      return;
    };
    let prefs = Arc::clone(&self.prefs);
    tokio::spawn(async move {
      if let Err(err) = prefs.store(defaults).await {
        log::warn!("preference write failed: {err:#}");
      }
    });
  }
}
