//! Debounced sync pusher.
//!
//! Rapid edits coalesce into a single update pushed to the host artifact
//! after a quiet interval. Every qualifying settle cancels the armed
//! deadline and arms a new one; when it fires, the latest captured payload
//! is pushed, but only while the session is still in edit mode. Switching
//! away from edit mode does not cancel an armed deadline; the fire simply
//! becomes a no-op and drops the payload. Fire-and-forget: no
//! acknowledgement is awaited.

use std::sync::Arc;

use formulate_event::AsyncHook;
use tokio::time::{
  Duration,
  Instant,
};

use crate::{
  engine::Typesetter,
  host::{
    ArtifactUpdate,
    HostSink,
  },
  state::{
    Mode,
    SessionState,
  },
};

/// Quiet interval before a coalesced update goes out.
pub const SYNC_DEBOUNCE_MS: u64 = 500;

#[derive(Debug)]
pub enum SyncEvent {
  /// A render settled while tracking an artifact; push this state after
  /// the quiet interval.
  Settled(Box<ArtifactUpdate>),
  /// The session switched modes.
  ModeChanged(Mode),
}

/// Build the coalesced update describing the full desired artifact state.
///
/// Returns `None` when there is no live tree to export.
pub fn build_update<T: Typesetter + ?Sized>(
  state: &SessionState,
  typesetter: &T,
  update_existing: bool,
) -> Option<ArtifactUpdate> {
  let tree = state.tree.as_ref()?;
  let scale = state.options.font_size / typesetter.baseline_font_size();
  Some(ArtifactUpdate {
    source: state.options.source.clone(),
    markup: tree.to_markup(),
    scale,
    display_mode: state.options.display_mode,
    background: state.options.background.clone(),
    font_color: state.options.font_color.clone(),
    font_size: state.options.font_size,
    styles: state.options.styles.clone(),
    update_existing,
  })
}

/// The debounced pusher itself; owns the single sync deadline.
pub struct SyncPusher<H> {
  host:    Arc<H>,
  pending: Option<ArtifactUpdate>,
  mode:    Mode,
}

impl<H> SyncPusher<H> {
  pub fn new(host: Arc<H>) -> Self {
    Self {
      host,
      pending: None,
      mode: Mode::Create,
    }
  }
}

impl<H: HostSink + 'static> AsyncHook for SyncPusher<H> {
  type Event = SyncEvent;

  fn handle_event(&mut self, event: Self::Event, deadline: Option<Instant>) -> Option<Instant> {
    match event {
      SyncEvent::Settled(update) => {
        self.pending = Some(*update);
        // Cancel-then-arm: the new deadline replaces any armed one.
        Some(Instant::now() + Duration::from_millis(SYNC_DEBOUNCE_MS))
      },
      SyncEvent::ModeChanged(mode) => {
        self.mode = mode;
        deadline
      },
    }
  }

  fn finish_debounce(&mut self) {
    if self.mode != Mode::Edit {
      self.pending = None;
      return;
    }
    if let Some(update) = self.pending.take() {
      self.host.push_update(update);
    }
  }
}
