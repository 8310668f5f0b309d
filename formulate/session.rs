//! Mode/draft controller and session orchestration.
//!
//! Owns the store, the dispatcher, and the outbound hooks, and implements
//! the create⇄edit transition protocol:
//!
//! - A selection carrying saved data snapshots the current create-mode
//!   work as an in-memory draft (unless it directly follows a placement),
//!   loads the saved options, and renders under the `loading_external`
//!   suppression flag, which is cleared only after the render future
//!   resolves, never on a fixed delay.
//! - A cleared selection returns to create mode, restoring and consuming
//!   the draft when one exists, otherwise clearing only the source text.
//! - Committing ("placing") materializes a new host artifact and converts
//!   the session into a tracked edit session; the just-placed state is
//!   deliberately not treated as a restorable draft.

use std::sync::Arc;

use formulate_core::{
  RenderOptions,
  Theme,
};
use formulate_event::send_blocking;
use tokio::sync::mpsc::Sender;

use crate::{
  engine::{
    LayoutMetrics,
    Typesetter,
  },
  host::{
    ArtifactId,
    HostSink,
    SelectionEvent,
  },
  prefs::{
    PreferenceStore,
    PrefsAutosave,
    PrefsEvent,
    StoredDefaults,
  },
  render::{
    RenderDispatcher,
    RenderOutcome,
  },
  state::{
    Mode,
    SessionState,
    SessionStore,
    StateChange,
    SubscriptionId,
  },
  sync::{
    SyncEvent,
    SyncPusher,
    build_update,
  },
};

pub struct Session<T, H, P> {
  store:              SessionStore,
  dispatcher:         RenderDispatcher,
  typesetter:         T,
  host:               Arc<H>,
  prefs:              Arc<P>,
  metrics:            LayoutMetrics,
  sync_tx:            Sender<SyncEvent>,
  prefs_tx:           Sender<PrefsEvent>,
  /// One-shot: the selection event that follows a placement must not
  /// snapshot the just-placed state as a draft.
  suppress_snapshot:  bool,
}

impl<T, H, P> Session<T, H, P>
where
  T: Typesetter,
  H: HostSink + 'static,
  P: PreferenceStore + 'static,
{
  pub fn new(typesetter: T, host: H, prefs: P, theme: Theme) -> Self {
    use formulate_event::AsyncHook;

    let host = Arc::new(host);
    let prefs = Arc::new(prefs);
    let sync_tx = SyncPusher::new(Arc::clone(&host)).spawn();
    let prefs_tx = PrefsAutosave::new(Arc::clone(&prefs)).spawn();

    Self {
      store: SessionStore::new(theme),
      dispatcher: RenderDispatcher::new(),
      typesetter,
      host,
      prefs,
      metrics: LayoutMetrics::default(),
      sync_tx,
      prefs_tx,
      suppress_snapshot: false,
    }
  }

  pub fn state(&self) -> &SessionState {
    self.store.state()
  }

  pub fn subscribe(
    &mut self,
    subscriber: impl FnMut(&SessionState, StateChange) + Send + 'static,
  ) -> SubscriptionId {
    self.store.subscribe(subscriber)
  }

  pub fn set_surface(&mut self, metrics: LayoutMetrics) {
    self.metrics = metrics;
  }

  /// Restore the "last used defaults" record. Read failures are logged
  /// and the session continues on in-memory defaults.
  pub async fn initialize(&mut self) {
    match self.prefs.load().await {
      Ok(Some(defaults)) => {
        self.store.set_options(defaults.options);
        self.store.set_draft(defaults.draft);
      },
      Ok(None) => {},
      Err(err) => {
        log::warn!("preference read failed, using defaults: {err:#}");
      },
    }
  }

  /// Apply a user-intent edit: build new options from the current ones,
  /// re-render, and arm the preference autosave.
  pub async fn apply_edit(&mut self, edit: impl FnOnce(&mut RenderOptions)) {
    let mut options = self.store.state().options.clone();
    edit(&mut options);
    self.store.set_options(options);
    self.refresh().await;
    self.arm_prefs_autosave();
  }

  /// Re-render without changing options (initial render, surface resize).
  pub async fn render(&mut self) {
    self.refresh().await;
  }

  /// Theme notification: pick new default colors. Colors the user already
  /// changed away from the old theme's defaults are left alone, and no
  /// render is forced.
  pub fn set_theme(&mut self, theme: Theme) {
    let old = self.store.state().theme;
    if old == theme {
      return;
    }
    let mut options = self.store.state().options.clone();
    if options.background == old.default_background() {
      options.background = theme.default_background().to_string();
    }
    if options.font_color == old.default_font_color() {
      options.font_color = theme.default_font_color().to_string();
    }
    self.store.set_theme(theme);
    self.store.set_options(options);
  }

  /// Selection change reported by the host.
  pub async fn handle_selection(&mut self, event: SelectionEvent) {
    match event {
      SelectionEvent::Loaded { artifact, options } => {
        let leaving_create = self.store.state().mode() == Mode::Create;
        if leaving_create && !self.suppress_snapshot {
          let snapshot = self.store.state().options.clone();
          self.store.set_draft(Some(snapshot));
        }
        self.suppress_snapshot = false;

        self.store.set_options(options);
        self.store.enter_edit(artifact);
        self.broadcast_mode(Mode::Edit);
        self.clear_persisted_draft().await;

        // Render the loaded state with sync-back suppressed; the flag
        // clears only after the render resolves.
        self.store.set_loading(true);
        self.refresh().await;
        self.store.set_loading(false);
      },
      SelectionEvent::Cleared => {
        // Any deselection ends the just-placed window; work composed from
        // here on is snapshot-worthy again.
        self.suppress_snapshot = false;
        self.store.enter_create();
        self.broadcast_mode(Mode::Create);

        if let Some(draft) = self.store.take_draft() {
          self.store.set_options(draft);
        } else {
          let mut options = self.store.state().options.clone();
          options.source.clear();
          self.store.set_options(options);
        }
        self.refresh().await;
      },
    }
  }

  /// Commit ("place") the current create-mode work as a new artifact.
  ///
  /// Returns the id the host assigned, or `None` when there is nothing
  /// placeable (no live tree, or already tracking an artifact).
  pub async fn commit_placement(&mut self) -> Option<ArtifactId> {
    if self.store.state().mode() == Mode::Edit {
      return None;
    }
    let update = build_update(self.store.state(), &self.typesetter, false)?;
    let artifact = self.host.create_artifact(update);

    self.store.set_draft(None);
    self.clear_persisted_draft().await;
    self.store.enter_edit(artifact.clone());
    self.broadcast_mode(Mode::Edit);
    self.suppress_snapshot = true;

    Some(artifact)
  }

  async fn refresh(&mut self) {
    let outcome = self
      .dispatcher
      .refresh(&mut self.store, &self.typesetter, self.metrics)
      .await;

    let state = self.store.state();
    if outcome == RenderOutcome::Settled && !state.loading_external && state.mode() == Mode::Edit {
      if let Some(update) = build_update(state, &self.typesetter, true) {
        send_blocking(&self.sync_tx, SyncEvent::Settled(Box::new(update)));
      }
    }
  }

  fn broadcast_mode(&self, mode: Mode) {
    send_blocking(&self.sync_tx, SyncEvent::ModeChanged(mode));
    send_blocking(&self.prefs_tx, PrefsEvent::ModeChanged(mode));
  }

  fn arm_prefs_autosave(&self) {
    if self.store.state().mode() != Mode::Create {
      return;
    }
    let record = StoredDefaults {
      options: self.store.state().options.clone(),
      draft:   self.store.state().draft.clone(),
    };
    send_blocking(&self.prefs_tx, PrefsEvent::Changed(Box::new(record)));
  }

  /// Drop the persisted draft sub-record (the in-memory draft is managed
  /// separately). Write failures are logged and swallowed.
  async fn clear_persisted_draft(&self) {
    let record = StoredDefaults {
      options: self
        .store
        .state()
        .draft
        .clone()
        .unwrap_or_else(|| self.store.state().options.clone()),
      draft:   None,
    };
    if let Err(err) = self.prefs.store(record).await {
      log::warn!("failed to clear persisted draft: {err:#}");
    }
  }
}
