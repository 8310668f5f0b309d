//! Session state store.
//!
//! Single source of truth for one plugin session. Earlier iterations of
//! this design kept "current" state in ad hoc module globals; here it is
//! one owned, serializable-by-parts state object behind a store that
//! notifies subscribers synchronously on every mutation: a mutation fully
//! updates the state and runs every subscriber before returning, so no two
//! mutations ever interleave.
//!
//! Invariants enforced by the transition methods:
//! - `mode == Edit` exactly when a tracked artifact id is set.
//! - At most one visual tree is live; replacing it drops the old arena.

use formulate_core::{
  RenderOptions,
  StyleReport,
  Theme,
  VisualTree,
};

use crate::host::ArtifactId;

/// Create vs edit session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Composing new, unplaced work.
  Create,
  /// Bound to a tracked host artifact.
  Edit,
}

/// Inline output content shown instead of (or alongside) the visual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  /// Blank input: "enter an expression" placeholder, not an error.
  Prompt,
  /// The engine was unavailable or rejected the source.
  EngineError(String),
}

/// What a mutation changed; handed to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
  Options,
  Mode,
  Theme,
  Tree,
  Rendered,
  Notice,
  Reports,
  Loading,
  Draft,
}

#[derive(Debug)]
pub struct SessionState {
  pub options:                    RenderOptions,
  pub theme:                      Theme,
  mode:                           Mode,
  tracked_artifact:               Option<ArtifactId>,
  pub last_rendered_source:       Option<String>,
  pub last_rendered_display_mode: Option<bool>,
  /// Handle to the last produced render artifact.
  pub tree:                       Option<VisualTree>,
  /// Set while externally-sourced data is being loaded; suppresses the
  /// sync-back that rendering would otherwise schedule.
  pub loading_external:           bool,
  /// In-memory-only snapshot of unplaced create-mode work.
  pub draft:                      Option<RenderOptions>,
  pub notice:                     Option<Notice>,
  pub style_reports:              Vec<StyleReport>,
}

impl SessionState {
  fn new(theme: Theme) -> Self {
    Self {
      options: RenderOptions::for_theme(theme),
      theme,
      mode: Mode::Create,
      tracked_artifact: None,
      last_rendered_source: None,
      last_rendered_display_mode: None,
      tree: None,
      loading_external: false,
      draft: None,
      notice: None,
      style_reports: Vec::new(),
    }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn tracked_artifact(&self) -> Option<&ArtifactId> {
    self.tracked_artifact.as_ref()
  }
}

/// Subscription handle returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&SessionState, StateChange) + Send>;

pub struct SessionStore {
  state:             SessionState,
  subscribers:       Vec<(SubscriptionId, Subscriber)>,
  next_subscription: u64,
}

impl SessionStore {
  pub fn new(theme: Theme) -> Self {
    Self {
      state:             SessionState::new(theme),
      subscribers:       Vec::new(),
      next_subscription: 1,
    }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn subscribe(
    &mut self,
    subscriber: impl FnMut(&SessionState, StateChange) + Send + 'static,
  ) -> SubscriptionId {
    let id = SubscriptionId(self.next_subscription);
    self.next_subscription = self.next_subscription.saturating_add(1);
    self.subscribers.push((id, Box::new(subscriber)));
    id
  }

  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let before = self.subscribers.len();
    self.subscribers.retain(|(sub, _)| *sub != id);
    self.subscribers.len() != before
  }

  fn notify(&mut self, change: StateChange) {
    let Self {
      state, subscribers, ..
    } = self;
    for (_, subscriber) in subscribers.iter_mut() {
      subscriber(state, change);
    }
  }

  /// Assign new render options; colors are canonicalized on the way in.
  pub fn set_options(&mut self, options: RenderOptions) {
    self.state.options = options.normalized();
    self.notify(StateChange::Options);
  }

  pub fn set_theme(&mut self, theme: Theme) {
    self.state.theme = theme;
    self.notify(StateChange::Theme);
  }

  /// Bind the session to a tracked artifact and enter edit mode.
  pub fn enter_edit(&mut self, artifact: ArtifactId) {
    self.state.tracked_artifact = Some(artifact);
    self.state.mode = Mode::Edit;
    self.notify(StateChange::Mode);
  }

  /// Unbind the tracked artifact and enter create mode.
  pub fn enter_create(&mut self) {
    self.state.tracked_artifact = None;
    self.state.mode = Mode::Create;
    self.notify(StateChange::Mode);
  }

  /// Replace the live visual tree; the previous arena (if any) is dropped,
  /// invalidating every outstanding node id.
  pub fn set_tree(&mut self, tree: Option<VisualTree>) {
    self.state.tree = tree;
    self.notify(StateChange::Tree);
  }

  /// Temporarily take the tree for in-place mutation. The caller puts it
  /// back through [`Self::set_tree`], which is when subscribers hear about
  /// it.
  pub fn take_tree(&mut self) -> Option<VisualTree> {
    self.state.tree.take()
  }

  pub fn mark_rendered(&mut self, source: String, display_mode: bool) {
    self.state.last_rendered_source = Some(source);
    self.state.last_rendered_display_mode = Some(display_mode);
    self.notify(StateChange::Rendered);
  }

  /// Forget the last rendered inputs so the next edit forces a full
  /// render rather than reusing a failed state.
  pub fn clear_rendered(&mut self) {
    self.state.last_rendered_source = None;
    self.state.last_rendered_display_mode = None;
    self.notify(StateChange::Rendered);
  }

  pub fn set_notice(&mut self, notice: Option<Notice>) {
    self.state.notice = notice;
    self.notify(StateChange::Notice);
  }

  pub fn set_reports(&mut self, reports: Vec<StyleReport>) {
    self.state.style_reports = reports;
    self.notify(StateChange::Reports);
  }

  pub fn set_loading(&mut self, loading: bool) {
    self.state.loading_external = loading;
    self.notify(StateChange::Loading);
  }

  pub fn set_draft(&mut self, draft: Option<RenderOptions>) {
    self.state.draft = draft;
    self.notify(StateChange::Draft);
  }

  /// Consume the draft snapshot. Drafts are consumed exactly once: a
  /// taken draft is gone whether the caller restores or discards it.
  pub fn take_draft(&mut self) -> Option<RenderOptions> {
    let draft = self.state.draft.take();
    if draft.is_some() {
      self.notify(StateChange::Draft);
    }
    draft
  }
}
