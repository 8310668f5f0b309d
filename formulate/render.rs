//! Render dispatcher.
//!
//! One decision governs every refresh: does the current input require a
//! full re-typeset, or can the previously produced tree be restyled in
//! place? Full renders are the only producers of a new visual tree; the
//! styling-only path mutates colors, size and sub-expression paint without
//! touching the engine.
//!
//! Stale resolutions: the engine call is async and is never cancelled, so
//! a slow full render can be superseded by a newer edit before it
//! resolves. Every full render takes a monotonically increasing generation
//! and a resolution whose generation is no longer current is discarded
//! without touching state.

use formulate_core::VisualTree;

use crate::{
  engine::{
    LayoutMetrics,
    Typesetter,
  },
  state::{
    Notice,
    SessionState,
    SessionStore,
  },
  styling::apply_styles,
};

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
  /// A tree was produced or restyled; state reflects the current input.
  Settled,
  /// Blank input short-circuited to the prompt placeholder.
  Blank,
  /// A newer refresh superseded this one; nothing was applied.
  Superseded,
  /// The engine failed; state was rolled back to force a fresh render.
  Failed,
}

/// Tracks which full-render generation is current so stale engine
/// resolutions can be discarded.
#[derive(Debug, Default)]
pub struct RenderLifecycle {
  next:    u64,
  current: Option<u64>,
}

impl RenderLifecycle {
  /// Start a new render attempt, superseding any in-flight one.
  pub fn begin(&mut self) -> u64 {
    self.next = self.next.saturating_add(1);
    self.current = Some(self.next);
    self.next
  }

  /// Report a resolution. Returns whether it is still current; a current
  /// resolution also clears the in-flight marker.
  pub fn resolve(&mut self, generation: u64) -> bool {
    if self.current == Some(generation) {
      self.current = None;
      true
    } else {
      false
    }
  }

  pub fn in_flight(&self) -> Option<u64> {
    self.current
  }
}

/// True when the current input cannot be served by restyling the existing
/// tree.
pub fn needs_full_render(state: &SessionState) -> bool {
  state.last_rendered_source.as_deref() != Some(state.options.source.as_str())
    || state.last_rendered_display_mode != Some(state.options.display_mode)
    || state.tree.is_none()
}

#[derive(Debug, Default)]
pub struct RenderDispatcher {
  lifecycle: RenderLifecycle,
}

impl RenderDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Refresh the output to match the store's current options.
  pub async fn refresh<T: Typesetter + ?Sized>(
    &mut self,
    store: &mut SessionStore,
    typesetter: &T,
    metrics: LayoutMetrics,
  ) -> RenderOutcome {
    if needs_full_render(store.state()) {
      self.full_render(store, typesetter, metrics).await
    } else {
      self.restyle(store, typesetter, metrics).await
    }
  }

  async fn full_render<T: Typesetter + ?Sized>(
    &mut self,
    store: &mut SessionStore,
    typesetter: &T,
    metrics: LayoutMetrics,
  ) -> RenderOutcome {
    let options = store.state().options.clone();

    if options.source.trim().is_empty() {
      store.set_tree(None);
      store.clear_rendered();
      store.set_reports(Vec::new());
      store.set_notice(Some(Notice::Prompt));
      return RenderOutcome::Blank;
    }

    typesetter.reset_counters();
    let generation = self.lifecycle.begin();
    let result = typesetter
      .typeset(&options.source, options.display_mode, metrics)
      .await;

    if !self.lifecycle.resolve(generation) {
      log::debug!("discarding stale render resolution (generation {generation})");
      return RenderOutcome::Superseded;
    }

    match result {
      Ok(mut tree) => {
        self
          .finish_tree(store, typesetter, metrics, &mut tree, &options)
          .await;
        store.set_tree(Some(tree));
        store.mark_rendered(options.source, options.display_mode);
        store.set_notice(None);
        RenderOutcome::Settled
      },
      Err(err) => {
        store.set_notice(Some(Notice::EngineError(err.to_string())));
        store.set_tree(None);
        store.clear_rendered();
        RenderOutcome::Failed
      },
    }
  }

  async fn restyle<T: Typesetter + ?Sized>(
    &mut self,
    store: &mut SessionStore,
    typesetter: &T,
    metrics: LayoutMetrics,
  ) -> RenderOutcome {
    let options = store.state().options.clone();
    let Some(mut tree) = store.take_tree() else {
      // needs_full_render covers the no-tree case; nothing to restyle.
      return RenderOutcome::Failed;
    };

    self
      .finish_tree(store, typesetter, metrics, &mut tree, &options)
      .await;
    store.set_tree(Some(tree));
    RenderOutcome::Settled
  }

  /// Shared tail of both paths: base colors, error styling, size stamp,
  /// then the sub-expression styling pass.
  async fn finish_tree<T: Typesetter + ?Sized>(
    &mut self,
    store: &mut SessionStore,
    typesetter: &T,
    metrics: LayoutMetrics,
    tree: &mut VisualTree,
    options: &formulate_core::RenderOptions,
  ) {
    tree.set_background(&options.background);
    tree.set_fill_all(&options.font_color);
    tree.apply_error_styling();
    tree.stamp_font_size(options.font_size);
    let reports = apply_styles(typesetter, tree, &options.styles, metrics).await;
    store.set_reports(reports);
  }
}

#[cfg(test)]
mod tests {
  use formulate_core::{
    SubExpressionStyle,
    Theme,
  };

  use super::*;
  use crate::{
    engine::TypesetError,
    testing::FakeTypesetter,
  };

  fn store_with_source(source: &str) -> SessionStore {
    let mut store = SessionStore::new(Theme::Light);
    let mut options = store.state().options.clone();
    options.source = source.to_string();
    store.set_options(options);
    store
  }

  #[tokio::test]
  async fn full_render_produces_tree_and_marks_rendered() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("x^2");
    let mut dispatcher = RenderDispatcher::new();

    let outcome = dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;

    assert_eq!(outcome, RenderOutcome::Settled);
    assert!(store.state().tree.is_some());
    assert!(store.state().notice.is_none());
    assert!(store.state().style_reports.is_empty());
    assert_eq!(store.state().last_rendered_source.as_deref(), Some("x^2"));
    assert_eq!(store.state().last_rendered_display_mode, Some(true));
    assert_eq!(typesetter.counter_resets(), 1);
  }

  #[tokio::test]
  async fn color_only_change_skips_the_engine() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("x^2");
    let mut dispatcher = RenderDispatcher::new();

    dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;
    assert_eq!(typesetter.typeset_calls(), 1);

    let mut options = store.state().options.clone();
    options.font_color = "FF0000".to_string();
    store.set_options(options);
    assert!(!needs_full_render(store.state()));

    let outcome = dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;
    assert_eq!(outcome, RenderOutcome::Settled);
    assert_eq!(typesetter.typeset_calls(), 1);

    let tree = store.state().tree.as_ref().unwrap();
    let math = tree.math_root();
    let first = tree.children(math)[0];
    assert_eq!(tree.node(first).unwrap().fill.as_deref(), Some("FF0000"));
  }

  #[tokio::test]
  async fn source_change_forces_full_render() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("x");
    let mut dispatcher = RenderDispatcher::new();

    dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;

    let mut options = store.state().options.clone();
    options.source = "y".to_string();
    store.set_options(options);
    assert!(needs_full_render(store.state()));

    dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;
    assert_eq!(typesetter.typeset_calls(), 2);
  }

  #[tokio::test]
  async fn blank_input_short_circuits_to_prompt() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("   ");
    let mut dispatcher = RenderDispatcher::new();

    let outcome = dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;

    assert_eq!(outcome, RenderOutcome::Blank);
    assert_eq!(typesetter.typeset_calls(), 0);
    assert!(store.state().tree.is_none());
    assert_eq!(store.state().notice, Some(Notice::Prompt));
  }

  #[tokio::test]
  async fn engine_failure_rolls_back_for_retry() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("x");
    let mut dispatcher = RenderDispatcher::new();

    dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;
    assert!(store.state().tree.is_some());

    typesetter.fail_next(TypesetError::Failed("unexpected brace".to_string()));
    let mut options = store.state().options.clone();
    options.source = "x{".to_string();
    store.set_options(options);

    let outcome = dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;

    assert_eq!(outcome, RenderOutcome::Failed);
    assert!(store.state().tree.is_none());
    assert!(store.state().last_rendered_source.is_none());
    assert!(matches!(
      store.state().notice,
      Some(Notice::EngineError(_))
    ));

    // Next refresh retries from scratch.
    let outcome = dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;
    assert_eq!(outcome, RenderOutcome::Settled);
    assert!(store.state().tree.is_some());
  }

  #[tokio::test]
  async fn styles_are_applied_during_full_render() {
    let typesetter = FakeTypesetter::new();
    let mut store = store_with_source("a+b");
    let mut options = store.state().options.clone();
    options.styles = vec![SubExpressionStyle::new("a+b", "FF0000")];
    store.set_options(options);
    let mut dispatcher = RenderDispatcher::new();

    dispatcher
      .refresh(&mut store, &typesetter, LayoutMetrics::default())
      .await;

    assert!(store.state().style_reports.is_empty());
    let tree = store.state().tree.as_ref().unwrap();
    let math = tree.math_root();
    for &token in tree.children(math) {
      assert_eq!(tree.node(token).unwrap().fill.as_deref(), Some("FF0000"));
    }
  }

  #[test]
  fn lifecycle_discards_superseded_generations() {
    let mut lifecycle = RenderLifecycle::default();
    let first = lifecycle.begin();
    let second = lifecycle.begin();

    assert!(!lifecycle.resolve(first));
    assert_eq!(lifecycle.in_flight(), Some(second));
    assert!(lifecycle.resolve(second));
    assert!(lifecycle.in_flight().is_none());
    assert!(!lifecycle.resolve(second));
  }
}
