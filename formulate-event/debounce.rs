//! Debounced async hooks.
//!
//! Rapid user edits must coalesce into a single push to the artifact host
//! (and a single preference write), so the hooks that consume them run as
//! background tokio tasks fed through a channel. A hook decides, per event,
//! whether to act immediately or to (re)arm a single deadline; when the
//! deadline passes without newer events, `finish_debounce` runs once. This
//! is cancel-then-arm semantics on one owned timer resource per hook.

use std::time::Duration;

use futures_executor::block_on;
use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Maximum time to block when sending to a full channel. Dropping an event
/// is better than stalling the caller: every event source here re-fires on
/// the next state settle anyway.
const SEND_TIMEOUT_MS: u64 = 2;

/// A debounced event consumer running as a background task.
///
/// `handle_event` is called as soon as an event arrives; it either consumes
/// the event immediately or returns a new deadline, replacing whatever
/// deadline was armed before. When the deadline elapses with no newer
/// event, `finish_debounce` fires.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  fn handle_event(&mut self, event: Self::Event, deadline: Option<Instant>) -> Option<Instant>;

  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(64);
    // Only spawn the worker inside a runtime so unit tests that never
    // touch async paths don't need one.
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline = None;
  loop {
    let event = match deadline {
      Some(deadline_) => {
        let res = tokio::time::timeout_at(deadline_, rx.recv()).await;
        match res {
          Ok(event) => event,
          Err(_) => {
            hook.finish_debounce();
            deadline = None;
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// Send an event from synchronous code, blocking only briefly when the
/// channel is full; past that the event is dropped.
pub fn send_blocking<T>(tx: &Sender<T>, data: T) {
  match tx.try_send(data) {
    Ok(()) => {},
    Err(TrySendError::Full(data)) => {
      let _ = block_on(tx.send_timeout(data, Duration::from_millis(SEND_TIMEOUT_MS)));
    },
    Err(TrySendError::Closed(_)) => {
      log::warn!("attempted to send to closed hook channel");
    },
  }
}

/// Non-blocking send; returns whether the event was accepted.
pub fn try_send<T>(tx: &Sender<T>, data: T) -> bool {
  tx.try_send(data).is_ok()
}
