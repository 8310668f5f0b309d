//! Event plumbing for formulate's debounced background work.

pub mod debounce;

pub use debounce::{
  AsyncHook,
  send_blocking,
  try_send,
};
