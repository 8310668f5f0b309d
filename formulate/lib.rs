//! Session layer of formulate: live incremental rendering of math source
//! into a styled visual tree, with create/edit session modes, draft
//! preservation, debounced sync to the host artifact, and persisted
//! defaults.
//!
//! The pure data model and algorithms live in `formulate-core`; the
//! debounce machinery lives in `formulate-event`. This crate wires them to
//! the three external seams: the typesetting engine ([`Typesetter`]), the
//! host canvas ([`HostSink`]) and the preference backend
//! ([`PreferenceStore`]).

pub mod engine;
pub mod host;
pub mod prefs;
pub mod render;
pub mod session;
pub mod state;
pub mod styling;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{LayoutMetrics, TypesetError, Typesetter};
pub use host::{ArtifactId, ArtifactUpdate, HostSink, SelectionEvent};
pub use prefs::{PreferenceStore, StoredDefaults};
pub use render::{RenderOutcome, needs_full_render};
pub use session::Session;
pub use state::{Mode, Notice, SessionState, StateChange};
