//! Events published by the session after each applied command.
//!
//! These carry no UI types so the view layer can be swapped without touching
//! the session.

use crate::{Recording, SessionState};

/// Events emitted by the soundboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The recording lifecycle moved to a new state
    StateChanged(SessionState),
    /// The status line was overwritten
    StatusChanged(String),
    /// A finished recording was appended at `index` (zero based)
    RecordingAdded { index: usize, recording: Recording },
}
