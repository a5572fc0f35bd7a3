//! Recording lifecycle state.

/// Where the session is in its `Idle -> Recording -> Idle` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No capture is in progress
    #[default]
    Idle,
    /// A capture handle is held by the session
    Recording,
}

impl SessionState {
    /// Label for the toggle control in this state.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Start Recording",
            SessionState::Recording => "Stop Recording",
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }
}
