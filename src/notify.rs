//! Desktop notifications for status line changes.

use notify_rust::Notification;
use tracing::error;

use soundboard_core::{APP_NAME, APP_NAME_PRETTY};

/// Mirrors the status line into desktop notifications when enabled.
#[derive(Debug, Clone, Copy)]
pub struct StatusNotifier {
    enabled: bool,
}

impl StatusNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn status_changed(&self, status: &str) {
        if self.enabled && !status.is_empty() {
            notify("Status", status);
        }
    }
}

/// Send a system notification with a summary and body.
pub fn notify(summary: &str, body: &str) {
    Notification::new()
        .appname(APP_NAME)
        .summary(&format!("{} - {}", APP_NAME_PRETTY, summary))
        .body(body)
        .show()
        .map_err(|e| error!("Failed to send notification: {}", e))
        .ok();
}
