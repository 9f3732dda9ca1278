//! Lifecycle notifications.

use std::path::Path;
use std::sync::Arc;

use liverec_platform_core::Notifier;

/// Best-effort notification dispatch.
///
/// Failures are logged and swallowed; recording never stops because a
/// message could not be delivered.
#[derive(Clone, Default)]
pub struct Notifications {
    sink: Option<Arc<dyn Notifier>>,
}

impl Notifications {
    /// A dispatcher that drops every message.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Dispatch through `sink` when `enabled` is set.
    pub fn new(sink: Arc<dyn Notifier>, enabled: bool) -> Self {
        Self {
            sink: enabled.then_some(sink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub async fn send(&self, message: &str) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if let Err(e) = sink.notify(message).await {
            tracing::warn!(error = %e, "Notification failed");
        }
    }

    pub async fn recording_started(&self, handle: &str, started_at: &str) {
        self.send(&format!(
            "🔴 <b>Recording Started</b>\n👤 User: <code>{handle}</code>\n📅 Date: {started_at}"
        ))
        .await;
    }

    pub async fn segment_saved(&self, segment: &Path) {
        self.send(&format!(
            "📁 <b>Segment Saved</b>\nFile: <code>{}</code>",
            display_name(segment)
        ))
        .await;
    }

    pub async fn recording_finished(&self, handle: &str, ended_at: &str, last: Option<&Path>) {
        let last = last.map(display_name).unwrap_or_else(|| "none".to_string());
        self.send(&format!(
            "✅ <b>Recording Finished</b>\n👤 User: <code>{handle}</code>\n🏁 End Time: {ended_at}\n📁 Last File: <code>{last}</code>"
        ))
        .await;
    }
}

/// File name as it will look after post-processing.
fn display_name(path: &Path) -> String {
    liverec_platform_core::converted_path(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
