// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification pacing — consecutive notifications are spaced so each one is
// visible for a minimum time before the next replaces it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use vpdf_bridge::NotificationSink;
use vpdf_core::human_errors::humanize_error;
use vpdf_core::types::{Notification, Severity};
use vpdf_core::VpdfError;

/// Shows notifications through a sink, never faster than `min_visible`.
#[derive(Clone)]
pub struct NotificationPacer {
    sink: Arc<dyn NotificationSink>,
    min_visible: Duration,
    last_shown: Arc<Mutex<Option<Instant>>>,
}

impl NotificationPacer {
    pub fn new(sink: Arc<dyn NotificationSink>, min_visible: Duration) -> Self {
        Self {
            sink,
            min_visible,
            last_shown: Arc::new(Mutex::new(None)),
        }
    }

    /// Show `message`, waiting first if the previous one is still fresh.
    pub async fn show(&self, message: impl Into<String>, severity: Severity, duration: Duration) {
        let mut last = self.last_shown.lock().await;
        if let Some(shown_at) = *last {
            let elapsed = shown_at.elapsed();
            if elapsed < self.min_visible {
                tokio::time::sleep(self.min_visible - elapsed).await;
            }
        }
        self.sink
            .notify(&Notification::new(message, severity, duration));
        *last = Some(Instant::now());
    }

    /// Show the single notification for a recovered error.
    pub async fn show_error(&self, err: &VpdfError) {
        let human = humanize_error(err);
        self.show(human.message, human.severity, human.duration)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use vpdf_bridge::MemorySink;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn back_to_back_notifications_are_spaced() {
        let sink = MemorySink::new();
        let pacer = NotificationPacer::new(Arc::new(sink.clone()), Duration::from_secs(1));
        let start = Instant::now();

        pacer.show("one", Severity::Info, Duration::from_secs(5)).await;
        pacer.show("two", Severity::Info, Duration::from_secs(5)).await;

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(sink.messages(), vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_notification_is_replaced_immediately() {
        let sink = MemorySink::new();
        let pacer = NotificationPacer::new(Arc::new(sink.clone()), Duration::from_secs(1));

        pacer.show("one", Severity::Info, Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        let before = Instant::now();
        pacer.show("two", Severity::Info, Duration::from_secs(5)).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn errors_are_humanized() {
        let sink = MemorySink::new();
        let pacer = NotificationPacer::new(Arc::new(sink.clone()), Duration::ZERO);
        pacer.show_error(&VpdfError::EmptyContent).await;
        let shown = sink.last().unwrap();
        assert_eq!(shown.message, "There's no content to convert.");
        assert_eq!(shown.severity, Severity::Warning);
    }
}
