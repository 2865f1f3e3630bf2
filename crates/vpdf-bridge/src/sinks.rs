// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification sinks for terminal and headless use.

use std::sync::{Arc, Mutex};

use vpdf_core::types::{Notification, Severity};

use crate::traits::NotificationSink;

/// Prints notifications to stderr and mirrors them into the log.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: &Notification) {
        match notification.severity {
            Severity::Error => tracing::error!(message = %notification.message, "notification"),
            Severity::Warning => tracing::warn!(message = %notification.message, "notification"),
            Severity::Info | Severity::Success => {
                tracing::info!(message = %notification.message, "notification")
            }
        }
        eprintln!("[{}] {}", notification.severity, notification.message);
    }
}

/// Records every notification in order. Cheap to clone; clones share the
/// same record.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything shown so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages only, in display order.
    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: &Notification) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn memory_sink_keeps_order_across_clones() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.notify(&Notification::new("first", Severity::Info, Duration::from_secs(1)));
        handle.notify(&Notification::new("second", Severity::Success, Duration::from_secs(1)));

        assert_eq!(sink.messages(), vec!["first", "second"]);
        assert_eq!(sink.last().map(|n| n.severity), Some(Severity::Success));
    }
}
