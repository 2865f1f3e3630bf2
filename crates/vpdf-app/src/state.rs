// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion job — the per-session state machine gating PDF export.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vpdf_core::types::{ConversionState, JobId};

/// The session's single conversion job.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionJob {
    pub id: JobId,
    pub state: ConversionState,
    /// Set the first time content is non-blank; never cleared.
    pub unlocked: bool,
    /// Reason for the most recent failure, if any.
    pub error_reason: Option<String>,
    /// Convert attempts started.
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl Default for ConversionJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionJob {
    pub fn new() -> Self {
        Self {
            id: JobId::new(),
            state: ConversionState::Idle,
            unlocked: false,
            error_reason: None,
            attempts: 0,
            updated_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record an edit, upload, or normalization of the content.
    pub fn content_changed(&mut self, non_blank: bool) {
        if self.state == ConversionState::Idle {
            self.state = ConversionState::Editing;
        }
        if non_blank {
            self.unlocked = true;
        }
        if self.unlocked && self.state == ConversionState::Editing {
            self.state = ConversionState::Unlocked;
        }
        self.touch();
    }

    pub fn is_converting(&self) -> bool {
        self.state == ConversionState::Converting
    }

    pub fn can_convert(&self) -> bool {
        self.unlocked && !self.is_converting()
    }

    /// Enter `Converting`. Returns false when not allowed (locked, or a
    /// conversion is already running).
    pub fn begin(&mut self) -> bool {
        if !self.can_convert() {
            return false;
        }
        self.state = ConversionState::Converting;
        self.attempts += 1;
        self.error_reason = None;
        self.touch();
        true
    }

    pub fn succeed(&mut self) {
        self.state = ConversionState::Succeeded;
        self.touch();
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = ConversionState::Failed;
        self.error_reason = Some(reason.into());
        self.touch();
    }

    /// Return to `Unlocked` after a finished attempt.
    pub fn settle(&mut self) {
        if matches!(
            self.state,
            ConversionState::Succeeded | ConversionState::Failed
        ) {
            self.state = ConversionState::Unlocked;
            self.touch();
        }
    }
}
