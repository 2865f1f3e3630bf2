// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every failure the session recovers from is surfaced as exactly one
// notification. This module owns the wording, severity, and display time of
// that notification so the state machine never formats error text itself.

use std::time::Duration;

use crate::error::VpdfError;
use crate::types::Severity;

/// A human-readable error with plain English message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Plain English message shown in the notification.
    pub message: String,
    /// Severity level (drives colour in the notification sink).
    pub severity: Severity,
    /// How long the notification stays visible.
    pub duration: Duration,
}

impl HumanError {
    fn error(message: &str, millis: u64) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            duration: Duration::from_millis(millis),
        }
    }
}

/// Convert a `VpdfError` into the single notification the user sees.
pub fn humanize_error(err: &VpdfError) -> HumanError {
    match err {
        VpdfError::UnsupportedFormat(_) => HumanError::error(
            "Invalid file type. Please upload a .txt, .md, or .docx file.",
            7000,
        ),

        VpdfError::Extraction(_) => HumanError::error("Failed to extract document content.", 5000),

        VpdfError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::error(
                "The file couldn't be found. It may have been moved or deleted.",
                5000,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::error(
                "The app doesn't have permission to read or write that file.",
                5000,
            ),
            std::io::ErrorKind::InvalidData => HumanError::error(
                "The file couldn't be read. Make sure it is saved as UTF-8 text.",
                5000,
            ),
            _ => HumanError::error("The file couldn't be read.", 5000),
        },

        VpdfError::EmptyContent => HumanError {
            message: "There's no content to convert.".into(),
            severity: Severity::Warning,
            duration: Duration::from_millis(5000),
        },

        VpdfError::InvalidCommand(detail) => HumanError {
            message: format!("That formatting option isn't available ({detail})."),
            severity: Severity::Warning,
            duration: Duration::from_millis(3000),
        },

        VpdfError::RenderTargetMissing
        | VpdfError::RenderWrite(_)
        | VpdfError::InvalidConfig(_)
        | VpdfError::Serialization(_) => {
            HumanError::error("An error occurred during conversion.", 5000)
        }
    }
}
