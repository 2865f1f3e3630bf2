// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits consumed by the conversion pipeline.
//
// The session never reaches for an ambient editor, extractor, or PDF library:
// each collaborator is injected behind one of these traits so a concrete
// backend can be swapped for a test double.

use std::ops::Range;

use vpdf_core::error::Result;
use vpdf_core::render::{Page, RenderTree};
use vpdf_core::types::{FormatCommand, Notification, PageGeometry};

/// The rich-text editor holding the live document.
pub trait RichTextSurface: Send {
    /// Current rendered markup (the editor's inner HTML).
    fn markup(&self) -> String;

    /// Current rendered text (the editor's inner text).
    fn plain_text(&self) -> String;

    /// Replace the whole document with the given HTML.
    fn set_content(&mut self, html: &str) -> Result<()>;

    /// Apply a formatting command to the characters of `selection`
    /// (offsets into [`plain_text`](Self::plain_text)).
    fn apply_format(&mut self, command: &FormatCommand, selection: Range<usize>) -> Result<()>;

    /// Lay the document out at `window_width` CSS pixels.
    ///
    /// Returns `None` when the surface has nothing mounted to render.
    fn render_tree(&self, window_width: f32) -> Option<RenderTree>;

    /// Detached copy of the current document, rendered off the editor so a
    /// slow layout never holds the live surface.
    fn snapshot(&self) -> Box<dyn RichTextSurface>;
}

/// Pulls best-effort plain text out of a binary document.
pub trait TextExtractor: Send + Sync {
    /// Extract text, discarding styling.
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Serialises paginated output into a single document.
pub trait PageWriter: Send + Sync {
    /// Produce the complete file. No bytes are returned unless every page
    /// was written.
    fn write(&self, pages: &[Page], geometry: &PageGeometry) -> Result<Vec<u8>>;
}

/// Displays status messages to the user.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}
