// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// vpdf — Capability interfaces between the conversion core and its
// collaborators (editor surface, document extractor, PDF writer, and the
// notification display).

pub mod sinks;
pub mod traits;

pub use sinks::{ConsoleSink, MemorySink};
pub use traits::{NotificationSink, PageWriter, RichTextSurface, TextExtractor};

/// The sink used when no display is attached: notifications go to stderr.
pub fn default_sink() -> std::sync::Arc<dyn NotificationSink> {
    std::sync::Arc::new(ConsoleSink)
}
