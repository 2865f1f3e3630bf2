// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — re-open generated output with `lopdf` to confirm it parses
// and carries the expected pages.

use std::path::Path;

use lopdf::{Document, Object};
use tracing::{debug, instrument};
use vpdf_core::error::{Result, VpdfError};

/// Read-only view of a finished PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Open a saved PDF.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            VpdfError::RenderWrite(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Parse PDF bytes held in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            VpdfError::RenderWrite(format!("generated PDF does not parse: {err}"))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// MediaBox width and height of a page (1-indexed), in points.
    pub fn page_size(&self, page_number: u32) -> Option<(f32, f32)> {
        let page_id = *self.document.get_pages().get(&page_number)?;
        let page = self.document.get_dictionary(page_id).ok()?;
        let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
        let number = |object: &Object| match object {
            Object::Integer(value) => Some(*value as f32),
            Object::Real(value) => Some(*value),
            _ => None,
        };
        let coords: Vec<f32> = media_box.iter().filter_map(number).collect();
        match coords.as_slice() {
            [x0, y0, x1, y1] => Some((x1 - x0, y1 - y0)),
            _ => None,
        }
    }
}
