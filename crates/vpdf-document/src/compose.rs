// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render compositor — render tree in, PDF bytes out.
//
// Runs synchronously from start to finish: the tree is taken from the
// surface once, so pagination and writing see a single consistent snapshot.

use serde::Serialize;
use tracing::{info, instrument};
use vpdf_bridge::{PageWriter, RichTextSurface};
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::render::Page;
use vpdf_core::types::PageGeometry;

use crate::paginate::paginate;

/// Finished, not yet saved, output of one conversion.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pages: Vec<Page>,
    pub bytes: Vec<u8>,
}

/// Per-page overview for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub slices: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub used_height_pt: f32,
}

impl From<&Page> for PageSummary {
    fn from(page: &Page) -> Self {
        let content = page.content();
        Self {
            number: page.number,
            slices: page.slices.len(),
            content_start: content.start,
            content_end: content.end,
            used_height_pt: page.used_height(),
        }
    }
}

/// Lay the surface out and divide it into pages.
pub fn layout_pages(surface: &dyn RichTextSurface, geometry: &PageGeometry) -> Result<Vec<Page>> {
    let tree = surface
        .render_tree(geometry.window_width)
        .ok_or(VpdfError::RenderTargetMissing)?;
    paginate(&tree, geometry)
}

/// Render, paginate and serialise the surface's current content.
#[instrument(skip_all, fields(window_width = geometry.window_width))]
pub fn compose(
    surface: &dyn RichTextSurface,
    writer: &dyn PageWriter,
    geometry: &PageGeometry,
) -> Result<RenderedDocument> {
    let pages = layout_pages(surface, geometry)?;
    let bytes = writer.write(&pages, geometry)?;
    info!(pages = pages.len(), bytes = bytes.len(), "Document composed");
    Ok(RenderedDocument { pages, bytes })
}
