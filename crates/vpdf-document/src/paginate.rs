// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paginator — divides a render tree into page-sized, non-overlapping,
// order-preserving slices.
//
// Rules, in order of precedence:
//   * a top-level block that fits on a fresh page is never split;
//   * atomic elements move whole to the next page; one taller than a page
//     is downscaled to fit and sits alone on its page;
//   * a line taller than a page is cut into page-high bands, the first of
//     which carries its content range.

use tracing::{debug, info, instrument};
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::render::{NodeKind, NodePayload, Page, RenderNode, RenderTree, Slice};
use vpdf_core::types::PageGeometry;

/// Tolerance for float comparisons, in points.
const EPSILON: f32 = 0.01;

/// Points per CSS pixel actually used for `tree` under `geometry`: the
/// requested scale, reduced if the tree would be wider than the page.
pub fn effective_scale(tree: &RenderTree, geometry: &PageGeometry) -> f32 {
    let fit_width = geometry.content_width / tree.width();
    geometry.scale.min(fit_width)
}

fn validate(tree: &RenderTree, geometry: &PageGeometry) -> Result<()> {
    let checks = [
        ("content width", geometry.content_width),
        ("content height", geometry.content_height()),
        ("scale", geometry.scale),
        ("render width", tree.width()),
    ];
    for (name, value) in checks {
        if !(value.is_finite() && value > 0.0) {
            return Err(VpdfError::InvalidConfig(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}

struct PageBuilder {
    pages: Vec<Page>,
    slices: Vec<Slice>,
    /// Source y (px) of the current page's top edge.
    origin: f32,
    scale: f32,
    page_height: f32,
    /// The next leaf must start a new page.
    break_pending: bool,
}

impl PageBuilder {
    fn new(scale: f32, page_height: f32) -> Self {
        Self {
            pages: Vec::new(),
            slices: Vec::new(),
            origin: 0.0,
            scale,
            page_height,
            break_pending: false,
        }
    }

    /// Close the current page (if it holds anything) and start the next one
    /// at source y `origin`.
    fn break_page(&mut self, origin: f32) {
        if !self.slices.is_empty() {
            let number = self.pages.len() + 1;
            self.pages.push(Page {
                number,
                scale: self.scale,
                slices: std::mem::take(&mut self.slices),
            });
        }
        self.origin = origin;
        self.break_pending = false;
    }

    fn fits(&self, top: f32, height_px: f32) -> bool {
        (top - self.origin + height_px) * self.scale <= self.page_height + EPSILON
    }

    fn fits_fresh_page(&self, height_px: f32) -> bool {
        height_px * self.scale <= self.page_height + EPSILON
    }

    fn push(&mut self, node: &RenderNode, top: f32, height_px: f32, first: bool, fit_scale: f32) {
        let (content, payload) = if first {
            (node.content.clone(), node.payload.clone())
        } else {
            (node.content.end..node.content.end, NodePayload::None)
        };
        self.slices.push(Slice {
            content,
            source_top: top,
            source_height: height_px,
            offset_y: (top - self.origin) * self.scale,
            height: (height_px * self.scale * fit_scale).min(self.page_height),
            x: node.rect.x * self.scale,
            width: node.rect.width * self.scale * fit_scale,
            fit_scale,
            payload,
        });
    }

    fn keep_together(&mut self, block: &RenderNode) {
        if !self.slices.is_empty()
            && self.fits_fresh_page(block.rect.height)
            && !self.fits(block.rect.y, block.rect.height)
        {
            debug!(tag = %block.tag, top = block.rect.y, "Block moved to next page");
            self.break_page(block.rect.y);
        }
    }

    fn place(&mut self, leaf: &RenderNode) {
        let top = leaf.rect.y;
        let height = leaf.rect.height;
        if self.break_pending {
            self.break_page(top);
        }
        if self.fits(top, height) {
            self.push(leaf, top, height, true, 1.0);
            return;
        }
        if self.fits_fresh_page(height) {
            self.break_page(top);
            self.push(leaf, top, height, true, 1.0);
            return;
        }

        self.break_page(top);
        match leaf.kind {
            NodeKind::Atomic => {
                let fit_scale = self.page_height / (height * self.scale);
                debug!(tag = %leaf.tag, fit_scale, "Oversized element scaled onto its own page");
                self.push(leaf, top, height, true, fit_scale);
                self.break_pending = true;
            }
            NodeKind::Line | NodeKind::Block => {
                let band = self.page_height / self.scale;
                let bottom = leaf.rect.bottom();
                let mut band_top = top;
                let mut first = true;
                while bottom - band_top > EPSILON / self.scale {
                    if !first {
                        self.break_page(band_top);
                    }
                    let band_height = (bottom - band_top).min(band);
                    self.push(leaf, band_top, band_height, first, 1.0);
                    band_top += band_height;
                    first = false;
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.break_page(self.origin);
        if self.pages.is_empty() {
            self.pages.push(Page {
                number: 1,
                scale: self.scale,
                slices: Vec::new(),
            });
        }
        self.pages
    }
}

/// Divide `tree` into pages under `geometry`.
#[instrument(skip_all, fields(height = tree.height(), content = tree.content_len()))]
pub fn paginate(tree: &RenderTree, geometry: &PageGeometry) -> Result<Vec<Page>> {
    validate(tree, geometry)?;
    let scale = effective_scale(tree, geometry);
    let mut builder = PageBuilder::new(scale, geometry.content_height());

    let blocks: Vec<&RenderNode> = if tree.root.children.is_empty() {
        vec![&tree.root]
    } else {
        tree.root.children.iter().collect()
    };
    for block in blocks {
        builder.keep_together(block);
        for leaf in block.leaves() {
            builder.place(leaf);
        }
    }

    let pages = builder.finish();
    info!(pages = pages.len(), scale, "Pagination complete");
    Ok(pages)
}
