// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendered display tree and paginated output.
//
// The rendering surface produces a `RenderTree` (layout boxes in CSS pixels);
// the paginator turns it into `Page`s (slices in PDF points) for the writer.
//
// Content offsets count rendered characters of text runs plus one unit per
// atomic element, contiguously in document order. The root node covers
// `0..total`, and the slices of all pages cover the same range exactly once.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in CSS pixels, origin at the top-left of the content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Role a node plays during pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Container; page breaks are preferred at its edges.
    Block,
    /// One line box of text; may be sliced if taller than a page.
    Line,
    /// Never split (images, embedded media).
    Atomic,
}

/// Font used for one run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub size_px: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub family: Option<String>,
    /// Fill colour as RGB; `None` is black.
    pub color: Option<[u8; 3]>,
}

/// A positioned run of text within a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// Horizontal offset from the line's left edge, in CSS pixels.
    pub x: f32,
    pub width: f32,
    pub font: FontSpec,
}

/// What the writer draws for a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodePayload {
    #[default]
    None,
    Text { runs: Vec<TextRun> },
    Image { src: String, pixel_width: u32, pixel_height: u32 },
    /// Embedded media that cannot be drawn; the writer prints its source.
    Embed { src: String },
}

/// One node of the rendered display tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub tag: String,
    pub rect: Rect,
    pub content: Range<usize>,
    pub payload: NodePayload,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Leaves are the units the paginator places: lines, atomics, and
    /// blocks without children.
    pub fn is_leaf(&self) -> bool {
        self.kind != NodeKind::Block || self.children.is_empty()
    }

    /// Visit every leaf in document order.
    pub fn leaves(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(node: &'a RenderNode, out: &mut Vec<&'a RenderNode>) {
    if node.is_leaf() {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_leaves(child, out);
    }
}

/// The live display tree of the canonical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    pub root: RenderNode,
}

impl RenderTree {
    pub fn width(&self) -> f32 {
        self.root.rect.width
    }

    pub fn height(&self) -> f32 {
        self.root.rect.height
    }

    /// Total number of content units covered by the tree.
    pub fn content_len(&self) -> usize {
        self.root.content.end
    }
}

/// A horizontal band of the rendered tree placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub content: Range<usize>,
    /// Top of the band in the source tree, CSS pixels.
    pub source_top: f32,
    /// Height of the band in the source tree, CSS pixels.
    pub source_height: f32,
    /// Distance from the top of the page's content area, points.
    pub offset_y: f32,
    /// Drawn height in points; never exceeds the page content height.
    pub height: f32,
    /// Left offset within the content area, points.
    pub x: f32,
    /// Drawn width in points.
    pub width: f32,
    /// Extra downscale for atomic elements taller than a page (1.0 otherwise).
    pub fit_scale: f32,
    /// Only the first band of a sliced line carries its payload.
    pub payload: NodePayload,
}

/// One output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed position in the output.
    pub number: usize,
    /// Points per CSS pixel, identical on both axes.
    pub scale: f32,
    pub slices: Vec<Slice>,
}

impl Page {
    /// Content range covered by this page (empty for an empty page).
    pub fn content(&self) -> Range<usize> {
        match (self.slices.first(), self.slices.last()) {
            (Some(first), Some(last)) => first.content.start..last.content.end,
            _ => 0..0,
        }
    }

    /// Height used on the page, in points.
    pub fn used_height(&self) -> f32 {
        self.slices
            .iter()
            .map(|s| s.offset_y + s.height)
            .fold(0.0, f32::max)
    }
}
