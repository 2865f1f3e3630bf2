// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout engine — lays the content model out at a window width and produces
// the render tree the paginator consumes.
//
// Text uses average-advance metrics (no font files), wrapped greedily on
// word boundaries. Words wider than a line are broken at character level.

use tracing::{debug, instrument};
use vpdf_core::config::Typography;
use vpdf_core::render::{FontSpec, NodeKind, NodePayload, Rect, RenderNode, RenderTree, TextRun};
use vpdf_core::types::{Alignment, ListKind};

use crate::color::parse_css_color;
use crate::image_source::{FALLBACK_SIZE, intrinsic_size};
use crate::model::{Block, BlockKind, Inline, RunStyle};

/// Pixel sizes of legacy font sizes 1..=7.
const FONT_SIZE_PX: [f32; 7] = [10.0, 13.0, 16.0, 18.0, 24.0, 32.0, 48.0];

/// Heading scale relative to the base font, h1..h6.
const HEADING_SCALE: [f32; 6] = [2.0, 1.5, 1.17, 1.0, 0.83, 0.67];

/// Default box of an embedded player, as browsers size an `<iframe>`.
const EMBED_SIZE: (u32, u32) = (300, 150);

/// Lays blocks out into a render tree.
pub struct LayoutEngine<'a> {
    typography: &'a Typography,
}

/// A line under construction.
#[derive(Default)]
struct LineBuf {
    runs: Vec<TextRun>,
    cursor: f32,
    /// Width without trailing whitespace.
    ink_width: f32,
    max_font: f32,
    chars: usize,
}

impl LineBuf {
    fn is_empty(&self) -> bool {
        self.chars == 0
    }

    fn push(&mut self, text: &str, font: &FontSpec, advance: f32) {
        let width = advance * text.chars().count() as f32;
        let is_space = text.chars().all(char::is_whitespace);
        match self.runs.last_mut() {
            Some(last) if last.font == *font => {
                last.text.push_str(text);
                last.width += width;
            }
            _ => self.runs.push(TextRun {
                text: text.to_string(),
                x: self.cursor,
                width,
                font: font.clone(),
            }),
        }
        self.cursor += width;
        if !is_space {
            self.ink_width = self.cursor;
        }
        self.max_font = self.max_font.max(font.size_px);
        self.chars += text.chars().count();
    }
}

/// Per-block state while flowing runs into lines.
struct Flow<'t> {
    typography: &'t Typography,
    x: f32,
    available: f32,
    align: Alignment,
    block_font: f32,
    y: f32,
    offset: usize,
    line: LineBuf,
    nodes: Vec<RenderNode>,
    marker: Option<TextRun>,
}

impl<'t> Flow<'t> {
    fn finish_line(&mut self) {
        let mut line = std::mem::take(&mut self.line);
        let font = if line.max_font > 0.0 {
            line.max_font
        } else {
            self.block_font
        };
        let height = font * self.typography.line_height;
        let shift = match self.align {
            Alignment::Center => ((self.available - line.ink_width) / 2.0).max(0.0),
            Alignment::Right => (self.available - line.ink_width).max(0.0),
            Alignment::Left | Alignment::Justify => 0.0,
        };
        for run in &mut line.runs {
            run.x += shift;
        }
        if let Some(marker) = self.marker.take() {
            line.runs.insert(0, marker);
        }
        let start = self.offset;
        self.offset += line.chars;
        self.nodes.push(RenderNode {
            kind: NodeKind::Line,
            tag: "line".into(),
            rect: Rect::new(self.x, self.y, self.available, height),
            content: start..self.offset,
            payload: NodePayload::Text { runs: line.runs },
            children: Vec::new(),
        });
        self.y += height;
    }

    fn place_text(&mut self, text: &str, font: &FontSpec, advance: f32) {
        for token in tokens(text) {
            if token.chars().all(char::is_whitespace) {
                // Spaces hang at the end of a line instead of wrapping.
                self.line.push(token, font, advance);
                continue;
            }
            let mut rest = token;
            loop {
                let room = self.available - self.line.cursor;
                let width = advance * rest.chars().count() as f32;
                if width <= room {
                    self.line.push(rest, font, advance);
                    break;
                }
                if !self.line.is_empty() {
                    self.finish_line();
                    continue;
                }
                let fit = ((room / advance).floor() as usize).max(1);
                let split = rest
                    .char_indices()
                    .nth(fit)
                    .map(|(b, _)| b)
                    .unwrap_or(rest.len());
                let (head, tail) = rest.split_at(split);
                self.line.push(head, font, advance);
                if tail.is_empty() {
                    break;
                }
                self.finish_line();
                rest = tail;
            }
        }
    }

    fn place_image(&mut self, src: &str, width: Option<u32>, height: Option<u32>) {
        let (pixel_width, pixel_height) = intrinsic_size(src).unwrap_or(FALLBACK_SIZE);
        let payload = NodePayload::Image {
            src: src.to_string(),
            pixel_width,
            pixel_height,
        };
        self.place_atomic("img", payload, (pixel_width, pixel_height), width, height);
    }

    fn place_video(&mut self, src: &str, width: Option<u32>, height: Option<u32>) {
        let payload = NodePayload::Embed {
            src: src.to_string(),
        };
        self.place_atomic("iframe", payload, EMBED_SIZE, width, height);
    }

    /// Place an unsplittable box on its own line, scaled down to fit.
    fn place_atomic(
        &mut self,
        tag: &str,
        payload: NodePayload,
        (pixel_width, pixel_height): (u32, u32),
        width: Option<u32>,
        height: Option<u32>,
    ) {
        if !self.line.is_empty() {
            self.finish_line();
        }
        let (w, h) = match (width, height) {
            (Some(w), Some(h)) => (w as f32, h as f32),
            (Some(w), None) => (w as f32, w as f32 * pixel_height as f32 / pixel_width as f32),
            (None, Some(h)) => (h as f32 * pixel_width as f32 / pixel_height as f32, h as f32),
            (None, None) => (pixel_width as f32, pixel_height as f32),
        };
        let fit = if w > self.available && w > 0.0 {
            self.available / w
        } else {
            1.0
        };
        let rect = Rect::new(self.x, self.y, w * fit, h * fit);
        let start = self.offset;
        self.offset += 1;
        self.nodes.push(RenderNode {
            kind: NodeKind::Atomic,
            tag: tag.into(),
            rect,
            content: start..self.offset,
            payload,
            children: Vec::new(),
        });
        self.y += rect.height;
    }
}

/// Split text into alternating runs of whitespace and non-whitespace.
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (index, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|current| current != space) {
            out.push(&text[start..index]);
            start = index;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

impl<'a> LayoutEngine<'a> {
    pub fn new(typography: &'a Typography) -> Self {
        Self { typography }
    }

    fn block_font(&self, kind: BlockKind) -> f32 {
        match kind {
            BlockKind::Heading(level) => {
                let index = usize::from(level.clamp(1, 6)) - 1;
                self.typography.base_font_px * HEADING_SCALE[index]
            }
            _ => self.typography.base_font_px,
        }
    }

    fn font_for(&self, style: &RunStyle, block_font: f32, heading: bool) -> FontSpec {
        let size_px = match style.font_size {
            Some(size) => {
                let px = FONT_SIZE_PX[usize::from(size.clamp(1, 7)) - 1];
                px * block_font / self.typography.base_font_px
            }
            None => block_font,
        };
        FontSpec {
            size_px,
            bold: style.bold || heading,
            italic: style.italic,
            underline: style.underline,
            strike: style.strike,
            family: style.font_name.clone(),
            color: style.color.as_deref().and_then(parse_css_color),
        }
    }

    fn advance(&self, font: &FontSpec) -> f32 {
        let em = if font.bold {
            self.typography.bold_char_width_em
        } else {
            self.typography.char_width_em
        };
        font.size_px * em
    }

    /// Lay `blocks` out at `window_width` CSS pixels.
    #[instrument(skip(self, blocks), fields(blocks = blocks.len()))]
    pub fn layout(&self, blocks: &[Block], window_width: f32) -> RenderTree {
        let mut children = Vec::with_capacity(blocks.len());
        let mut y = 0.0;
        let mut offset = 0;
        let mut ordinal = 0usize;

        for block in blocks {
            ordinal = match block.kind {
                BlockKind::ListItem(ListKind::Ordered) => ordinal + 1,
                _ => 0,
            };
            let node = self.layout_block(block, window_width, y, offset, ordinal);
            y = node.rect.bottom() + self.typography.block_spacing_px;
            offset = node.content.end;
            children.push(node);
        }

        debug!(height = y, content = offset, "Layout complete");
        RenderTree {
            root: RenderNode {
                kind: NodeKind::Block,
                tag: "body".into(),
                rect: Rect::new(0.0, 0.0, window_width, y),
                content: 0..offset,
                payload: NodePayload::None,
                children,
            },
        }
    }

    fn layout_block(
        &self,
        block: &Block,
        window_width: f32,
        top: f32,
        offset: usize,
        ordinal: usize,
    ) -> RenderNode {
        let list_indent = match block.kind {
            BlockKind::ListItem(_) => self.typography.list_indent_px,
            _ => 0.0,
        };
        let indent = (f32::from(block.indent) * self.typography.indent_step_px + list_indent)
            .min(window_width / 2.0);
        let block_font = self.block_font(block.kind);
        let heading = matches!(block.kind, BlockKind::Heading(_));

        let marker = match block.kind {
            BlockKind::ListItem(kind) => {
                let font = self.font_for(&RunStyle::default(), block_font, false);
                let text = match kind {
                    ListKind::Ordered => format!("{ordinal}."),
                    ListKind::Bullet => "-".to_string(),
                };
                Some(TextRun {
                    x: -list_indent.min(indent),
                    width: self.advance(&font) * text.chars().count() as f32,
                    text,
                    font,
                })
            }
            _ => None,
        };

        let mut flow = Flow {
            typography: self.typography,
            x: indent,
            available: (window_width - indent).max(1.0),
            align: block.align,
            block_font,
            y: top,
            offset,
            line: LineBuf::default(),
            nodes: Vec::new(),
            marker,
        };

        for run in &block.runs {
            match run {
                Inline::Text { text, style } => {
                    let font = self.font_for(style, block_font, heading);
                    let advance = self.advance(&font);
                    flow.place_text(text, &font, advance);
                }
                Inline::Image { src, width, height } => flow.place_image(src, *width, *height),
                Inline::Video { src, width, height } => flow.place_video(src, *width, *height),
            }
        }
        if !flow.line.is_empty() || flow.nodes.is_empty() {
            flow.finish_line();
        }

        let tag = match block.kind {
            BlockKind::Paragraph => "p".to_string(),
            BlockKind::Heading(level) => format!("h{level}"),
            BlockKind::ListItem(_) => "li".to_string(),
        };
        RenderNode {
            kind: NodeKind::Block,
            tag,
            rect: Rect::new(0.0, top, window_width, flow.y - top),
            content: offset..flow.offset,
            payload: NodePayload::None,
            children: flow.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(blocks: &[Block], width: f32) -> RenderTree {
        LayoutEngine::new(&Typography::default()).layout(blocks, width)
    }

    #[test]
    fn tokens_alternate_words_and_spaces() {
        assert_eq!(tokens("ab  cd e"), vec!["ab", "  ", "cd", " ", "e"]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn short_paragraph_is_one_line() {
        let tree = layout(&[Block::paragraph("hello world")], 650.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].rect.height, 24.0);
        assert_eq!(tree.content_len(), 11);
    }

    #[test]
    fn wrapping_keeps_content_contiguous() {
        // 8 px per char: "word " is 40 px, so 100 px holds two words a line.
        let text = "word ".repeat(10);
        let tree = layout(&[Block::paragraph(text.clone())], 100.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 5);
        let mut expected = 0;
        for leaf in &leaves {
            assert_eq!(leaf.content.start, expected);
            expected = leaf.content.end;
        }
        assert_eq!(expected, text.chars().count());
    }

    #[test]
    fn long_word_is_force_broken() {
        let tree = layout(&[Block::paragraph("x".repeat(30))], 80.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].content, 0..10);
        assert_eq!(tree.content_len(), 30);
    }

    #[test]
    fn empty_block_renders_one_line() {
        let blocks = [Block::paragraph("a"), Block::default(), Block::paragraph("b")];
        let tree = layout(&blocks, 650.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1].content, 1..1);
        assert_eq!(leaves[1].rect.y, 24.0);
        assert_eq!(tree.height(), 72.0);
    }

    #[test]
    fn headings_are_larger() {
        let mut heading = Block::paragraph("Title");
        heading.kind = BlockKind::Heading(1);
        let tree = layout(&[heading], 650.0);
        assert_eq!(tree.height(), 48.0);
    }

    #[test]
    fn image_is_atomic_and_scaled_to_width() {
        let block = Block {
            runs: vec![
                Inline::text("a", RunStyle::default()),
                Inline::Image {
                    src: "remote.png".into(),
                    width: None,
                    height: None,
                },
                Inline::text("b", RunStyle::default()),
            ],
            ..Block::default()
        };
        let tree = layout(&[block], 150.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1].kind, NodeKind::Atomic);
        assert_eq!(leaves[1].rect.width, 150.0);
        assert_eq!(leaves[1].rect.height, 75.0);
        assert_eq!(leaves[1].content, 1..2);
        assert_eq!(tree.content_len(), 3);
    }

    #[test]
    fn video_is_atomic_with_embed_payload() {
        let block = Block {
            runs: vec![Inline::Video {
                src: "https://example.com/v".into(),
                width: None,
                height: None,
            }],
            ..Block::default()
        };
        let tree = layout(&[block], 650.0);
        let leaves = tree.root.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].kind, NodeKind::Atomic);
        assert_eq!(leaves[0].rect.width, 300.0);
        assert_eq!(
            leaves[0].payload,
            NodePayload::Embed {
                src: "https://example.com/v".into()
            }
        );
        assert_eq!(tree.content_len(), 1);
    }

    #[test]
    fn indent_level_shifts_the_block() {
        let mut block = Block::paragraph("hi");
        block.indent = 2;
        let tree = layout(&[block], 650.0);
        assert_eq!(tree.root.leaves()[0].rect.x, 96.0);

        let mut item = Block::paragraph("hi");
        item.kind = BlockKind::ListItem(ListKind::Bullet);
        item.indent = 1;
        let tree = layout(&[item], 650.0);
        let leaf = tree.root.leaves()[0];
        assert_eq!(leaf.rect.x, 48.0 + Typography::default().list_indent_px);
        let NodePayload::Text { runs } = &leaf.payload else {
            panic!("expected text");
        };
        assert_eq!(runs[0].x, -Typography::default().list_indent_px);
    }

    #[test]
    fn run_colour_reaches_the_font() {
        let red = RunStyle {
            color: Some("rgb(230, 0, 0)".into()),
            ..RunStyle::default()
        };
        let block = Block {
            runs: vec![Inline::text("hi", red)],
            ..Block::default()
        };
        let tree = layout(&[block], 650.0);
        let NodePayload::Text { runs } = &tree.root.leaves()[0].payload else {
            panic!("expected text");
        };
        assert_eq!(runs[0].font.color, Some([230, 0, 0]));
    }

    #[test]
    fn ordered_list_markers_count_up() {
        let mut first = Block::paragraph("one");
        first.kind = BlockKind::ListItem(ListKind::Ordered);
        let mut second = Block::paragraph("two");
        second.kind = BlockKind::ListItem(ListKind::Ordered);
        let tree = layout(&[first, second], 650.0);
        let leaves = tree.root.leaves();
        let NodePayload::Text { runs } = &leaves[1].payload else {
            panic!("expected text");
        };
        assert_eq!(runs[0].text, "2.");
        assert!(runs[0].x < 0.0);
        assert_eq!(leaves[1].content, 3..6);
    }

    #[test]
    fn centered_line_is_shifted() {
        let mut block = Block::paragraph("ab");
        block.align = Alignment::Center;
        let tree = layout(&[block], 100.0);
        let NodePayload::Text { runs } = &tree.root.leaves()[0].payload else {
            panic!("expected text");
        };
        assert_eq!(runs[0].x, 42.0);
    }
}
