// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content model — the owned rich-text document behind the editor surface.
//
// HTML is parsed into an ordered list of blocks of styled runs. Formatting
// commands mutate the blocks directly, and `markup()` serializes them back.
// Documents without any formatting serialize exactly like the plain-text
// projection (escaped lines joined by `<br>`).

use std::ops::Range;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use vpdf_bridge::RichTextSurface;
use vpdf_core::config::Typography;
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::render::RenderTree;
use vpdf_core::types::{Alignment, FormatCommand, ListKind};

use crate::color::parse_css_color;
use crate::layout::LayoutEngine;
use crate::normalize::{LINE_BREAK_MARKER, escape_html};

/// Inline styling of a text run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Legacy HTML font size, 1 through 7 (3 is the browser default).
    pub font_size: Option<u8>,
    pub font_name: Option<String>,
    /// CSS colour of the text.
    pub color: Option<String>,
    /// CSS highlight colour.
    pub background: Option<String>,
    pub link: Option<String>,
}

impl RunStyle {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// One inline item of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inline {
    Text {
        text: String,
        style: RunStyle,
    },
    Image {
        src: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Embedded video player; laid out like an image, printed as its URL.
    Video {
        src: String,
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl Inline {
    pub fn text(text: impl Into<String>, style: RunStyle) -> Self {
        Self::Text {
            text: text.into(),
            style,
        }
    }

    /// Characters this item contributes to the plain text.
    fn char_len(&self) -> usize {
        match self {
            Self::Text { text, .. } => text.chars().count(),
            Self::Image { .. } | Self::Video { .. } => 0,
        }
    }
}

/// Structural role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading(u8),
    ListItem(ListKind),
}

/// One line-level block of the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub align: Alignment,
    /// Indent level, 0 through 8.
    pub indent: u8,
    pub runs: Vec<Inline>,
}

impl Block {
    pub fn new(kind: BlockKind, align: Alignment) -> Self {
        Self {
            kind,
            align,
            indent: 0,
            runs: Vec::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        let mut block = Self::default();
        block.push_text(&text.into(), &RunStyle::default());
        block
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| match run {
                Inline::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(Inline::char_len).sum()
    }

    /// No text and no embeds.
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| match run {
            Inline::Text { text, .. } => text.is_empty(),
            _ => false,
        })
    }

    fn is_plain(&self) -> bool {
        self.kind == BlockKind::Paragraph
            && self.align == Alignment::Left
            && self.indent == 0
            && self.runs.iter().all(|run| match run {
                Inline::Text { style, .. } => style.is_plain(),
                _ => false,
            })
    }

    fn push_text(&mut self, text: &str, style: &RunStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text { text: last, style: last_style }) = self.runs.last_mut() {
            if last_style == style {
                last.push_str(text);
                return;
            }
        }
        self.runs.push(Inline::text(text, style.clone()));
    }

    /// Drop empty text runs and merge neighbours with identical style.
    fn coalesce(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match run {
                Inline::Text { text, .. } if text.is_empty() => {}
                Inline::Text { text, style } => match merged.last_mut() {
                    Some(Inline::Text {
                        text: last,
                        style: last_style,
                    }) if *last_style == style => last.push_str(&text),
                    _ => merged.push(Inline::Text { text, style }),
                },
                embed => merged.push(embed),
            }
        }
        self.runs = merged;
    }

    /// Split runs so a run boundary falls at char offset `at`; returns the
    /// index of the first run at or after it.
    fn split_at(&mut self, at: usize) -> usize {
        let mut offset = 0;
        for index in 0..self.runs.len() {
            if offset == at {
                return index;
            }
            let len = self.runs[index].char_len();
            if at < offset + len {
                if let Inline::Text { text, style } = &mut self.runs[index] {
                    let byte = text
                        .char_indices()
                        .nth(at - offset)
                        .map(|(b, _)| b)
                        .unwrap_or(text.len());
                    let tail = text.split_off(byte);
                    let style = style.clone();
                    self.runs.insert(index + 1, Inline::Text { text: tail, style });
                }
                return index + 1;
            }
            offset += len;
        }
        self.runs.len()
    }

    /// Mutable text styles of the runs covering `local` chars.
    fn styles_in(&mut self, local: Range<usize>) -> Vec<&mut RunStyle> {
        let start = self.split_at(local.start);
        let end = self.split_at(local.end);
        self.runs[start..end]
            .iter_mut()
            .filter_map(|run| match run {
                Inline::Text { style, .. } => Some(style),
                _ => None,
            })
            .collect()
    }
}

/// The editor's document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentModel {
    blocks: Vec<Block>,
    typography: Typography,
}

impl ContentModel {
    pub fn new(typography: Typography) -> Self {
        Self {
            blocks: Vec::new(),
            typography,
        }
    }

    pub fn from_html(html: &str) -> Self {
        let mut model = Self::default();
        model.load(html);
        model
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn typography(&self) -> &Typography {
        &self.typography
    }

    /// True when nothing beyond bare paragraphs of unstyled text is present.
    pub fn is_plain(&self) -> bool {
        self.blocks.iter().all(Block::is_plain)
    }

    fn load(&mut self, html: &str) {
        self.blocks = parse_blocks(html);
        for block in &mut self.blocks {
            block.coalesce();
        }
    }

    /// Char span of each block within `plain_text()`; blocks are separated
    /// by one newline that belongs to neither.
    fn spans(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.blocks
            .iter()
            .map(|block| {
                let span = start..start + block.char_len();
                start = span.end + 1;
                span
            })
            .collect()
    }

    fn text_len(&self) -> usize {
        self.spans().last().map_or(0, |span| span.end)
    }

    /// Indices of blocks the selection touches (a caret touches one block).
    fn touched_blocks(&self, selection: &Range<usize>) -> Vec<usize> {
        self.spans()
            .iter()
            .enumerate()
            .filter(|(_, span)| span.start <= selection.end && selection.start <= span.end)
            .map(|(index, _)| index)
            .collect()
    }

    /// Block-local char ranges of a non-empty selection.
    fn local_ranges(&self, selection: &Range<usize>) -> Vec<(usize, Range<usize>)> {
        self.spans()
            .iter()
            .enumerate()
            .filter_map(|(index, span)| {
                let start = selection.start.max(span.start);
                let end = selection.end.min(span.end);
                (start < end).then(|| (index, start - span.start..end - span.start))
            })
            .collect()
    }

    /// Toggle or set an inline style over the selection. When every selected
    /// run already satisfies `has`, `set` receives `false`.
    fn apply_inline(
        &mut self,
        selection: &Range<usize>,
        set: impl Fn(&mut RunStyle, bool),
        has: impl Fn(&RunStyle) -> bool,
    ) {
        let ranges = self.local_ranges(selection);
        let all_set = ranges.iter().all(|(index, local)| {
            let mut scratch = self.blocks[*index].clone();
            scratch
                .styles_in(local.clone())
                .into_iter()
                .all(|style| has(style))
        });
        for (index, local) in ranges {
            let block = &mut self.blocks[index];
            for style in block.styles_in(local) {
                set(style, !all_set);
            }
            block.coalesce();
        }
    }

    /// Insert an embed at plain-text offset `at`.
    fn insert_inline(&mut self, at: usize, embed: Inline) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::default());
        }
        let spans = self.spans();
        let index = spans
            .iter()
            .position(|span| at <= span.end)
            .unwrap_or(spans.len() - 1);
        let local = at.saturating_sub(spans[index].start);
        let block = &mut self.blocks[index];
        let position = block.split_at(local);
        block.runs.insert(position, embed);
        block.coalesce();
    }

    fn serialize(&self) -> String {
        if self.is_plain() {
            return self
                .blocks
                .iter()
                .map(|block| escape_html(&block.text()))
                .collect::<Vec<_>>()
                .join(LINE_BREAK_MARKER);
        }

        let mut out = String::new();
        let mut open_list: Option<ListKind> = None;
        for block in &self.blocks {
            let list = match block.kind {
                BlockKind::ListItem(kind) => Some(kind),
                _ => None,
            };
            if list != open_list {
                if let Some(kind) = open_list {
                    out.push_str(list_close(kind));
                }
                if let Some(kind) = list {
                    out.push_str(list_open(kind));
                }
                open_list = list;
            }

            let tag = match block.kind {
                BlockKind::Paragraph => "p".to_string(),
                BlockKind::Heading(level) => format!("h{level}"),
                BlockKind::ListItem(_) => "li".to_string(),
            };
            out.push('<');
            out.push_str(&tag);
            if block.indent > 0 {
                out.push_str(&format!(" class=\"ql-indent-{}\"", block.indent));
            }
            if block.align != Alignment::Left {
                out.push_str(&format!(
                    " style=\"text-align: {};\"",
                    block.align.css_keyword()
                ));
            }
            out.push('>');
            if block.is_empty() {
                out.push_str(LINE_BREAK_MARKER);
            } else {
                for run in &block.runs {
                    serialize_inline(run, &mut out);
                }
            }
            out.push_str(&format!("</{tag}>"));
        }
        if let Some(kind) = open_list {
            out.push_str(list_close(kind));
        }
        out
    }
}

fn list_open(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Ordered => "<ol>",
        ListKind::Bullet => "<ul>",
    }
}

fn list_close(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Ordered => "</ol>",
        ListKind::Bullet => "</ul>",
    }
}

fn serialize_inline(run: &Inline, out: &mut String) {
    match run {
        Inline::Image { src, width, height } => {
            out.push_str(&format!("<img src=\"{}\"", escape_html(src)));
            if let Some(width) = width {
                out.push_str(&format!(" width=\"{width}\""));
            }
            if let Some(height) = height {
                out.push_str(&format!(" height=\"{height}\""));
            }
            out.push('>');
        }
        Inline::Video { src, width, height } => {
            out.push_str("<iframe class=\"ql-video\" frameborder=\"0\" allowfullscreen=\"true\"");
            out.push_str(&format!(" src=\"{}\"", escape_html(src)));
            if let Some(width) = width {
                out.push_str(&format!(" width=\"{width}\""));
            }
            if let Some(height) = height {
                out.push_str(&format!(" height=\"{height}\""));
            }
            out.push_str("></iframe>");
        }
        Inline::Text { text, style } => {
            let mut html = escape_html(text);
            if style.strike {
                html = format!("<s>{html}</s>");
            }
            if style.underline {
                html = format!("<u>{html}</u>");
            }
            if style.italic {
                html = format!("<em>{html}</em>");
            }
            if style.bold {
                html = format!("<strong>{html}</strong>");
            }
            if style.font_size.is_some() || style.font_name.is_some() {
                let mut attrs = String::new();
                if let Some(size) = style.font_size {
                    attrs.push_str(&format!(" size=\"{size}\""));
                }
                if let Some(face) = &style.font_name {
                    attrs.push_str(&format!(" face=\"{}\"", escape_html(face)));
                }
                html = format!("<font{attrs}>{html}</font>");
            }
            if style.color.is_some() || style.background.is_some() {
                let mut css = String::new();
                if let Some(color) = &style.color {
                    css.push_str(&format!("color: {};", escape_html(color)));
                }
                if let Some(background) = &style.background {
                    if !css.is_empty() {
                        css.push(' ');
                    }
                    css.push_str(&format!("background-color: {};", escape_html(background)));
                }
                html = format!("<span style=\"{css}\">{html}</span>");
            }
            if let Some(href) = &style.link {
                html = format!("<a href=\"{}\">{html}</a>", escape_html(href));
            }
            out.push_str(&html);
        }
    }
}

impl RichTextSurface for ContentModel {
    fn markup(&self) -> String {
        self.serialize()
    }

    fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[instrument(skip(self, html), fields(html_len = html.len()))]
    fn set_content(&mut self, html: &str) -> Result<()> {
        self.load(html);
        debug!(blocks = self.blocks.len(), "Content replaced");
        Ok(())
    }

    #[instrument(skip(self), fields(blocks = self.blocks.len()))]
    fn apply_format(&mut self, command: &FormatCommand, selection: Range<usize>) -> Result<()> {
        let len = self.text_len();
        if selection.start > selection.end || selection.end > len {
            return Err(VpdfError::InvalidCommand(format!(
                "selection {}..{} is outside the document (length {len})",
                selection.start, selection.end
            )));
        }

        match command {
            FormatCommand::Bold => self.apply_inline(&selection, |s, on| s.bold = on, |s| s.bold),
            FormatCommand::Italic => {
                self.apply_inline(&selection, |s, on| s.italic = on, |s| s.italic)
            }
            FormatCommand::Underline => {
                self.apply_inline(&selection, |s, on| s.underline = on, |s| s.underline)
            }
            FormatCommand::Strike => {
                self.apply_inline(&selection, |s, on| s.strike = on, |s| s.strike)
            }
            FormatCommand::FontSize(size) => {
                if !(1..=7).contains(size) {
                    return Err(VpdfError::InvalidCommand(format!(
                        "font size must be 1 through 7, got {size}"
                    )));
                }
                let size = *size;
                self.apply_inline(&selection, move |s, _| s.font_size = Some(size), |_| false);
            }
            FormatCommand::FontName(name) => {
                if name.trim().is_empty() {
                    return Err(VpdfError::InvalidCommand("font name is empty".into()));
                }
                let name = name.trim().to_string();
                self.apply_inline(
                    &selection,
                    move |s, _| s.font_name = Some(name.clone()),
                    |_| false,
                );
            }
            FormatCommand::Color(value) => {
                let value = checked_color(value)?;
                self.apply_inline(
                    &selection,
                    move |s, _| s.color = Some(value.clone()),
                    |_| false,
                );
            }
            FormatCommand::Background(value) => {
                let value = checked_color(value)?;
                self.apply_inline(
                    &selection,
                    move |s, _| s.background = Some(value.clone()),
                    |_| false,
                );
            }
            FormatCommand::Link(href) => {
                let href = match href.as_deref().map(str::trim) {
                    Some("") => {
                        return Err(VpdfError::InvalidCommand("link target is empty".into()));
                    }
                    other => other.map(str::to_string),
                };
                self.apply_inline(&selection, move |s, _| s.link = href.clone(), |_| false);
            }
            FormatCommand::Indent(level) => {
                if *level > MAX_INDENT {
                    return Err(VpdfError::InvalidCommand(format!(
                        "indent must be 0 through {MAX_INDENT}, got {level}"
                    )));
                }
                for index in self.touched_blocks(&selection) {
                    self.blocks[index].indent = *level;
                }
            }
            FormatCommand::Align(align) => {
                for index in self.touched_blocks(&selection) {
                    self.blocks[index].align = *align;
                }
            }
            FormatCommand::ToggleList(kind) => {
                let touched = self.touched_blocks(&selection);
                let target = BlockKind::ListItem(*kind);
                let all_listed = touched.iter().all(|&i| self.blocks[i].kind == target);
                for index in touched {
                    self.blocks[index].kind = if all_listed {
                        BlockKind::Paragraph
                    } else {
                        target
                    };
                }
            }
            FormatCommand::Heading(level) => {
                let kind = match level {
                    None => BlockKind::Paragraph,
                    Some(level @ 1..=6) => BlockKind::Heading(*level),
                    Some(other) => {
                        return Err(VpdfError::InvalidCommand(format!(
                            "heading level must be 1 through 6, got {other}"
                        )));
                    }
                };
                for index in self.touched_blocks(&selection) {
                    self.blocks[index].kind = kind;
                }
            }
            FormatCommand::InsertImage(src) => {
                if src.trim().is_empty() {
                    return Err(VpdfError::InvalidCommand("image source is empty".into()));
                }
                let image = Inline::Image {
                    src: src.trim().to_string(),
                    width: None,
                    height: None,
                };
                self.insert_inline(selection.start, image);
            }
            FormatCommand::InsertVideo(src) => {
                if src.trim().is_empty() {
                    return Err(VpdfError::InvalidCommand("video source is empty".into()));
                }
                let video = Inline::Video {
                    src: src.trim().to_string(),
                    width: None,
                    height: None,
                };
                self.insert_inline(selection.start, video);
            }
            FormatCommand::ClearFormatting => {
                self.apply_inline(&selection, |s, _| *s = RunStyle::default(), |_| false);
                for index in self.touched_blocks(&selection) {
                    let block = &mut self.blocks[index];
                    block.kind = BlockKind::Paragraph;
                    block.align = Alignment::Left;
                    block.indent = 0;
                }
            }
        }
        debug!(?command, "Format applied");
        Ok(())
    }

    fn render_tree(&self, window_width: f32) -> Option<RenderTree> {
        if !(window_width.is_finite() && window_width > 0.0) {
            warn!(window_width, "No usable rendering window");
            return None;
        }
        Some(LayoutEngine::new(&self.typography).layout(&self.blocks, window_width))
    }

    fn snapshot(&self) -> Box<dyn RichTextSurface> {
        Box::new(self.clone())
    }
}

// -- HTML parsing -------------------------------------------------------------

/// Highest block indent level.
const MAX_INDENT: u8 = 8;

/// Inherited formatting while walking the element tree.
#[derive(Clone, Default)]
struct Context {
    style: RunStyle,
    kind: BlockKind,
    align: Alignment,
    indent: u8,
    list: Option<ListKind>,
}

impl Context {
    fn new_block(&self) -> Block {
        Block {
            indent: self.indent,
            ..Block::new(self.kind, self.align)
        }
    }
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    current: Option<Block>,
    /// `current` was opened by a line break rather than by content.
    opened_by_break: bool,
    /// The last thing seen was the end of a block element.
    after_block: bool,
}

fn parse_blocks(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut builder = Builder::default();
    builder.walk(fragment.root_element(), &Context::default());
    builder.finish()
}

impl Builder {
    fn finish(mut self) -> Vec<Block> {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
        self.blocks
    }

    fn open(&mut self, ctx: &Context) -> &mut Block {
        self.after_block = false;
        self.current
            .get_or_insert_with(|| ctx.new_block())
    }

    fn walk(&mut self, element: ElementRef<'_>, ctx: &Context) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.text(text, ctx);
            } else if let Some(child_element) = ElementRef::wrap(child) {
                self.element(child_element, ctx);
            }
        }
    }

    fn text(&mut self, text: &str, ctx: &Context) {
        // Formatting whitespace between block elements.
        if self.current.is_none()
            && text.trim().is_empty()
            && (text.contains('\n') || self.after_block)
        {
            return;
        }
        for (index, segment) in text.split('\n').enumerate() {
            if index > 0 {
                self.line_break(ctx);
            }
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            if !segment.is_empty() {
                self.open(ctx).push_text(segment, &ctx.style);
            }
        }
    }

    fn line_break(&mut self, ctx: &Context) {
        match self.current.take() {
            Some(block) => self.blocks.push(block),
            None if self.after_block => {}
            None => self.blocks.push(ctx.new_block()),
        }
        self.current = Some(ctx.new_block());
        self.opened_by_break = true;
        self.after_block = false;
    }

    fn element(&mut self, element: ElementRef<'_>, ctx: &Context) {
        let name = element.value().name();
        match name {
            "br" => self.line_break(ctx),
            "img" => {
                let attr = |key: &str| element.value().attr(key);
                let Some(src) = attr("src").filter(|src| !src.trim().is_empty()) else {
                    return;
                };
                let dimension = |key: &str| attr(key).and_then(|v| v.trim().parse::<u32>().ok());
                let image = Inline::Image {
                    src: src.trim().to_string(),
                    width: dimension("width"),
                    height: dimension("height"),
                };
                self.open(ctx).runs.push(image);
            }
            "iframe" | "video" => {
                let attr = |key: &str| element.value().attr(key);
                let Some(src) = attr("src").filter(|src| !src.trim().is_empty()) else {
                    return;
                };
                let dimension = |key: &str| attr(key).and_then(|v| v.trim().parse::<u32>().ok());
                let video = Inline::Video {
                    src: src.trim().to_string(),
                    width: dimension("width"),
                    height: dimension("height"),
                };
                self.open(ctx).runs.push(video);
            }
            "script" | "style" | "head" | "title" | "meta" | "link" => {}
            "ol" | "ul" => {
                let mut inner = inline_context(element, ctx);
                inner.list = Some(if name == "ol" {
                    ListKind::Ordered
                } else {
                    ListKind::Bullet
                });
                self.walk(element, &inner);
            }
            "p" | "div" | "blockquote" | "pre" | "li" | "h1" | "h2" | "h3" | "h4" | "h5"
            | "h6" => {
                let mut inner = inline_context(element, ctx);
                inner.kind = match name {
                    "li" => BlockKind::ListItem(list_item_kind(element, ctx)),
                    heading if heading.starts_with('h') => heading[1..]
                        .parse()
                        .map(BlockKind::Heading)
                        .unwrap_or(ctx.kind),
                    _ => ctx.kind,
                };
                if let Some(align) = block_alignment(element) {
                    inner.align = align;
                }
                if let Some(indent) = block_indent(element) {
                    inner.indent = indent;
                }
                self.block(element, &inner);
            }
            _ => {
                let inner = inline_context(element, ctx);
                self.walk(element, &inner);
            }
        }
    }

    fn block(&mut self, element: ElementRef<'_>, ctx: &Context) {
        if let Some(block) = self.current.take() {
            if !(block.is_empty() && self.opened_by_break) {
                self.blocks.push(block);
            }
        }
        self.opened_by_break = false;
        self.after_block = false;
        let mark = self.blocks.len();

        self.walk(element, ctx);

        if let Some(block) = self.current.take() {
            // A trailing <br> closes the last line; it does not open another.
            if !(block.is_empty() && self.opened_by_break) || self.blocks.len() == mark {
                self.blocks.push(block);
            }
        }
        if self.blocks.len() == mark {
            self.blocks.push(ctx.new_block());
        }
        self.opened_by_break = false;
        self.after_block = true;
    }
}

fn list_item_kind(element: ElementRef<'_>, ctx: &Context) -> ListKind {
    match element.value().attr("data-list") {
        Some("bullet") => ListKind::Bullet,
        Some("ordered") => ListKind::Ordered,
        _ => ctx.list.unwrap_or(ListKind::Bullet),
    }
}

fn css_declarations(element: ElementRef<'_>) -> Vec<(String, String)> {
    element
        .value()
        .attr("style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_ascii_lowercase()))
        .collect()
}

fn block_alignment(element: ElementRef<'_>) -> Option<Alignment> {
    let from_css = css_declarations(element)
        .into_iter()
        .find(|(key, _)| key == "text-align")
        .and_then(|(_, value)| Alignment::from_css_keyword(&value));
    let from_class = || {
        element
            .value()
            .classes()
            .find_map(|class| class.strip_prefix("ql-align-"))
            .and_then(Alignment::from_css_keyword)
    };
    let from_attr = || {
        element
            .value()
            .attr("align")
            .and_then(Alignment::from_css_keyword)
    };
    from_css.or_else(from_class).or_else(from_attr)
}

fn block_indent(element: ElementRef<'_>) -> Option<u8> {
    element
        .value()
        .classes()
        .find_map(|class| class.strip_prefix("ql-indent-"))
        .and_then(|level| level.parse::<u8>().ok())
        .map(|level| level.min(MAX_INDENT))
}

/// Keep a colour only if it is one the writer can draw.
fn css_color(value: &str) -> Option<String> {
    parse_css_color(value).map(|_| value.trim().to_ascii_lowercase())
}

fn checked_color(value: &str) -> Result<String> {
    css_color(value).ok_or_else(|| VpdfError::InvalidCommand(format!("not a colour: {value:?}")))
}

fn inline_context(element: ElementRef<'_>, ctx: &Context) -> Context {
    let mut inner = ctx.clone();
    let style = &mut inner.style;
    match element.value().name() {
        "b" | "strong" => style.bold = true,
        "i" | "em" => style.italic = true,
        "u" => style.underline = true,
        "s" | "strike" | "del" => style.strike = true,
        "font" => {
            if let Some(size) = element
                .value()
                .attr("size")
                .and_then(|v| v.trim().parse::<u8>().ok())
            {
                style.font_size = Some(size.clamp(1, 7));
            }
            if let Some(face) = element.value().attr("face").map(str::trim) {
                if !face.is_empty() {
                    style.font_name = Some(face.to_string());
                }
            }
            if let Some(color) = element.value().attr("color").and_then(css_color) {
                style.color = Some(color);
            }
        }
        "a" => {
            if let Some(href) = element.value().attr("href").map(str::trim) {
                if !href.is_empty() {
                    style.link = Some(href.to_string());
                }
            }
        }
        _ => {}
    }
    for class in element.value().classes() {
        if let Some(size) = class.strip_prefix("ql-size-") {
            style.font_size = match size {
                "small" => Some(2),
                "large" => Some(5),
                "huge" => Some(6),
                _ => style.font_size,
            };
        } else if let Some(font) = class.strip_prefix("ql-font-") {
            if !font.is_empty() {
                style.font_name = Some(font.to_string());
            }
        } else if let Some(color) = class.strip_prefix("ql-color-").and_then(css_color) {
            style.color = Some(color);
        } else if let Some(color) = class.strip_prefix("ql-bg-").and_then(css_color) {
            style.background = Some(color);
        }
    }
    for (key, value) in css_declarations(element) {
        match key.as_str() {
            "font-weight" => {
                style.bold = matches!(value.as_str(), "bold" | "bolder")
                    || value.parse::<u16>().is_ok_and(|weight| weight >= 600);
            }
            "font-style" => style.italic = value == "italic" || value == "oblique",
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    style.underline = true;
                }
                if value.contains("line-through") {
                    style.strike = true;
                }
            }
            "font-family" => {
                let family = value
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim_matches(['"', '\'', ' ']);
                if !family.is_empty() {
                    style.font_name = Some(family.to_string());
                }
            }
            "color" => {
                if let Some(color) = css_color(&value) {
                    style.color = Some(color);
                }
            }
            "background-color" | "background" => {
                if let Some(color) = css_color(&value) {
                    style.background = Some(color);
                }
            }
            _ => {}
        }
    }
    inner
}

#[cfg(test)]
mod tests {
    use crate::normalize::{finalize, text_to_html};

    use super::*;

    fn model(html: &str) -> ContentModel {
        ContentModel::from_html(html)
    }

    #[test]
    fn plain_projection_round_trips() {
        for text in ["line1\nline2", "a\n", "\n", "", "   ", "x & <y>\n\n'z'"] {
            let markup = text_to_html(text);
            let m = model(&markup);
            assert_eq!(m.plain_text(), text, "text {text:?}");
            assert_eq!(m.markup(), markup, "text {text:?}");
        }
    }

    #[test]
    fn bold_markup_is_kept_and_flattened_for_text() {
        let m = model("<b>hi</b>");
        assert_eq!(m.plain_text(), "hi");
        assert_eq!(m.markup(), "<p><strong>hi</strong></p>");
        assert!(!m.is_plain());
    }

    #[test]
    fn block_elements_become_blocks() {
        let m = model("<p>one</p>\n<h2>two</h2><ul><li>three</li><li>four</li></ul>");
        let kinds: Vec<_> = m.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Paragraph,
                BlockKind::Heading(2),
                BlockKind::ListItem(ListKind::Bullet),
                BlockKind::ListItem(ListKind::Bullet),
            ]
        );
        assert_eq!(m.plain_text(), "one\ntwo\nthree\nfour");
    }

    #[test]
    fn empty_paragraph_is_one_empty_line() {
        let m = model("<p>a</p><p><br></p><p>b</p>");
        assert_eq!(m.plain_text(), "a\n\nb");
        let again = model(&m.markup());
        assert_eq!(again.plain_text(), "a\n\nb");
    }

    #[test]
    fn trailing_break_inside_block_adds_no_line() {
        let m = model("<p>a<br></p>");
        assert_eq!(m.blocks().len(), 1);
    }

    #[test]
    fn quill_alignment_class_is_read() {
        let m = model("<p class=\"ql-align-center\">c</p><p style=\"text-align: right\">r</p>");
        assert_eq!(m.blocks()[0].align, Alignment::Center);
        assert_eq!(m.blocks()[1].align, Alignment::Right);
    }

    #[test]
    fn formatted_markup_reparses_to_the_same_blocks() {
        let mut m = model("alpha beta\ngamma");
        m.apply_format(&FormatCommand::Bold, 0..5).unwrap();
        m.apply_format(&FormatCommand::Align(Alignment::Center), 11..11).unwrap();
        m.apply_format(&FormatCommand::FontSize(5), 6..10).unwrap();
        let again = model(&m.markup());
        assert_eq!(again.blocks(), m.blocks());
    }

    #[test]
    fn bold_toggles_when_whole_selection_is_bold() {
        let mut m = model("hello world");
        m.apply_format(&FormatCommand::Bold, 0..5).unwrap();
        assert_eq!(m.markup(), "<p><strong>hello</strong> world</p>");
        m.apply_format(&FormatCommand::Bold, 0..5).unwrap();
        assert_eq!(m.markup(), "hello world");
        assert!(m.is_plain());
    }

    #[test]
    fn partially_bold_selection_becomes_all_bold() {
        let mut m = model("<b>he</b>llo");
        m.apply_format(&FormatCommand::Bold, 0..5).unwrap();
        assert_eq!(m.markup(), "<p><strong>hello</strong></p>");
    }

    #[test]
    fn inline_format_spans_blocks() {
        let mut m = model("ab\ncd");
        m.apply_format(&FormatCommand::Italic, 1..4).unwrap();
        assert_eq!(m.markup(), "<p>a<em>b</em></p><p><em>c</em>d</p>");
    }

    #[test]
    fn list_toggle_on_and_off() {
        let mut m = model("one\ntwo\nthree");
        m.apply_format(&FormatCommand::ToggleList(ListKind::Ordered), 0..5).unwrap();
        assert_eq!(m.markup(), "<ol><li>one</li><li>two</li></ol><p>three</p>");
        m.apply_format(&FormatCommand::ToggleList(ListKind::Ordered), 0..5).unwrap();
        assert!(m.is_plain());
    }

    #[test]
    fn heading_and_clear() {
        let mut m = model("title\nbody");
        m.apply_format(&FormatCommand::Heading(Some(1)), 2..2).unwrap();
        assert_eq!(m.blocks()[0].kind, BlockKind::Heading(1));
        assert_eq!(m.blocks()[1].kind, BlockKind::Paragraph);
        m.apply_format(&FormatCommand::ClearFormatting, 0..10).unwrap();
        assert!(m.is_plain());
    }

    #[test]
    fn image_is_inserted_at_caret() {
        let mut m = model("ab");
        m.apply_format(&FormatCommand::InsertImage("data:image/png;base64,AA==".into()), 1..1)
            .unwrap();
        assert_eq!(m.plain_text(), "ab");
        assert_eq!(m.markup(), "<p>a<img src=\"data:image/png;base64,AA==\">b</p>");
    }

    #[test]
    fn image_into_empty_document() {
        let mut m = ContentModel::default();
        m.apply_format(&FormatCommand::InsertImage("pic.png".into()), 0..0).unwrap();
        assert_eq!(m.blocks().len(), 1);
        assert!(!m.blocks()[0].is_empty());
    }

    #[test]
    fn invalid_commands_are_rejected() {
        let mut m = model("abc");
        assert!(matches!(
            m.apply_format(&FormatCommand::FontSize(9), 0..1),
            Err(VpdfError::InvalidCommand(_))
        ));
        assert!(m.apply_format(&FormatCommand::Heading(Some(7)), 0..1).is_err());
        assert!(m.apply_format(&FormatCommand::Bold, 0..10).is_err());
        assert!(m.apply_format(&FormatCommand::FontName("  ".into()), 0..1).is_err());
        assert!(m.apply_format(&FormatCommand::InsertImage(String::new()), 0..0).is_err());
        assert!(m.apply_format(&FormatCommand::InsertVideo(" ".into()), 0..0).is_err());
        assert!(m.apply_format(&FormatCommand::Color("blurple".into()), 0..1).is_err());
        assert!(m.apply_format(&FormatCommand::Background("#12".into()), 0..1).is_err());
        assert!(m.apply_format(&FormatCommand::Link(Some("  ".into())), 0..1).is_err());
        assert!(m.apply_format(&FormatCommand::Indent(9), 0..1).is_err());
        assert_eq!(m.markup(), "abc");
    }

    #[test]
    fn inline_styles_from_css() {
        let m = model(
            "<span style=\"font-weight: 700; font-style: italic; \
             text-decoration: underline line-through\">x</span>",
        );
        let Inline::Text { style, .. } = &m.blocks()[0].runs[0] else {
            panic!("expected text run");
        };
        assert!(style.bold && style.italic && style.underline && style.strike);
    }

    #[test]
    fn scripts_are_dropped() {
        let m = model("a<script>alert(1)</script>b");
        assert_eq!(m.plain_text(), "ab");
    }

    fn finalized(html: &str) -> bool {
        let m = model(html);
        finalize(&m.markup(), &m.plain_text()).is_rich()
    }

    fn first_style(m: &ContentModel) -> &RunStyle {
        let Inline::Text { style, .. } = &m.blocks()[0].runs[0] else {
            panic!("expected text run");
        };
        style
    }

    #[test]
    fn coloured_text_stays_rich() {
        for html in [
            "<p><span style=\"color: rgb(230, 0, 0);\">hi</span></p>",
            "<p><span style=\"background-color: yellow;\">hi</span></p>",
            "<font color=\"#ff0000\">hi</font>",
            "<p><span class=\"ql-color-red\">hi</span></p>",
        ] {
            assert!(finalized(html), "markup {html:?}");
        }
        let m = model("<span style=\"color: RGB(230, 0, 0); background: Yellow\">hi</span>");
        assert_eq!(first_style(&m).color.as_deref(), Some("rgb(230, 0, 0)"));
        assert_eq!(first_style(&m).background.as_deref(), Some("yellow"));
        assert_eq!(
            m.markup(),
            "<p><span style=\"color: rgb(230, 0, 0); background-color: yellow;\">hi</span></p>"
        );
    }

    #[test]
    fn unknown_colours_are_ignored() {
        let m = model("<span style=\"color: inherit; background-color: transparent\">hi</span>");
        assert!(m.is_plain());
    }

    #[test]
    fn quill_size_font_indent_and_link_stay_rich() {
        for html in [
            "<p><span class=\"ql-size-huge\">hi</span></p>",
            "<p><span class=\"ql-font-monospace\">hi</span></p>",
            "<p><a href=\"https://example.com\">hi</a></p>",
            "<p class=\"ql-indent-2\">hi</p>",
            "<iframe class=\"ql-video\" src=\"https://example.com/v\"></iframe>",
        ] {
            assert!(finalized(html), "markup {html:?}");
        }
        let small = RunStyle {
            font_size: Some(2),
            ..RunStyle::default()
        };
        let m = model("<span class=\"ql-size-small\">a</span>");
        assert_eq!(m.blocks()[0].runs, vec![Inline::text("a", small)]);
        let m = model("<p><span class=\"ql-size-large ql-font-serif\">hi</span></p>");
        assert_eq!(first_style(&m).font_size, Some(5));
        assert_eq!(first_style(&m).font_name.as_deref(), Some("serif"));
        let m = model("<p><a href=\"https://example.com\">hi</a></p>");
        assert_eq!(first_style(&m).link.as_deref(), Some("https://example.com"));
        assert_eq!(model("<p class=\"ql-indent-12\">hi</p>").blocks()[0].indent, 8);
    }

    #[test]
    fn video_is_an_embed_without_text() {
        let m = model("<p>a</p><iframe class=\"ql-video\" frameborder=\"0\" \
             allowfullscreen=\"true\" src=\"https://example.com/v\"></iframe>");
        assert_eq!(m.plain_text(), "a\n");
        assert_eq!(
            m.blocks()[1].runs,
            vec![Inline::Video {
                src: "https://example.com/v".into(),
                width: None,
                height: None,
            }]
        );
        assert!(m.markup().ends_with(
            "<p><iframe class=\"ql-video\" frameborder=\"0\" allowfullscreen=\"true\" \
             src=\"https://example.com/v\"></iframe></p>"
        ));
    }

    #[test]
    fn colour_link_indent_and_video_commands_reparse() {
        let mut m = model("alpha beta\ngamma");
        m.apply_format(&FormatCommand::Color("#E60000".into()), 0..5).unwrap();
        m.apply_format(&FormatCommand::Background("yellow".into()), 3..8).unwrap();
        m.apply_format(&FormatCommand::Link(Some("https://example.com/?a=1&b=2".into())), 6..10)
            .unwrap();
        m.apply_format(&FormatCommand::Indent(3), 12..12).unwrap();
        m.apply_format(&FormatCommand::InsertVideo("https://example.com/v".into()), 11..11)
            .unwrap();
        assert_eq!(first_style(&m).color.as_deref(), Some("#e60000"));
        assert_eq!(m.blocks()[1].indent, 3);
        let again = model(&m.markup());
        assert_eq!(again.blocks(), m.blocks());

        m.apply_format(&FormatCommand::Link(None), 0..16).unwrap();
        m.apply_format(&FormatCommand::ClearFormatting, 0..16).unwrap();
        assert_eq!(m.blocks()[1].indent, 0);
        assert!(!m.markup().contains("href"));
        assert!(!m.markup().contains("color"));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut m = model("abc");
        let snapshot = m.snapshot();
        m.set_content("<b>changed</b>").unwrap();
        assert_eq!(snapshot.plain_text(), "abc");
        assert_eq!(m.plain_text(), "changed");
    }

    #[test]
    fn non_positive_window_has_no_tree() {
        let m = model("abc");
        assert!(m.render_tree(0.0).is_none());
        assert!(m.render_tree(650.0).is_some());
    }
}
