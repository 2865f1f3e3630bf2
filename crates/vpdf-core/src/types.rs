// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for vpdf.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upload formats on the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// `.txt`
    PlainText,
    /// `.md`, read as plain text.
    Markdown,
    /// `.docx`, text pulled out by a binary-document extractor.
    Docx,
}

impl SourceFormat {
    /// Infer the format from a bare extension (no leading dot), case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "md" => Some(Self::Markdown),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Infer the format from the last extension segment of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether the bytes need a binary extractor rather than a UTF-8 read.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Docx)
    }
}

/// Notification severity, mirrored by the sink's presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// A user-visible status message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    /// How long the sink keeps the message on screen unless superseded.
    pub duration: Duration,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity, duration: Duration) -> Self {
        Self {
            message: message.into(),
            severity,
            duration,
            at: Utc::now(),
        }
    }
}

/// Lifecycle states of the conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionState {
    /// No content yet; convert is disabled.
    Idle,
    /// Content has been touched but is still blank.
    Editing,
    /// Content has been non-blank at least once; convert is enabled.
    Unlocked,
    /// A render/paginate/save attempt is in flight.
    Converting,
    /// The last attempt saved a file.
    Succeeded,
    /// The last attempt failed; see the job's error reason.
    Failed,
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
        }
    }

    /// Dimensions in PDF points (width, height), portrait.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w * 72.0 / 25.4, h * 72.0 / 25.4)
    }
}

/// How content that overflows a page is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoPaging {
    /// Page-sized, non-overlapping, order-preserving chunks.
    Slice,
}

/// Geometry handed to the page writer alongside the pages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub paper: PaperSize,
    /// Left margin in points.
    pub x_origin: f32,
    /// Top margin in points.
    pub y_origin: f32,
    /// Printable width in points.
    pub content_width: f32,
    /// Width of the rendering window in CSS pixels.
    pub window_width: f32,
    pub auto_paging: AutoPaging,
    /// Requested output scale (< 1.0 leaves room for layout rounding).
    pub scale: f32,
}

impl PageGeometry {
    /// Printable height in points (paper height minus top and bottom margin).
    pub fn content_height(&self) -> f32 {
        let (_, h) = self.paper.dimensions_pt();
        h - 2.0 * self.y_origin
    }
}

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// CSS `text-align` keyword.
    pub fn css_keyword(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }

    pub fn from_css_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

/// List flavour of a list item block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Bullet,
}

/// A formatting command applied to the content model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strike,
    /// HTML legacy font size, 1 through 7.
    FontSize(u8),
    FontName(String),
    /// Text colour as a CSS colour value.
    Color(String),
    /// Highlight colour as a CSS colour value.
    Background(String),
    /// `Some(href)` links the selection, `None` unlinks it.
    Link(Option<String>),
    Align(Alignment),
    /// Block indent level, 0 through 8.
    Indent(u8),
    ToggleList(ListKind),
    /// `Some(1..=6)` turns blocks into headings, `None` back into paragraphs.
    Heading(Option<u8>),
    InsertImage(String),
    /// Embedded video player (atomic, like an image).
    InsertVideo(String),
    ClearFormatting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert_eq!(SourceFormat::from_file_name("notes.TXT"), Some(SourceFormat::PlainText));
        assert_eq!(SourceFormat::from_file_name("README.md"), Some(SourceFormat::Markdown));
        assert_eq!(SourceFormat::from_file_name("report.Docx"), Some(SourceFormat::Docx));
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert_eq!(SourceFormat::from_file_name("image.png"), None);
        assert_eq!(SourceFormat::from_file_name("archive.docx.zip"), None);
        assert_eq!(SourceFormat::from_file_name("no_extension"), None);
    }

    #[test]
    fn a4_content_height_leaves_both_margins() {
        let geometry = PageGeometry {
            paper: PaperSize::A4,
            x_origin: 40.0,
            y_origin: 40.0,
            content_width: 515.0,
            window_width: 650.0,
            auto_paging: AutoPaging::Slice,
            scale: 0.8,
        };
        let (_, h) = PaperSize::A4.dimensions_pt();
        assert!((geometry.content_height() - (h - 80.0)).abs() < 0.01);
        assert!((h - 841.89).abs() < 0.1);
    }
}
