// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VpdfError};
use crate::types::{AutoPaging, PageGeometry, PaperSize};

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output page format (always portrait).
    pub paper_size: PaperSize,
    /// Page margin on every side, in points.
    pub margin_pt: f32,
    /// Width of the rendering window the content is laid out at, in CSS px.
    pub window_width_px: f32,
    /// Output scale applied uniformly to both axes.
    pub raster_scale: f32,
    /// File name of the saved PDF.
    pub output_file_name: String,
    /// Title embedded in the PDF /Info dictionary.
    pub document_title: String,
    pub typography: Typography,
    pub pacing: NotificationPacing,
    /// Give up on binary-document extraction after this many seconds.
    pub extraction_timeout_secs: Option<u64>,
    /// Give up on render + write after this many seconds.
    pub render_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            margin_pt: 40.0,
            window_width_px: 650.0,
            raster_scale: 0.8,
            output_file_name: "vpdf-document.pdf".into(),
            document_title: "vpdf document".into(),
            typography: Typography::default(),
            pacing: NotificationPacing::default(),
            extraction_timeout_secs: Some(30),
            render_timeout_secs: Some(60),
        }
    }
}

impl AppConfig {
    /// Writer geometry derived from the paper size and margins.
    pub fn geometry(&self) -> PageGeometry {
        let (paper_w, _) = self.paper_size.dimensions_pt();
        PageGeometry {
            paper: self.paper_size,
            x_origin: self.margin_pt,
            y_origin: self.margin_pt,
            content_width: paper_w - 2.0 * self.margin_pt,
            window_width: self.window_width_px,
            auto_paging: AutoPaging::Slice,
            scale: self.raster_scale,
        }
    }

    /// Reject settings the paginator or writer cannot honour.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.paper_size.dimensions_pt();
        if !(self.margin_pt >= 0.0 && self.margin_pt * 2.0 < w.min(h)) {
            return Err(VpdfError::InvalidConfig(format!(
                "margin {}pt leaves no printable area",
                self.margin_pt
            )));
        }
        if !(self.window_width_px.is_finite() && self.window_width_px > 0.0) {
            return Err(VpdfError::InvalidConfig(format!(
                "window width must be positive, got {}",
                self.window_width_px
            )));
        }
        if !(self.raster_scale > 0.0 && self.raster_scale <= 1.0) {
            return Err(VpdfError::InvalidConfig(format!(
                "raster scale must be in (0, 1], got {}",
                self.raster_scale
            )));
        }
        if self.output_file_name.trim().is_empty() || self.output_file_name.contains(['/', '\\']) {
            return Err(VpdfError::InvalidConfig(format!(
                "output file name {:?} is not a plain file name",
                self.output_file_name
            )));
        }
        self.typography.validate()
    }

    /// Same settings with every notification delay removed.
    pub fn without_pacing(mut self) -> Self {
        self.pacing = NotificationPacing::immediate();
        self
    }
}

/// Text metrics used by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub base_font_px: f32,
    /// Line box height as a multiple of the font size.
    pub line_height: f32,
    /// Average glyph advance as a fraction of the font size.
    pub char_width_em: f32,
    pub bold_char_width_em: f32,
    pub list_indent_px: f32,
    /// Extra left indent per block indent level.
    pub indent_step_px: f32,
    /// Vertical gap inserted after every block.
    pub block_spacing_px: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            base_font_px: 16.0,
            line_height: 1.5,
            char_width_em: 0.5,
            bold_char_width_em: 0.55,
            list_indent_px: 24.0,
            indent_step_px: 48.0,
            block_spacing_px: 0.0,
        }
    }
}

impl Typography {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("base_font_px", self.base_font_px),
            ("line_height", self.line_height),
            ("char_width_em", self.char_width_em),
            ("bold_char_width_em", self.bold_char_width_em),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(VpdfError::InvalidConfig(format!(
                    "typography.{name} must be positive, got {value}"
                )));
            }
        }
        if self.list_indent_px < 0.0 || self.indent_step_px < 0.0 || self.block_spacing_px < 0.0 {
            return Err(VpdfError::InvalidConfig(
                "typography indents and spacing cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Durations of the timed status notifications, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPacing {
    /// Minimum time a notification stays up before the next one replaces it.
    pub min_visible_ms: u64,
    pub default_ms: u64,
    pub upload_notice_ms: u64,
    pub extracting_notice_ms: u64,
    pub ready_notice_ms: u64,
    /// Wait between the "ready" notification and the file save.
    pub download_delay_ms: u64,
    pub complete_notice_ms: u64,
}

impl Default for NotificationPacing {
    fn default() -> Self {
        Self {
            min_visible_ms: 1000,
            default_ms: 5000,
            upload_notice_ms: 3000,
            extracting_notice_ms: 4000,
            ready_notice_ms: 6000,
            download_delay_ms: 5000,
            complete_notice_ms: 3000,
        }
    }
}

impl NotificationPacing {
    /// No enforced delays; display durations are kept.
    pub fn immediate() -> Self {
        Self {
            min_visible_ms: 0,
            download_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn min_visible(&self) -> Duration {
        Duration::from_millis(self.min_visible_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}
