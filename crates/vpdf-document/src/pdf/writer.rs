// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — serialise paginated slices into a PDF using `printpdf` 0.8.
//
// Each page is a `PdfPage` with a flat `Vec<Op>`: one text section per
// styled run, and one XObject per embedded image. Embedded players cannot
// be drawn, so their URL is printed in their place. Slices arrive in points
// relative to the content area's top-left; PDF space starts bottom-left.

use printpdf::{
    BuiltinFont, Color, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
    RawImage, RawImageData, RawImageFormat, Rgb, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};
use vpdf_bridge::PageWriter;
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::render::{FontSpec, NodePayload, Page, Slice, TextRun};
use vpdf_core::types::{PageGeometry, PaperSize};

use super::reader::PdfReader;
use crate::image_source::{decode_data_uri, is_data_uri};

/// Baseline position within a line box, as a fraction of the box height.
const BASELINE_RATIO: f32 = 0.75;

/// Point size of the caption printed for embedded media.
const EMBED_CAPTION_PT: f32 = 10.0;

/// Writes pages with the built-in PDF base fonts.
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn page_dimensions(paper: PaperSize) -> (Mm, Mm) {
        let (w_mm, h_mm) = paper.dimensions_mm();
        (Mm(w_mm), Mm(h_mm))
    }

    fn page_ops(
        &self,
        doc: &mut PdfDocument,
        page: &Page,
        geometry: &PageGeometry,
        page_h_pt: f32,
    ) -> Result<Vec<Op>> {
        let mut ops = Vec::new();
        for slice in &page.slices {
            match &slice.payload {
                NodePayload::Text { runs } => {
                    for run in runs {
                        text_ops(&mut ops, run, slice, page.scale, geometry, page_h_pt);
                    }
                }
                NodePayload::Image {
                    src,
                    pixel_width,
                    pixel_height,
                } => {
                    if !is_data_uri(src) {
                        warn!(page = page.number, "Skipping image without embedded data");
                        continue;
                    }
                    let img = decode_data_uri(src)?;
                    let (width, height) = (img.width(), img.height());
                    if (width, height) != (*pixel_width, *pixel_height) {
                        debug!(width, height, "Image size differs from layout size");
                    }
                    let raw = RawImage {
                        pixels: RawImageData::U8(img.to_rgb8().into_raw()),
                        width: width as usize,
                        height: height as usize,
                        data_format: RawImageFormat::RGB8,
                        tag: Vec::new(),
                    };
                    let id = doc.add_image(&raw);

                    // At 72 dpi one pixel is one point before scaling.
                    let top = geometry.y_origin + slice.offset_y;
                    ops.push(Op::UseXobject {
                        id,
                        transform: XObjectTransform {
                            translate_x: Some(Pt(geometry.x_origin + slice.x)),
                            translate_y: Some(Pt(page_h_pt - top - slice.height)),
                            scale_x: Some(slice.width / width.max(1) as f32),
                            scale_y: Some(slice.height / height.max(1) as f32),
                            dpi: Some(72.0),
                            rotate: None,
                        },
                    });
                }
                NodePayload::Embed { src } => {
                    debug!(page = page.number, "Printing embed as its URL");
                    embed_ops(&mut ops, src, slice, geometry, page_h_pt);
                }
                NodePayload::None => {}
            }
        }
        Ok(ops)
    }
}

/// Pick the base-14 font closest to the run's family and weight.
fn builtin_font(font: &FontSpec) -> BuiltinFont {
    let family = font
        .family
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let serif = family.contains("times") || family.contains("georgia") || family == "serif";
    let mono = family.contains("courier") || family.contains("mono");
    match (serif, mono, font.bold, font.italic) {
        (_, true, true, true) => BuiltinFont::CourierBoldOblique,
        (_, true, true, false) => BuiltinFont::CourierBold,
        (_, true, false, true) => BuiltinFont::CourierOblique,
        (_, true, false, false) => BuiltinFont::Courier,
        (true, _, true, true) => BuiltinFont::TimesBoldItalic,
        (true, _, true, false) => BuiltinFont::TimesBold,
        (true, _, false, true) => BuiltinFont::TimesItalic,
        (true, _, false, false) => BuiltinFont::TimesRoman,
        (false, false, true, true) => BuiltinFont::HelveticaBoldOblique,
        (false, false, true, false) => BuiltinFont::HelveticaBold,
        (false, false, false, true) => BuiltinFont::HelveticaOblique,
        (false, false, false, false) => BuiltinFont::Helvetica,
    }
}

fn fill_color(rgb: Option<[u8; 3]>) -> Op {
    let [r, g, b] = rgb.unwrap_or([0, 0, 0]);
    Op::SetFillColor {
        col: Color::Rgb(Rgb {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            icc_profile: None,
        }),
    }
}

fn text_ops(
    ops: &mut Vec<Op>,
    run: &TextRun,
    slice: &Slice,
    scale: f32,
    geometry: &PageGeometry,
    page_h_pt: f32,
) {
    let text = run.text.trim_end();
    if text.is_empty() {
        return;
    }
    let font = builtin_font(&run.font);
    let size = run.font.size_px * scale;
    let line_height = slice.source_height * scale;
    let baseline = geometry.y_origin + slice.offset_y + line_height * BASELINE_RATIO;

    ops.push(Op::StartTextSection);
    ops.push(fill_color(run.font.color));
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(geometry.x_origin + slice.x + run.x * scale),
            y: Pt(page_h_pt - baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn embed_ops(
    ops: &mut Vec<Op>,
    src: &str,
    slice: &Slice,
    geometry: &PageGeometry,
    page_h_pt: f32,
) {
    let baseline = geometry.y_origin + slice.offset_y + EMBED_CAPTION_PT;
    let font = BuiltinFont::Helvetica;
    ops.push(Op::StartTextSection);
    ops.push(fill_color(None));
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(geometry.x_origin + slice.x),
            y: Pt(page_h_pt - baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(EMBED_CAPTION_PT),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(format!("Video: {src}"))],
        font,
    });
    ops.push(Op::EndTextSection);
}

impl PageWriter for PdfWriter {
    #[instrument(skip(self, pages, geometry), fields(pages = pages.len()))]
    fn write(&self, pages: &[Page], geometry: &PageGeometry) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(VpdfError::RenderWrite("no pages to write".into()));
        }
        let (page_w, page_h) = Self::page_dimensions(geometry.paper);
        let page_h_pt = page_h.into_pt().0;
        info!(paper = ?geometry.paper, title = %self.title, "Writing PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pdf_pages = Vec::with_capacity(pages.len());
        for page in pages {
            let ops = self.page_ops(&mut doc, page, geometry, page_h_pt)?;
            debug!(page = page.number, ops = ops.len(), "Page composed");
            pdf_pages.push(PdfPage::new(page_w, page_h, ops));
        }
        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        // Confirm every page made it into the file.
        let written = PdfReader::from_bytes(&output)?.page_count();
        if written != pages.len() {
            return Err(VpdfError::RenderWrite(format!(
                "expected {} pages, PDF has {written}",
                pages.len()
            )));
        }
        info!(bytes = output.len(), pages = written, "PDF written");
        Ok(output)
    }
}
