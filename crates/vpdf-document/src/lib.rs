// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// vpdf-document — Content handling for vpdf.
//
// Normalizes text and editor HTML into canonical content, owns the rich-text
// content model and its layout, paginates the rendered tree, writes PDFs,
// and ingests .txt/.md/.docx uploads.

pub mod color;
pub mod compose;
pub mod docx;
pub mod image_source;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod output;
pub mod paginate;
pub mod pdf;

pub use compose::{PageSummary, RenderedDocument, compose, layout_pages};
pub use docx::DocxExtractor;
pub use ingest::{IngestedText, Ingestor, UploadedSource};
pub use layout::LayoutEngine;
pub use model::{Block, BlockKind, ContentModel, Inline, RunStyle};
pub use normalize::{CanonicalContent, Provenance, finalize, normalize};
pub use output::{SavedFile, save_atomic};
pub use paginate::paginate;
pub use pdf::{PdfReader, PdfWriter};
