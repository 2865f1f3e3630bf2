// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX text extraction — raw text of `word/document.xml`, styling discarded.
//
// Output follows the usual raw-text convention for word processors: every
// paragraph is followed by a blank line, tabs and manual breaks are kept.

use std::io::{Cursor, Read};

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use tracing::{debug, instrument};
use vpdf_bridge::TextExtractor;
use vpdf_core::error::{Result, VpdfError};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts plain text from Office Open XML word-processing files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn extraction_error(context: &str, err: impl std::fmt::Display) -> VpdfError {
    VpdfError::Extraction(format!("{context}: {err}"))
}

fn read_document_part(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| extraction_error("not a DOCX archive", err))?;
    let mut entry = archive
        .by_name(DOCUMENT_PART)
        .map_err(|err| extraction_error("missing document body", err))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|err| extraction_error("unreadable document body", err))?;
    Ok(xml)
}

/// Walk the document XML and collect text runs.
fn document_text(xml: &str) -> Result<String> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_text {
                    let text = t
                        .unescape()
                        .map_err(|err| extraction_error("bad text escape", err))?;
                    out.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(extraction_error("malformed document XML", err)),
            _ => {}
        }
    }
    Ok(out)
}

impl TextExtractor for DocxExtractor {
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let xml = read_document_part(bytes)?;
        let text = document_text(&xml)?;
        debug!(chars = text.chars().count(), "DOCX text extracted");
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    /// Build a minimal DOCX whose body holds `body_xml`.
    pub(crate) fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
        );
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:p><w:r><w:t>World</w:t></w:r></w:p>",
        );
        let text = DocxExtractor::new().extract(&bytes).unwrap();
        assert_eq!(text, "Hello\n\nWorld\n\n");
    }

    #[test]
    fn tabs_breaks_and_spaces_are_kept() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t xml:space=\"preserve\">a </w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c &amp; d</w:t></w:r></w:p>",
        );
        let text = DocxExtractor::new().extract(&bytes).unwrap();
        assert_eq!(text, "a \tb\nc & d\n\n");
    }

    #[test]
    fn empty_paragraph_still_separates() {
        let bytes = docx_with_body("<w:p/><w:p><w:r><w:t>x</w:t></w:r></w:p>");
        assert_eq!(DocxExtractor::new().extract(&bytes).unwrap(), "\n\nx\n\n");
    }

    #[test]
    fn non_archive_is_an_extraction_error() {
        let err = DocxExtractor::new().extract(b"plain bytes").unwrap_err();
        assert!(matches!(err, VpdfError::Extraction(_)));
    }

    #[test]
    fn archive_without_body_is_an_extraction_error() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"nope").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        let err = DocxExtractor::new().extract(&bytes).unwrap_err();
        assert!(matches!(err, VpdfError::Extraction(_)));
    }
}
