// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format ingestor — turns an uploaded file into plain text.
//
// The extension allow-list is checked before a single byte is read, and the
// binary extractor runs on the blocking pool under an optional deadline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};
use vpdf_bridge::TextExtractor;
use vpdf_core::error::{Result, VpdfError};
use vpdf_core::types::SourceFormat;

use crate::docx::DocxExtractor;

/// Where an upload's bytes come from.
#[derive(Debug, Clone)]
enum SourceData {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file chosen by the user.
#[derive(Debug, Clone)]
pub struct UploadedSource {
    name: String,
    data: SourceData,
}

impl UploadedSource {
    /// A file on disk; the name is its final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            data: SourceData::Path(path),
        }
    }

    /// An in-memory upload.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: SourceData::Bytes(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allow-listed format, or `UnsupportedFormat`.
    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_file_name(&self.name)
            .ok_or_else(|| VpdfError::UnsupportedFormat(self.name.clone()))
    }

    async fn read(&self) -> Result<Vec<u8>> {
        match &self.data {
            SourceData::Bytes(bytes) => Ok(bytes.clone()),
            SourceData::Path(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

/// Text pulled out of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedText {
    pub text: String,
    pub format: SourceFormat,
}

/// Reads uploads on the allow-list.
#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn TextExtractor>,
    timeout: Option<Duration>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(Arc::new(DocxExtractor::new()), None)
    }
}

impl Ingestor {
    pub fn new(extractor: Arc<dyn TextExtractor>, timeout: Option<Duration>) -> Self {
        Self { extractor, timeout }
    }

    /// Ingest an upload. Fails without reading when the format is not allowed.
    #[instrument(skip(self, source), fields(name = %source.name()))]
    pub async fn ingest(&self, source: &UploadedSource) -> Result<IngestedText> {
        let format = source.format()?;
        let bytes = source.read().await?;
        let text = if format.is_binary() {
            self.extract(bytes).await?
        } else {
            decode_utf8(bytes)?
        };
        info!(?format, chars = text.chars().count(), "Upload ingested");
        Ok(IngestedText { text, format })
    }

    async fn extract(&self, bytes: Vec<u8>) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes));
        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(?limit, "Extraction timed out");
                    return Err(VpdfError::Extraction(format!(
                        "timed out after {}s",
                        limit.as_secs_f32()
                    )));
                }
            },
            None => task.await,
        };
        joined.map_err(|err| VpdfError::Extraction(format!("extractor task failed: {err}")))?
    }
}

/// UTF-8 text, optionally prefixed by a byte-order mark.
fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    let mut text = String::from_utf8(bytes).map_err(|err| {
        VpdfError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::tests::docx_with_body;

    struct SlowExtractor;

    impl TextExtractor for SlowExtractor {
        fn extract(&self, _bytes: &[u8]) -> Result<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn text_file_is_read_verbatim() {
        let source = UploadedSource::from_bytes("notes.txt", b"line1\nline2".to_vec());
        let ingested = Ingestor::default().ingest(&source).await.unwrap();
        assert_eq!(ingested.text, "line1\nline2");
        assert_eq!(ingested.format, SourceFormat::PlainText);
    }

    #[tokio::test]
    async fn markdown_is_plain_text() {
        let source = UploadedSource::from_bytes("README.md", b"# Title\n*x*".to_vec());
        let ingested = Ingestor::default().ingest(&source).await.unwrap();
        assert_eq!(ingested.text, "# Title\n*x*");
    }

    #[tokio::test]
    async fn rejected_before_reading() {
        // The path does not exist: an Io error here would mean it was read.
        let source = UploadedSource::from_path("/nonexistent/image.png");
        let err = Ingestor::default().ingest(&source).await.unwrap_err();
        assert!(matches!(err, VpdfError::UnsupportedFormat(ref name) if name == "image.png"));
    }

    #[tokio::test]
    async fn invalid_utf8_is_invalid_data() {
        let source = UploadedSource::from_bytes("bad.txt", vec![0xff, 0xfe, 0x00]);
        let err = Ingestor::default().ingest(&source).await.unwrap_err();
        match err {
            VpdfError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn byte_order_mark_is_dropped() {
        let mut bytes = "\u{feff}hi".as_bytes().to_vec();
        bytes.extend_from_slice(b"!");
        let source = UploadedSource::from_bytes("bom.txt", bytes);
        assert_eq!(Ingestor::default().ingest(&source).await.unwrap().text, "hi!");
    }

    #[tokio::test]
    async fn docx_goes_through_the_extractor() {
        let bytes = docx_with_body("<w:p><w:r><w:t>Report</w:t></w:r></w:p>");
        let source = UploadedSource::from_bytes("report.DOCX", bytes);
        let ingested = Ingestor::default().ingest(&source).await.unwrap();
        assert_eq!(ingested.text, "Report\n\n");
        assert_eq!(ingested.format, SourceFormat::Docx);
    }

    #[tokio::test]
    async fn slow_extraction_times_out() {
        let ingestor = Ingestor::new(Arc::new(SlowExtractor), Some(Duration::from_millis(20)));
        let source = UploadedSource::from_bytes("slow.docx", Vec::new());
        let err = ingestor.ingest(&source).await.unwrap_err();
        assert!(matches!(err, VpdfError::Extraction(_)));
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.txt");
        std::fs::write(&path, "from disk").unwrap();
        let source = UploadedSource::from_path(path);
        let ingested = Ingestor::default().ingest(&source).await.unwrap();
        assert_eq!(ingested.text, "from disk");
    }
}
