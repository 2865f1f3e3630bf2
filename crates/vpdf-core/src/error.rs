// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for vpdf.

use thiserror::Error;

/// Top-level error type for all vpdf operations.
#[derive(Debug, Error)]
pub enum VpdfError {
    // -- Ingestion errors --
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document extraction failed: {0}")]
    Extraction(String),

    // -- Rendering errors --
    #[error("rendering surface has no display tree")]
    RenderTargetMissing,

    #[error("PDF write failed: {0}")]
    RenderWrite(String),

    #[error("there is no content to convert")]
    EmptyContent,

    // -- Editing --
    #[error("invalid formatting command: {0}")]
    InvalidCommand(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VpdfError>;
