// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// vpdf — Core types, render tree, and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod render;
pub mod types;

pub use config::{AppConfig, NotificationPacing, Typography};
pub use error::VpdfError;
pub use render::{Page, RenderNode, RenderTree, Slice};
pub use types::*;
