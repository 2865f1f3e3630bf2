// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image sources embedded in content — `data:` URIs decoded in memory.
// Remote sources are never fetched.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use tracing::{debug, instrument};
use vpdf_core::error::{Result, VpdfError};

/// Size used for images whose pixels are unavailable (CSS replaced-element default).
pub const FALLBACK_SIZE: (u32, u32) = (300, 150);

/// Whether `src` carries its own bytes.
pub fn is_data_uri(src: &str) -> bool {
    src.trim_start().starts_with("data:")
}

/// Decode a base64 `data:` URI into an image.
#[instrument(skip(src), fields(src_len = src.len()))]
pub fn decode_data_uri(src: &str) -> Result<DynamicImage> {
    let body = src
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| VpdfError::RenderWrite("image source is not a data URI".into()))?;
    let (meta, payload) = body
        .split_once(',')
        .ok_or_else(|| VpdfError::RenderWrite("malformed data URI".into()))?;
    if !meta.ends_with(";base64") {
        return Err(VpdfError::RenderWrite(format!(
            "unsupported data URI encoding: {meta}"
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| VpdfError::RenderWrite(format!("invalid base64 image data: {err}")))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|err| VpdfError::RenderWrite(format!("failed to decode image: {err}")))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from data URI");
    Ok(img)
}

/// Pixel size of `src`, if it can be learned without a network fetch.
pub fn intrinsic_size(src: &str) -> Option<(u32, u32)> {
    if !is_data_uri(src) {
        return None;
    }
    decode_data_uri(src)
        .ok()
        .map(|img| (img.width(), img.height()))
        .filter(|&(w, h)| w > 0 && h > 0)
}

/// Build a PNG data URI, used by tests and the bench to embed generated images.
pub fn png_data_uri(img: &DynamicImage) -> Result<String> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|err| VpdfError::RenderWrite(format!("failed to encode PNG: {err}")))?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(bytes.into_inner())
    ))
}
