// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text/HTML normalizer — reconciles plain text and editor HTML into one
// canonical content value.
//
// Canonical content is stored verbatim together with its provenance. Plain
// text is only ever escaped on its way to the rendering surface, so feeding
// canonical plain text back through `normalize` is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Anything that looks like an angle-bracket tag.
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Every flavour of line break a text file or textarea may produce.
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

/// Line-break marker produced by the plain-text projection.
pub const LINE_BREAK_MARKER: &str = "<br>";

/// Where the canonical string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Unformatted text; escaped on projection.
    #[default]
    PlainText,
    /// Markup produced by the trusted rich-text surface.
    RichHtml,
}

/// The single authoritative representation of the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalContent {
    text: String,
    provenance: Provenance,
}

impl CanonicalContent {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plain text, regardless of what it looks like.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::PlainText,
        }
    }

    pub fn rich(html: impl Into<String>) -> Self {
        Self {
            text: html.into(),
            provenance: Provenance::RichHtml,
        }
    }

    /// The stored string (plain text or rich HTML, see [`provenance`](Self::provenance)).
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_rich(&self) -> bool {
        self.provenance == Provenance::RichHtml
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Nothing but whitespace; such content neither unlocks nor converts.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Markup to hand to the rendering surface.
    pub fn markup(&self) -> String {
        match self.provenance {
            Provenance::RichHtml => self.text.clone(),
            Provenance::PlainText => text_to_html(&self.text),
        }
    }
}

/// Whether `raw` contains at least one angle-bracket tag.
pub fn looks_like_html(raw: &str) -> bool {
    TAG_PATTERN.is_match(raw)
}

/// Escape the five HTML-significant characters. `&` goes first so entities
/// introduced by the later substitutions are not escaped twice.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Plain-text projection: escape, then turn every line break into a marker.
pub fn text_to_html(text: &str) -> String {
    LINE_BREAK
        .replace_all(&escape_html(text), LINE_BREAK_MARKER)
        .into_owned()
}

/// Classify `raw` and wrap it as canonical content.
pub fn normalize(raw: &str) -> CanonicalContent {
    if looks_like_html(raw) {
        CanonicalContent::rich(raw)
    } else {
        CanonicalContent::plain(raw)
    }
}

/// True when `markup` carries anything beyond escaped text and line breaks.
pub fn has_formatting(markup: &str, text: &str) -> bool {
    markup != text_to_html(text)
}

/// Settle the editor's state into canonical content: keep the markup only if
/// the user actually formatted something, otherwise keep the bare text.
pub fn finalize(markup: &str, text: &str) -> CanonicalContent {
    if has_formatting(markup, text) {
        CanonicalContent::rich(markup)
    } else {
        CanonicalContent::plain(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ampersand_is_escaped_first() {
        assert_eq!(escape_html("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
        assert_eq!(escape_html("\"q\""), "&quot;q&quot;");
    }

    #[test]
    fn every_line_break_flavour_becomes_a_marker() {
        assert_eq!(text_to_html("a\r\nb\rc\nd"), "a<br>b<br>c<br>d");
        assert_eq!(text_to_html(""), "");
    }

    #[test]
    fn detection_requires_a_closed_tag() {
        assert!(looks_like_html("<b>hi</b>"));
        assert!(looks_like_html("x <br> y"));
        assert!(!looks_like_html("1 < 2"));
        assert!(!looks_like_html("a &amp; b"));
        assert!(!looks_like_html("<>"));
    }

    #[test]
    fn normalize_is_idempotent_on_plain_text() {
        for raw in ["a & b", "it's \"quoted\"", "a &amp; b", "line1\nline2", ""] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "input {raw:?}");
            assert_eq!(once.provenance(), Provenance::PlainText);
        }
    }

    #[test]
    fn unformatted_text_round_trips_to_itself() {
        let text = "first line\nsecond & \"third\"";
        let markup = text_to_html(text);
        let content = finalize(&markup, text);
        assert_eq!(content.as_str(), text);
        assert!(!content.is_rich());
    }

    #[test]
    fn bold_markup_is_formatting() {
        assert!(has_formatting("<b>hi</b>", "hi"));
        let content = finalize("<b>hi</b>", "hi");
        assert!(content.is_rich());
        assert_eq!(content.as_str(), "<b>hi</b>");
    }

    #[test]
    fn line_breaks_alone_are_not_formatting() {
        assert!(!has_formatting("<br><br>", "\n\n"));
        let content = finalize("  <br>", "  \n");
        assert!(content.is_blank());
        assert!(!content.is_rich());
    }

    #[test]
    fn empty_input_is_empty_plain_content() {
        let content = normalize("");
        assert!(content.is_empty());
        assert!(!content.is_rich());
        assert!(!has_formatting("", ""));
    }

    #[test]
    fn plain_markup_is_escaped_projection() {
        let content = CanonicalContent::plain("line1\nline2 <tag>");
        assert_eq!(content.markup(), "line1<br>line2 &lt;tag&gt;");
        let rich = CanonicalContent::rich("<i>x</i>");
        assert_eq!(rich.markup(), "<i>x</i>");
    }
}
