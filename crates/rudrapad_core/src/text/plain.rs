//! Markup stripping and text statistics.
//!
//! # Invariants
//! - Extraction never fails; unknown entities are kept verbatim.
//! - Block-level closing tags and `<br>` become line breaks.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const PREVIEW_MAX_CHARS: usize = 40;
const UNTITLED_LABEL: &str = "Untitled";
const EMPTY_PREVIEW_LABEL: &str = "No content";

static BLOCK_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|blockquote|pre|tr)\s*>")
        .expect("valid block break regex")
});
static SKIPPED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("valid skipped block regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Word and character counts of a note's plain text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub words: usize,
    pub characters: usize,
}

impl TextStats {
    pub fn of_markup(markup: &str) -> Self {
        let text = plain_text(markup);
        Self {
            words: word_count(&text),
            characters: char_count(&text),
        }
    }
}

/// Extracts plain text from editor markup.
pub fn plain_text(markup: &str) -> String {
    if !markup.contains('<') && !markup.contains('&') {
        return markup.to_string();
    }

    let without_scripts = SKIPPED_BLOCK_RE.replace_all(markup, "");
    let with_breaks = BLOCK_BREAK_RE.replace_all(&without_scripts, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, "");
    let decoded = ENTITY_RE.replace_all(&without_tags, |caps: &Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    decoded.trim_end_matches('\n').to_string()
}

/// Counts whitespace-separated words. Blank text has zero words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Counts Unicode scalar values.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Single-line list preview of note content.
pub fn content_preview(markup: &str) -> String {
    let text = plain_text(markup);
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    if collapsed.is_empty() {
        return EMPTY_PREVIEW_LABEL.to_string();
    }
    collapsed.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Display label for a possibly blank title.
pub fn title_label(title: &str) -> &str {
    if title.trim().is_empty() {
        UNTITLED_LABEL
    } else {
        title
    }
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match body {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        _ => return None,
    };
    Some(decoded.to_string())
}
