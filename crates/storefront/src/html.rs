//! Helpers for HTML fragments returned by the content and commerce APIs.
//!
//! Product descriptions and post bodies arrive as rendered HTML. They are
//! shown as markup after [`sanitize`]; titles and excerpts are reduced to
//! plain text and escaped by the templates like any other string.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Default excerpt length in characters.
pub const EXCERPT_CHARS: usize = 150;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+(>|$)").expect("Invalid regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("Invalid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Elements removed together with their content.
static DANGEROUS_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<iframe\b.*?</iframe\s*>|<object\b.*?</object\s*>",
    )
    .expect("Invalid regex")
});

/// Unclosed or self-closing dangerous tags.
static DANGEROUS_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(script|style|iframe|object|embed|form|meta|link|base)\b[^>]*>")
        .expect("Invalid regex")
});

/// Inline event handler attributes (`onclick="..."`, `onerror='...'`, `onload=x`).
static EVENT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("Invalid regex")
});

/// `javascript:` URLs in `href`/`src`.
static JS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href|src)\s*=\s*("\s*javascript:[^"]*"|'\s*javascript:[^']*')"#)
        .expect("Invalid regex")
});

/// Remove every tag and decode entities, collapsing whitespace.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Plain-text excerpt of at most `max_chars` characters, with `...` appended
/// when the text was cut.
#[must_use]
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = strip_tags(html);
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Decode numeric and common named HTML entities.
///
/// Unknown named entities are left as they are.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "zwnj" => '\u{200c}',
        _ => return None,
    };
    Some(c)
}

/// Remove scripts, embedded frames, event handlers and `javascript:` URLs
/// from API-provided markup.
#[must_use]
pub fn sanitize(html: &str) -> String {
    let html = DANGEROUS_BLOCK_RE.replace_all(html, "");
    let html = DANGEROUS_TAG_RE.replace_all(&html, "");
    let html = EVENT_ATTR_RE.replace_all(&html, "");
    JS_URL_RE.replace_all(&html, "$1=\"#\"").into_owned()
}
