//! Markup stripping for rich-text cells.
//!
//! Works on strings only: tags are removed with a regex and the handful of
//! entities a rich-text editor emits are decoded.

use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("html tag regex must compile"))
}

/// Remove all tags, decode common entities and trim the result.
pub fn strip_html(input: &str) -> String {
    let without_tags = tag_re().replace_all(input, "");
    decode_entities(&without_tags).trim().to_string()
}

/// Strip markup only when the text actually contains a tag.
pub fn plain_text(input: &str) -> String {
    if looks_like_html(input) {
        strip_html(input)
    } else {
        input.to_string()
    }
}

pub fn looks_like_html(input: &str) -> bool {
    input.contains('<') && tag_re().is_match(input)
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        // Last, so "&amp;lt;" decodes to "&lt;" and not "<".
        .replace("&amp;", "&")
}
