//! Cleanup of raw model output into a parseable JSON candidate.
//!
//! Each stage is a pure text transform that only ever deletes characters.
//! [`sanitize`] runs the whole chain until the text stops changing, which
//! makes it idempotent for every input.

use regex::Regex;
use std::sync::LazyLock;

/// `//` up to the end of the line. Not string-aware.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//.*$").expect("valid regex"));

/// One or more commas (with any whitespace) directly before `]` or `}`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(?:\s*,)*\s*([\]}])").expect("valid regex"));

const FENCE: &str = "```";

/// Stage 1: trim surrounding whitespace.
pub fn trim(text: &str) -> &str {
    text.trim()
}

/// Stage 2: strip a leading fence (with optional language tag) and a
/// trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let mut inner = text.trim();

    if let Some(rest) = inner.strip_prefix(FENCE) {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        inner = rest[tag_len..].trim_start();
    }

    if let Some(rest) = inner.strip_suffix(FENCE) {
        inner = rest.trim_end();
    }

    inner
}

/// Stage 3: remove `//` line comments.
pub fn strip_line_comments(text: &str) -> String {
    LINE_COMMENT.replace_all(text, "").into_owned()
}

/// Stage 4: remove commas that directly precede `]` or `}`.
pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Stage 5: keep the span from the first `{` to the last `}`.
///
/// Returns the input unchanged when there is no such span.
pub fn isolate_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn sanitize_pass(text: &str) -> String {
    let text = trim(text);
    let text = strip_code_fences(text);
    let text = strip_line_comments(text);
    let text = strip_trailing_commas(&text);
    isolate_object(&text).to_string()
}

/// Clean raw model output into candidate JSON text. Never fails; in the
/// worst case the (trimmed) input comes back unchanged.
pub fn sanitize(raw: &str) -> String {
    let mut current = sanitize_pass(raw);
    // Every stage only deletes characters, so a changed pass is strictly
    // shorter and the loop terminates.
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
