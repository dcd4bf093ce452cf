//! Deterministic cleanup of raw model output into the canonical shape for
//! its content type. Applied to every candidate before scoring.

use copydesk_common::{ContentType, RequestParams};
use regex::Regex;

use crate::strategy::strategy_for;

/// Clean `raw` into the canonical shape for `content_type`.
///
/// Never returns an empty string: if shaping erodes everything, the
/// trimmed raw text is returned instead. Idempotent on already-clean text.
pub fn shape_output(content_type: ContentType, raw: &str, params: &RequestParams) -> String {
    let cleaned = base_clean(raw);
    let shaped = strategy_for(content_type).shape(&cleaned, params);
    if shaped.trim().is_empty() {
        raw.trim().to_string()
    } else {
        shaped
    }
}

/// Cleanup shared by every content type: code fences, markdown headings,
/// stray whitespace, and scaffolding prefaces.
fn base_clean(raw: &str) -> String {
    let mut t = raw.trim().to_string();
    t = strip_code_fences(&t);
    t = strip_headings(&t);
    t = t.replace('\u{a0}', " ");
    t = Regex::new(r"[ \t]+\n")
        .expect("valid regex")
        .replace_all(&t, "\n")
        .into_owned();
    t = Regex::new(r"\n{3,}")
        .expect("valid regex")
        .replace_all(&t, "\n\n")
        .into_owned();
    strip_scaffolding(t.trim())
}

pub(crate) fn strip_code_fences(s: &str) -> String {
    Regex::new(r"(?is)```[a-z]*\n?(.*?)```")
        .expect("valid regex")
        .replace_all(s, "$1")
        .trim()
        .to_string()
}

pub(crate) fn strip_headings(s: &str) -> String {
    Regex::new(r"^\s{0,3}#{1,6}\s+[^\n]+\n+")
        .expect("valid regex")
        .replace_all(s, "")
        .trim()
        .to_string()
}

// Scaffolding prefaces the model keeps inventing.
const SCAFFOLD_PREFIXES: &[&str] = &[
    "here is the revised text",
    "here is the internal comms announcement",
    "here is the press release",
    "here is the announcement",
    "here is the update",
    "here is the text",
    "here's the revised text",
    "here's the announcement",
    "here's the update",
    "below is the",
    "final text",
    "updated copy",
    "answer",
    "response",
    "output",
    "result",
    "draft",
];

/// Strip scaffolding prefaces and labels wherever they appear, not only at
/// the string start.
pub(crate) fn strip_scaffolding(s: &str) -> String {
    let mut t = s.to_string();

    let prefixes = SCAFFOLD_PREFIXES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    t = Regex::new(&format!(r"(?i)^\s*(?:{prefixes})\b[^:\n]*:\s*"))
        .expect("valid regex")
        .replace(&t, "")
        .into_owned();

    // Inline labels that sneak into the middle of a reply.
    t = Regex::new(r"(?im)(?:^|\n)\s*(?:task|output|final|draft)\s*:\s*")
        .expect("valid regex")
        .replace_all(&t, "\n")
        .into_owned();

    // A lone leading bullet.
    t = Regex::new(r"^\s*[-–]\s*")
        .expect("valid regex")
        .replace(&t, "")
        .into_owned();

    t.trim().to_string()
}

/// Leading "Here is …:" / "Press release:" label line, stripped again after
/// type-specific handling (the model sometimes nests them).
pub(crate) fn strip_leading_label(s: &str) -> String {
    let mut t = Regex::new(
        r"(?i)^(?:here\s+is|here's|below is|internal comms announcement|press release|final text|updated copy|answer|response)\b[^:\n]*:\s*",
    )
    .expect("valid regex")
    .replace(s, "")
    .trim()
    .to_string();

    t = Regex::new(r"(?i)^(?:output|task|draft|final)\s*:\s*")
        .expect("valid regex")
        .replace(&t, "")
        .trim()
        .to_string();

    t
}

/// First quoted span, if any. Single quotes only count at word boundaries
/// so apostrophes don't shear the text.
pub(crate) fn first_quoted_span(s: &str) -> Option<String> {
    let double = Regex::new(r#""([^"]+)"|“([^”]+)”"#).expect("valid regex");
    if let Some(caps) = double.captures(s) {
        let span = caps.get(1).or_else(|| caps.get(2))?;
        return Some(span.as_str().trim().to_string());
    }

    let single = Regex::new(r"(?:^|\s)['‘]([^'’]+)['’](?:[\s.!?,;:]|$)").expect("valid regex");
    single
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Unwrap a reply the model wrapped entirely in quotes.
pub(crate) fn unwrap_quotes(s: &str) -> String {
    s.trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’'))
        .trim()
        .to_string()
}
