//! Match spans from highlighted headlines.
//!
//! Span offsets count characters of the value with all markers removed.

use super::MatchSpan;

pub const HIGHLIGHT_START: &str = "<<";
pub const HIGHLIGHT_STOP: &str = ">>";

/// Removes highlight markers from `headline`, returning the plain value and the
/// spans the markers enclosed. A start marker without a matching stop marker is
/// kept as text.
pub fn strip_highlights(headline: &str) -> (String, Vec<MatchSpan>) {
    let mut value = String::with_capacity(headline.len());
    let mut spans = Vec::new();
    let mut chars = 0usize;
    let mut rest = headline;

    while let Some(start) = rest.find(HIGHLIGHT_START) {
        let after_start = &rest[start + HIGHLIGHT_START.len()..];
        let Some(stop) = after_start.find(HIGHLIGHT_STOP) else {
            break;
        };

        let before = &rest[..start];
        value.push_str(before);
        chars += before.chars().count();

        let hit = &after_start[..stop];
        let hit_chars = hit.chars().count();
        value.push_str(hit);
        if hit_chars > 0 {
            spans.push(MatchSpan {
                start: chars,
                end: chars + hit_chars,
            });
        }
        chars += hit_chars;

        rest = &after_start[stop + HIGHLIGHT_STOP.len()..];
    }
    value.push_str(rest);

    (value, spans)
}

/// Non-overlapping, case-insensitive occurrences of `needle` in `value`.
pub fn substring_spans(value: &str, needle: &str) -> Vec<MatchSpan> {
    let haystack: Vec<char> = value.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        let hit = haystack[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
        if hit {
            spans.push(MatchSpan {
                start: i,
                end: i + needle.len(),
            });
            i += needle.len();
        } else {
            i += 1;
        }
    }
    spans
}
