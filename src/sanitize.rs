//! Record sanitization.
//!
//! Validates and normalizes raw producer submissions into storable records:
//! field presence, size ceilings with truncation markers, attribute
//! redaction, and a conservative scrub of executable content from the body.
//!
//! The scrub is pattern removal, not an HTML parser. It is a defense-in-depth
//! measure for payloads that may be re-rendered downstream, not a security
//! guarantee.
//!
//! Everything here is pure: the caller's structures are never aliased or
//! mutated, and sanitization has no side effects.

use std::collections::BTreeMap;

use crate::config::LimitSettings;
use crate::constants::{
    ALLOWED_SOURCE_PREFIXES, REDACTED_VALUE, SENSITIVE_KEY_SUBSTRINGS, TRUNCATION_MARKER,
};
use crate::store::types::{RawRecord, Record};

/// Why a raw record was rejected.
///
/// Distinct from anything capacity-related: a rejected record never touches
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    /// A required field was absent (or present but empty, for `id`).
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// `capturedAt` must be a positive epoch-millisecond value.
    #[error("capturedAt must be a positive epoch-millisecond timestamp")]
    NonPositiveTimestamp,

    /// `sourceRef` did not start with an allowed scheme.
    #[error("sourceRef has a disallowed scheme: {0:?}")]
    DisallowedScheme(String),

    /// `label` was present but empty.
    #[error("label must be non-empty")]
    EmptyLabel,
}

/// Validates and normalizes a raw submission.
///
/// On success the returned [`Record`] is a deep copy with ceilings applied:
/// body and excerpt cut at their limits with [`TRUNCATION_MARKER`] appended,
/// media dropped wholesale (and flagged) when over its limit, sensitive
/// attribute values replaced with [`REDACTED_VALUE`], and the body scrubbed
/// of script blocks, inline event handlers, and `javascript:` URLs.
pub fn sanitize(raw: &RawRecord, limits: &LimitSettings) -> Result<Record, SanitizeError> {
    let id = raw
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(SanitizeError::MissingField("id"))?;

    let captured_at = raw
        .captured_at
        .ok_or(SanitizeError::MissingField("capturedAt"))?;
    if captured_at <= 0 {
        return Err(SanitizeError::NonPositiveTimestamp);
    }

    let source_ref = raw
        .source_ref
        .as_deref()
        .ok_or(SanitizeError::MissingField("sourceRef"))?;
    if !ALLOWED_SOURCE_PREFIXES
        .iter()
        .any(|prefix| source_ref.starts_with(prefix))
    {
        return Err(SanitizeError::DisallowedScheme(source_ref.to_string()));
    }

    let label = raw
        .label
        .as_deref()
        .ok_or(SanitizeError::MissingField("label"))?;
    if label.is_empty() {
        return Err(SanitizeError::EmptyLabel);
    }

    let body = truncate_with_marker(raw.body.as_deref().unwrap_or(""), limits.max_body_len);
    let body = scrub_body(&body);
    let excerpt = truncate_with_marker(raw.excerpt.as_deref().unwrap_or(""), limits.max_excerpt_len);

    // Media is all-or-nothing: over the ceiling it is dropped entirely and
    // the record flagged, never cut.
    let (media, media_truncated) = match raw.media.as_deref() {
        Some(media) if media.chars().count() > limits.max_media_len => (None, true),
        Some(media) => (Some(media.to_string()), false),
        None => (None, false),
    };

    let attributes = raw.attributes.as_ref().map_or_else(BTreeMap::new, |attrs| {
        attrs
            .iter()
            .map(|(key, value)| {
                if is_sensitive_key(key) {
                    (key.clone(), REDACTED_VALUE.to_string())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    });

    Ok(Record {
        id: id.to_string(),
        captured_at,
        source_ref: source_ref.to_string(),
        label: label.to_string(),
        body,
        excerpt,
        attributes,
        auxiliary: raw.auxiliary.clone().unwrap_or(serde_json::Value::Null),
        media,
        media_truncated,
    })
}

/// Cuts `text` at `max_chars` Unicode scalar values, appending the marker
/// when anything was removed. Never splits a character.
fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        },
        None => text.to_string(),
    }
}

/// Whether an attribute key warrants redaction.
fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Removes executable constructs from a body payload.
///
/// Runs the strippers to a fixed point: a removal can splice fragments into
/// a new script tag, handler, or URL, so one pass is not enough. Each pass
/// only removes bytes, so the loop terminates.
fn scrub_body(body: &str) -> String {
    let mut current = body.to_string();
    loop {
        let stripped = strip_script_blocks(&current);
        let stripped = strip_event_handlers(&stripped);
        let stripped = strip_javascript_urls(&stripped);
        if stripped == current {
            return stripped;
        }
        current = stripped;
    }
}

/// Removes `<script …>…</script>` blocks, case-insensitively. An
/// unterminated opening tag drops everything through the end of the input.
fn strip_script_blocks(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(rel) = lower[cursor..].find("<script") {
        let open = cursor + rel;
        out.push_str(&input[cursor..open]);

        cursor = match lower[open..].find("</script") {
            Some(close_rel) => {
                let after_close = open + close_rel + "</script".len();
                // consume through the closing '>' of the end tag
                match lower[after_close..].find('>') {
                    Some(gt_rel) => after_close + gt_rel + 1,
                    None => lower.len(),
                }
            },
            None => lower.len(),
        };
    }

    out.push_str(&input[cursor..]);
    out
}

/// Removes whitespace-prefixed `on<name>=<value>` attribute patterns, with
/// quoted or bare values, case-insensitively.
fn strip_event_handlers(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copy_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // candidate attribute starts after the whitespace run: on<alpha>+
        let mut j = i + 1;
        if j + 1 >= bytes.len()
            || !bytes[j].eq_ignore_ascii_case(&b'o')
            || !bytes[j + 1].eq_ignore_ascii_case(&b'n')
        {
            i += 1;
            continue;
        }
        j += 2;

        let name_start = j;
        while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
            j += 1;
        }
        if j == name_start {
            i += 1;
            continue;
        }

        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            i += 1;
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value_end = if j < bytes.len() && (bytes[j] == b'"' || bytes[j] == b'\'') {
            let quote = bytes[j];
            match bytes[j + 1..].iter().position(|&b| b == quote) {
                Some(rel) => j + 1 + rel + 1,
                None => bytes.len(),
            }
        } else {
            let mut k = j;
            while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                k += 1;
            }
            k
        };

        // all boundaries here sit on ASCII bytes, so slicing is char-safe
        out.push_str(&input[copy_start..i]);
        copy_start = value_end;
        i = value_end;
    }

    out.push_str(&input[copy_start..]);
    out
}

/// Removes every case-insensitive occurrence of `javascript:`.
fn strip_javascript_urls(input: &str) -> String {
    const NEEDLE: &str = "javascript:";
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(rel) = lower[cursor..].find(NEEDLE) {
        let at = cursor + rel;
        out.push_str(&input[cursor..at]);
        cursor = at + NEEDLE.len();
    }

    out.push_str(&input[cursor..]);
    out
}
