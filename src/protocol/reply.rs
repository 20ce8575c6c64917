// src/protocol/reply.rs

use crate::error::DecodeError;
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

/// Removes reasoning preambles and a surrounding code fence (with an optional
/// language tag) from a model reply.
pub fn strip_code_fences(reply: &str) -> String {
    let body = match reply.rsplit_once("</think>") {
        Some((_, after)) => after.trim(),
        None => reply.trim(),
    };

    let Some(open) = fence_start(body) else {
        return body.to_string();
    };

    let inner = skip_language_tag(&body[open + FENCE.len()..]);
    let inner = match closing_fence(inner) {
        Some(close) => &inner[..close],
        None => inner,
    };
    inner.trim().to_string()
}

/// The first fence opening a line closes the block; a one-line block closes
/// at its last fence.
fn closing_fence(inner: &str) -> Option<usize> {
    if inner.starts_with(FENCE) {
        return Some(0);
    }
    inner
        .find("\n```")
        .map(|i| i + 1)
        .or_else(|| inner.rfind(FENCE))
}

fn fence_start(body: &str) -> Option<usize> {
    if body.starts_with(FENCE) {
        return Some(0);
    }
    body.find("\n```").map(|i| i + 1)
}

fn skip_language_tag(after_open: &str) -> &str {
    let (first_line, rest) = after_open.split_once('\n').unwrap_or((after_open, ""));
    let is_tag = first_line
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
    if is_tag { rest } else { after_open }
}

/// Finds the first balanced `{...}` object, ignoring braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = None;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' if start.is_some() => in_string = !in_string,
            _ if in_string => {}
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict decode of a model reply into `T`.
///
/// Tries the fence-stripped reply first, then the first embedded object.
pub fn decode_json<T: DeserializeOwned>(reply: &str) -> Result<T, DecodeError> {
    let cleaned = strip_code_fences(reply);
    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => Ok(value),
        Err(direct) => {
            let fragment = extract_json_object(&cleaned).ok_or(DecodeError::NoJson)?;
            if fragment.len() == cleaned.len() {
                return Err(DecodeError::Json(direct));
            }
            Ok(serde_json::from_str::<T>(fragment)?)
        }
    }
}
