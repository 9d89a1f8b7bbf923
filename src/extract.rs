//! Loose JSON extraction from free-form text.
//!
//! Model replies often wrap JSON in prose or code fences. [`extract_json`]
//! returns every balanced object or array that parses, skipping fragments
//! that look like JSON but don't.

use serde_json::Value;

/// Extract every top-level JSON object/array embedded in `text`.
pub fn extract_json(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'{' | b'[') {
            if let Some(end) = balanced_end(bytes, i) {
                match serde_json::from_str::<Value>(&text[i..=end]) {
                    Ok(value) => {
                        found.push(value);
                        i = end + 1;
                        continue;
                    }
                    Err(e) => tracing::trace!(offset = i, error = %e, "Skipping malformed JSON fragment"),
                }
            }
        }
        i += 1;
    }

    found
}

/// Index of the delimiter closing the one at `start`, honoring strings.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut expected = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(byte) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}
