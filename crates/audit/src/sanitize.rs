//! Scrubbing of request and response payloads before they are logged.

use serde_json::Value;
use tracing::debug;

/// Replacement written over sensitive values.
pub const MASK: &str = "***";

/// Longest payload kept, in characters, once serialized.
pub const MAX_CONTENT_CHARS: usize = 5000;

const TRUNCATED_SUFFIX: &str = "...(truncated)";

/// Key fragments that mark a field as sensitive. Matched case-insensitively
/// as substrings, so `newPassword` and `X-Api-Key` are caught too.
const SENSITIVE_FRAGMENTS: &[&str] = &[
    "password",
    "pwd",
    "passwd",
    "pass",
    "token",
    "secret",
    "apikey",
    "api_key",
    "api-key",
    "authorization",
];

pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS.iter().any(|f| key.contains(f))
}

/// Mask sensitive fields at any depth, then cap the payload at
/// [`MAX_CONTENT_CHARS`]. An oversized payload is replaced by its truncated
/// serialization as a string.
pub fn sanitize(mut value: Value) -> Value {
    mask(&mut value);
    let text = value.to_string();
    if text.chars().count() > MAX_CONTENT_CHARS {
        debug!(chars = text.chars().count(), "truncating oversized audit payload");
        return Value::String(truncate(&text));
    }
    value
}

/// [`sanitize`] for payloads that arrive as text. Text that is not JSON is
/// only length-capped.
pub fn sanitize_text(content: &str) -> String {
    if content.trim().is_empty() {
        return content.to_string();
    }
    match serde_json::from_str::<Value>(content) {
        Ok(mut value) => {
            mask(&mut value);
            let text = value.to_string();
            if text.chars().count() > MAX_CONTENT_CHARS { truncate(&text) } else { text }
        }
        Err(err) => {
            debug!(%err, "audit payload is not JSON; skipping field masking");
            if content.chars().count() > MAX_CONTENT_CHARS {
                truncate(content)
            } else {
                content.to_string()
            }
        }
    }
}

fn mask(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *field = Value::String(MASK.to_string());
                } else {
                    mask(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask),
        _ => {}
    }
}

fn truncate(text: &str) -> String {
    let mut cut: String = text.chars().take(MAX_CONTENT_CHARS).collect();
    cut.push_str(TRUNCATED_SUFFIX);
    cut
}
