//! Secret scrubbing applied to call logs before persistence.
//!
//! Cassettes are committed alongside tests, so anything credential-shaped
//! must be gone before a file hits disk. Scrubbing happens exactly once, on
//! the full record list at the end of a successful record session.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::cassette::format::CallRecord;

/// Marker written over any redacted value or matched substring.
pub const REDACTED: &str = "REDACTED";

/// Keys whose values are always redacted, compared case-insensitively.
const SCRUB_KEYS: [&str; 8] = [
    "api_key",
    "api_base",
    "api_version",
    "authorization",
    "token",
    "secret",
    "password",
    "credential",
];

// The Rust `regex` crate has no look-behind, so keep the pattern simple: a
// vendor key prefix followed by at least ten key-ish characters.
static SECRET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-[A-Za-z0-9_-]{10,}").expect("secret pattern is valid"));

/// Redacts credential-shaped content from a plain-data value.
///
/// Mapping values at denylisted keys become [`REDACTED`] wholesale; strings
/// have only the secret-shaped substring replaced, leaving surrounding text
/// intact; sequences recurse elementwise; other scalars pass through
/// unchanged. Idempotent, and total over any [`Value`].
#[must_use]
pub fn scrub(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    if is_denylisted(key) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), scrub(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(scrub).collect()),
        Value::String(text) => {
            Value::String(SECRET_PATTERN.replace_all(text, REDACTED).into_owned())
        }
        other => other.clone(),
    }
}

/// Scrubs a full call record list for persistence.
///
/// Round-trips through [`Value`] so kwarg *names* are checked against the
/// denylist exactly like any other mapping key.
///
/// # Errors
///
/// Returns an error only if the scrubbed value no longer fits the record
/// shape, which would indicate a bug in the scrubber itself.
pub fn scrub_records(records: &[CallRecord]) -> Result<Vec<CallRecord>, serde_json::Error> {
    let value = serde_json::to_value(records)?;
    serde_json::from_value(scrub(&value))
}

fn is_denylisted(key: &str) -> bool {
    SCRUB_KEYS.iter().any(|denied| key.eq_ignore_ascii_case(denied))
}

#[cfg(test)]
mod tests {
    use super::{scrub, scrub_records, REDACTED};
    use crate::cassette::format::{ApiKind, CallRecord, SerializedArgs, SerializedResponse};
    use serde_json::{json, Value};

    #[test]
    fn redacts_denylisted_keys_any_case() {
        let input = json!({
            "api_key": "sk-abc",
            "Authorization": "Bearer xyz",
            "TOKEN": "t",
            "model": "claude-sonnet-4"
        });
        let out = scrub(&input);
        assert_eq!(out["api_key"], json!(REDACTED));
        assert_eq!(out["Authorization"], json!(REDACTED));
        assert_eq!(out["TOKEN"], json!(REDACTED));
        assert_eq!(out["model"], json!("claude-sonnet-4"));
    }

    #[test]
    fn redacts_secret_substring_in_place() {
        let input = json!("key is sk-abc1234567890XYZ and more text");
        let out = scrub(&input);
        assert_eq!(out, json!("key is REDACTED and more text"));
    }

    #[test]
    fn similar_but_short_strings_untouched() {
        let input = json!("sk-short is not a key");
        assert_eq!(scrub(&input), input);
    }

    #[test]
    fn recurses_into_arrays_preserving_order() {
        let input = json!(["a", {"secret": "s3cr3t"}, 42, "sk-abcdefghij0123"]);
        let out = scrub(&input);
        assert_eq!(out, json!(["a", {"secret": REDACTED}, 42, REDACTED]));
    }

    #[test]
    fn non_string_scalars_pass_through() {
        for input in [json!(17), json!(1.5), json!(true), Value::Null] {
            assert_eq!(scrub(&input), input);
        }
    }

    #[test]
    fn nested_maps_are_scrubbed() {
        let input = json!({"outer": {"inner": {"password": "hunter2", "kept": "x"}}});
        let out = scrub(&input);
        assert_eq!(out["outer"]["inner"]["password"], json!(REDACTED));
        assert_eq!(out["outer"]["inner"]["kept"], json!("x"));
    }

    #[test]
    fn idempotent_over_mixed_input() {
        let input = json!({
            "api_key": "sk-abc1234567890",
            "messages": [{"role": "user", "content": "ship it sk-abcdefghijkl"}],
            "max_tokens": 1024
        });
        let once = scrub(&input);
        let twice = scrub(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn max_tokens_is_not_the_token_key() {
        let input = json!({"max_tokens": 256});
        assert_eq!(scrub(&input), input);
    }

    #[test]
    fn scrub_records_checks_kwarg_names() {
        let record = CallRecord {
            api: ApiKind::Completion,
            request: SerializedArgs {
                args: vec![json!("sk-abcdefghij0123456")],
                kwargs: [
                    ("api_key".to_string(), json!("sk-live-key-9876543210")),
                    ("model".to_string(), json!("claude-sonnet-4")),
                ]
                .into_iter()
                .collect(),
            },
            response: SerializedResponse {
                type_tag: "raw".to_string(),
                data: json!({"text": "ok"}),
            },
        };

        let scrubbed = scrub_records(&[record]).expect("records keep their shape");
        assert_eq!(scrubbed[0].request.args[0], json!(REDACTED));
        assert_eq!(scrubbed[0].request.kwargs["api_key"], json!(REDACTED));
        assert_eq!(scrubbed[0].request.kwargs["model"], json!("claude-sonnet-4"));
        assert_eq!(scrubbed[0].response.data, json!({"text": "ok"}));
    }
}
