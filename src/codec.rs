//! Payload codec: the text format stored in a ticket's designated field.
//!
//! An encoded field is a provenance tag followed by a pretty-printed JSON object:
//!
//! ```text
//! generated code: This json text was generated on 11/14/2023, 22:13:20 UTC. Do not modify!
//! {
//!     "updated": "11/14/2023, 22:13:20 UTC",
//!     "items": [],
//!     "jobs": {}
//! }
//! ```
//!
//! Tickets written years ago must stay readable, and other readers of historical
//! data look for the tag to tell machine-written fields from hand-entered text.
//! `TAG_PREFIX` and `TAG_SUFFIX` must never change.

use std::borrow::Cow;
use std::sync::LazyLock;

use jiff::Timestamp;
use regex::Regex;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::model::{JobMap, Payload};

/// Fixed text before the embedded write-time.
pub const TAG_PREFIX: &str = "generated code: This json text was generated on ";

/// Fixed text after the embedded write-time.
pub const TAG_SUFFIX: &str = ". Do not modify! \n";

/// Write-time format used in both the tag and the `updated` key.
const TIME_FORMAT: &str = "%m/%d/%Y, %H:%M:%S UTC";

/// Matches the run of tags at the start of a field, each with any single-line write-time.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^(?:\s*{}[^\n]*?Do not modify!\s*)+",
        regex::escape(TAG_PREFIX)
    );
    Regex::new(&pattern).expect("tag pattern is valid")
});

/// Errors that can occur while encoding or decoding a field.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(
        "the designated field on {key} is not valid JSON and cannot be read; \
         open {key} and check the JSON stored in that field by hand"
    )]
    MalformedField {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "the designated field on {key} is valid JSON but not a payload \
         (expected an object with an `items` array and a `jobs` object of objects); \
         open {key} and fix that field by hand"
    )]
    UnexpectedShape {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, CodecError>;

/// On-field JSON layout. Field order is the on-field key order.
#[derive(Serialize)]
struct Stored<'a> {
    updated: &'a str,
    items: Option<&'a [Value]>,
    jobs: &'a JobMap,
}

/// Formats a write-time the way it appears on the field.
pub fn format_time(at: Timestamp) -> String {
    at.strftime(TIME_FORMAT).to_string()
}

/// The provenance tag for a write at `at`.
pub fn provenance_tag(at: Timestamp) -> String {
    format!("{TAG_PREFIX}{}{TAG_SUFFIX}", format_time(at))
}

/// Encodes items and jobs as field text, stamped with the current time.
pub fn encode(items: Option<&[Value]>, jobs: &JobMap) -> Result<String> {
    encode_at(Timestamp::now(), items, jobs)
}

/// Encodes items and jobs as field text, stamped with `at`.
pub fn encode_at(at: Timestamp, items: Option<&[Value]>, jobs: &JobMap) -> Result<String> {
    let updated = format_time(at);
    let stored = Stored {
        updated: &updated,
        items,
        jobs,
    };

    let mut body = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(b"    "));
    stored
        .serialize(&mut serializer)
        .map_err(CodecError::Encode)?;

    Ok(format!(
        "{TAG_PREFIX}{updated}{TAG_SUFFIX}{}",
        String::from_utf8_lossy(&body)
    ))
}

/// Removes the provenance tags heading the field text, whatever write-time they carry.
///
/// Only the leading run is removed. Tag text inside the JSON body is data.
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    TAG_PATTERN.replace(text, "")
}

/// Decodes the raw field text of ticket `key`.
///
/// Absent, empty, or tag-only fields decode to [`Payload::empty`].
/// Text that isn't JSON is [`CodecError::MalformedField`]; JSON that isn't a payload
/// object is [`CodecError::UnexpectedShape`]. Nothing is guessed.
pub fn decode(key: &str, raw: Option<&str>) -> Result<Payload> {
    let Some(raw) = raw else {
        return Ok(Payload::empty());
    };

    let stripped = strip_tags(raw);
    let body = stripped.trim();
    if body.is_empty() {
        return Ok(Payload::empty());
    }

    let malformed = |source: serde_json::Error| CodecError::MalformedField {
        key: key.to_string(),
        source,
    };

    let unexpected = |source: serde_json::Error| CodecError::UnexpectedShape {
        key: key.to_string(),
        source,
    };

    let value: Value = serde_json::from_str(body).map_err(malformed)?;
    let Value::Object(map) = value else {
        return Err(unexpected(serde_json::Error::custom(
            "expected a JSON object at the top level",
        )));
    };

    from_object(map).map_err(unexpected)
}

fn from_object(mut map: Map<String, Value>) -> serde_json::Result<Payload> {
    // Older writers stored the write-time under `timestamp`.
    let timestamp = match map.remove("updated").or_else(|| map.remove("timestamp")) {
        Some(Value::String(s)) => s,
        None | Some(Value::Null) => Payload::UNKNOWN.to_string(),
        Some(other) => other.to_string(),
    };

    let items = match map.remove("items") {
        None => Some(Vec::new()),
        Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value(value)?),
    };

    let jobs = match map.remove("jobs") {
        None | Some(Value::Null) => JobMap::new(),
        Some(value) => serde_json::from_value(value)?,
    };

    Ok(Payload {
        timestamp,
        items,
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::model::Job;

    fn at(seconds: i64) -> Timestamp {
        Timestamp::new(seconds, 0).unwrap()
    }

    fn sample_jobs() -> JobMap {
        let mut jobs = JobMap::new();
        jobs.insert("J1".to_string(), Job::new("rebuild index", "itemA"));
        jobs
    }

    #[test]
    fn tag_format_is_stable() {
        assert_eq!(
            provenance_tag(at(1_700_000_000)),
            "generated code: This json text was generated on 11/14/2023, 22:13:20 UTC. Do not modify! \n"
        );
    }

    #[test]
    fn encode_layout() {
        let items = vec![json!("x")];
        let text = encode_at(at(1_700_000_000), Some(items.as_slice()), &sample_jobs()).unwrap();

        let expected = "generated code: This json text was generated on 11/14/2023, 22:13:20 UTC. Do not modify! \n\
{
    \"updated\": \"11/14/2023, 22:13:20 UTC\",
    \"items\": [
        \"x\"
    ],
    \"jobs\": {
        \"J1\": {
            \"description\": \"rebuild index\",
            \"item\": \"itemA\"
        }
    }
}";
        assert_eq!(text, expected);
    }

    #[test]
    fn round_trip_keeps_items_and_jobs() {
        let items = vec![json!({"name": "a", "size": 3}), json!([1, 2]), json!(null)];
        let jobs = sample_jobs();

        let text = encode(Some(items.as_slice()), &jobs).unwrap();
        let payload = decode("EXAMPLE-1", Some(text.as_str())).unwrap();

        assert_eq!(payload.items, Some(items));
        assert_eq!(payload.jobs, jobs);
    }

    #[test]
    fn decode_reads_write_time() {
        let text = encode_at(at(1_700_000_000), Some(&[][..]), &JobMap::new()).unwrap();
        let payload = decode("EXAMPLE-1", Some(text.as_str())).unwrap();
        assert_eq!(payload.timestamp, "11/14/2023, 22:13:20 UTC");
    }

    #[test]
    fn strips_tag_with_any_write_time() {
        let body = r#"{"items": ["x"], "jobs": {}}"#;
        let old = format!("{}{body}", provenance_tag(at(0)));
        let odd = format!("{TAG_PREFIX}sometime last spring{TAG_SUFFIX}{body}");

        for text in [old, odd] {
            let payload = decode("EXAMPLE-1", Some(text.as_str())).unwrap();
            assert_eq!(payload.items, Some(vec![json!("x")]));
        }
    }

    #[test]
    fn strips_repeated_tags() {
        let text = format!(
            "{}{}{{\"items\": []}}",
            provenance_tag(at(0)),
            provenance_tag(at(1_700_000_000))
        );
        assert_eq!(strip_tags(&text).trim(), "{\"items\": []}");
    }

    #[test]
    fn tag_text_inside_items_survives() {
        let quoted = format!(
            "{TAG_PREFIX}01/01/2020, 00:00:00 UTC. Do not modify! keep me"
        );
        let items = vec![Value::String(quoted), json!("after")];
        let mut jobs = JobMap::new();
        jobs.insert(
            "J1".to_string(),
            Job::new(provenance_tag(at(0)), "itemA"),
        );

        let text = encode(Some(items.as_slice()), &jobs).unwrap();
        let payload = decode("EXAMPLE-1", Some(text.as_str())).unwrap();

        assert_eq!(payload.items, Some(items));
        assert_eq!(payload.jobs, jobs);
    }

    #[test]
    fn strip_only_touches_the_head() {
        let text = format!("{{\"items\": []}} {}", provenance_tag(at(0)));
        assert_eq!(strip_tags(&text), text);
    }

    #[test]
    fn strip_leaves_untagged_text_alone() {
        let text = "generated code: written by hand";
        assert_eq!(strip_tags(text), text);
    }

    #[test]
    fn empty_and_absent_fields_are_empty_payloads() {
        let tag_only = provenance_tag(at(0));
        for raw in [None, Some(""), Some("   \n"), Some(tag_only.as_str())] {
            let payload = decode("EXAMPLE-1", raw).unwrap();
            assert_eq!(payload, Payload::empty());
        }
    }

    #[test]
    fn malformed_field_names_the_ticket() {
        let err = decode("EXAMPLE-9", Some("not json")).unwrap_err();
        assert!(matches!(err, CodecError::MalformedField { ref key, .. } if key == "EXAMPLE-9"));
        assert!(err.to_string().contains("EXAMPLE-9"));
    }

    #[test]
    fn malformed_after_tag_is_rejected() {
        let text = format!("{}{{\"items\": [", provenance_tag(at(0)));
        assert!(decode("EXAMPLE-1", Some(text.as_str())).is_err());
    }

    #[test]
    fn non_object_json_has_unexpected_shape() {
        for raw in ["[1, 2]", "\"text\"", "42"] {
            let err = decode("EXAMPLE-1", Some(raw)).unwrap_err();
            assert!(matches!(err, CodecError::UnexpectedShape { .. }), "{raw}");
        }
    }

    #[test]
    fn wrongly_typed_collections_have_unexpected_shape() {
        for raw in [
            r#"{"items": {"a": 1}}"#,
            r#"{"jobs": ["J1"]}"#,
            r#"{"jobs": {"J1": "rebuild"}}"#,
        ] {
            let err = decode("EXAMPLE-1", Some(raw)).unwrap_err();
            assert!(matches!(err, CodecError::UnexpectedShape { .. }), "{raw}");
            assert!(!err.to_string().contains("not valid JSON"), "{raw}");
        }
    }

    #[test]
    fn job_sub_fields_are_kept_as_found() {
        let raw = r#"{"jobs": {"J0": {"description": "d", "item": 7, "status": "done"}}}"#;
        let payload = decode("EXAMPLE-1", Some(raw)).unwrap();

        let text = encode(payload.items.as_deref(), &payload.jobs).unwrap();
        let again = decode("EXAMPLE-1", Some(text.as_str())).unwrap();
        assert_eq!(again.jobs["J0"].get("item"), Some(&json!(7)));
        assert_eq!(again.jobs["J0"].get("status"), Some(&json!("done")));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let payload = decode("EXAMPLE-1", Some("{}")).unwrap();
        assert_eq!(payload.timestamp, Payload::UNKNOWN);
        assert_eq!(payload.items, Some(Vec::new()));
        assert!(payload.jobs.is_empty());
    }

    #[test]
    fn legacy_timestamp_key_is_read() {
        let payload = decode("EXAMPLE-1", Some(r#"{"timestamp": "then"}"#)).unwrap();
        assert_eq!(payload.timestamp, "then");
    }

    #[test]
    fn null_items_decode_as_uninitialised() {
        let payload = decode("EXAMPLE-1", Some(r#"{"items": null, "jobs": null}"#)).unwrap();
        assert_eq!(payload.items, None);
        assert!(payload.jobs.is_empty());
    }

    #[test]
    fn unknown_keys_do_not_survive_a_write() {
        let payload = decode("EXAMPLE-1", Some(r#"{"items": [], "owner": "ops"}"#)).unwrap();
        let text = encode(payload.items.as_deref(), &payload.jobs).unwrap();
        assert!(!text.contains("owner"));
    }

    proptest! {
        #[test]
        fn round_trip_any_strings(
            items in prop::collection::vec(".*", 0..8),
            jobs in prop::collection::btree_map("[A-Z][0-9]{1,3}", (".*", ".*"), 0..8),
        ) {
            let items: Vec<Value> = items.into_iter().map(Value::String).collect();
            let jobs: JobMap = jobs
                .into_iter()
                .map(|(id, (description, item))| (id, Job::new(description, item)))
                .collect();

            let text = encode(Some(items.as_slice()), &jobs).unwrap();
            let payload = decode("EXAMPLE-1", Some(text.as_str())).unwrap();

            prop_assert_eq!(payload.items, Some(items));
            prop_assert_eq!(payload.jobs, jobs);
        }
    }
}
