use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decode one JSON value, or `None` (logged) when it is `null` or has the wrong shape.
pub fn decode_or_skip<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("ignoring value with unexpected shape: {}", e);
            None
        }
    }
}

/// Decode an optional field without letting a bad value fail the enclosing payload.
///
/// Missing, `null` and wrongly-typed values all become `None`. Use together with
/// `#[serde(default)]` so absent keys are covered too.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(decode_or_skip(Value::deserialize(deserializer)?))
}

/// Like `lenient`, but for lists: bad elements are dropped one by one and the rest are kept
/// in order. A value that is not a list at all is `None`.
pub fn lenient_items<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items.into_iter().filter_map(decode_or_skip).collect())),
        other => {
            debug!("ignoring list field that is not an array: {}", other);
            Ok(None)
        }
    }
}

/// Like `lenient`, but for id-keyed maps: each entry degrades on its own.
pub fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Option<BTreeMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Object(entries) => Ok(Some(
            entries
                .into_iter()
                .filter_map(|(key, value)| decode_or_skip(value).map(|v| (key, v)))
                .collect(),
        )),
        other => {
            debug!("ignoring map field that is not an object: {}", other);
            Ok(None)
        }
    }
}

/// `[now - window, now]` as unix seconds, the shape `load_data` expects for `mintime`/`maxtime`.
pub fn trailing_window(now: DateTime<Utc>, window: Duration) -> (i64, i64) {
    ((now - window).timestamp(), now.timestamp())
}
