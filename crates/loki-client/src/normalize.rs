// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flattens query responses into [`LogRecord`]s.
//!
//! Two result shapes are understood:
//!
//! ```text
//! streams: data.result[] = {"stream": {labels}, "values": [[ts, line], ...]}
//! matrix:  data.result[] = {"metric": {labels}, "values": [[bucket, payload], ...]}
//!          payload       = [ts, line] | [[ts, line], ...]
//! ```
//!
//! Anything else flattens to an empty list. Normalization never fails.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::stream::Labels;

const NANOS_PER_MILLI: i128 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Timestamp exactly as the service sent it (string or number).
    pub timestamp: Value,
    /// `None` when the timestamp is not an integer or is out of range.
    pub timestamp_ms: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    /// Decoded JSON when the line parses as JSON, the line itself otherwise.
    pub message: Value,
    pub labels: Labels,
}

/// Flattens a query response. Unknown or missing shapes yield no records.
#[must_use]
pub fn normalize(response: &Value) -> Vec<LogRecord> {
    let Some(result) = response.pointer("/data/result").and_then(Value::as_array) else {
        return Vec::new();
    };

    match response.pointer("/data/resultType").and_then(Value::as_str) {
        Some("streams") => flatten_streams(result),
        Some("matrix") => flatten_matrix(result),
        other => {
            debug!("Ignoring result of type {:?}", other);
            Vec::new()
        }
    }
}

fn flatten_streams(result: &[Value]) -> Vec<LogRecord> {
    let mut records = Vec::new();
    for element in result {
        let Some(values) = element.get("values").and_then(Value::as_array) else {
            continue;
        };
        let labels = labels_of(element.get("stream"));
        for pair in values {
            if let Some(record) = pair.as_array().and_then(|pair| record_from(pair, &labels)) {
                records.push(record);
            }
        }
    }
    records
}

fn flatten_matrix(result: &[Value]) -> Vec<LogRecord> {
    let mut records = Vec::new();
    for element in result {
        let Some(buckets) = element.get("values").and_then(Value::as_array) else {
            continue;
        };
        let labels = labels_of(element.get("metric"));
        for bucket in buckets {
            let Some(payload) = bucket.get(1).and_then(Value::as_array) else {
                continue;
            };
            for pair in bucket_pairs(payload) {
                if let Some(record) = record_from(pair, &labels) {
                    records.push(record);
                }
            }
        }
    }
    records
}

/// A bucket payload holds several pairs when its first element is itself an array.
fn bucket_pairs(payload: &[Value]) -> Vec<&[Value]> {
    let multi = payload.first().is_some_and(Value::is_array);
    if multi {
        payload
            .iter()
            .filter_map(Value::as_array)
            .map(Vec::as_slice)
            .collect()
    } else {
        vec![payload]
    }
}

fn record_from(pair: &[Value], labels: &Labels) -> Option<LogRecord> {
    let [timestamp, message, ..] = pair else {
        return None;
    };
    let timestamp_ms = nanos_to_millis(timestamp);
    let date = timestamp_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    if date.is_none() {
        debug!("No date for entry with timestamp {}", timestamp);
    }
    let message = match message {
        Value::String(text) => decode_message(text),
        other => other.clone(),
    };

    Some(LogRecord {
        timestamp: timestamp.clone(),
        timestamp_ms,
        date,
        message,
        labels: labels.clone(),
    })
}

fn nanos_to_millis(timestamp: &Value) -> Option<i64> {
    let nanos: i128 = match timestamp {
        Value::String(text) => text.trim().parse().ok()?,
        Value::Number(number) => match number.as_i64() {
            Some(n) => i128::from(n),
            // Float nanosecond values lose precision anyway; truncate
            None => number.as_f64().filter(|f| f.is_finite())? as i128,
        },
        _ => return None,
    };
    i64::try_from(nanos / NANOS_PER_MILLI).ok()
}

fn labels_of(value: Option<&Value>) -> Labels {
    let Some(map) = value.and_then(Value::as_object) else {
        return Labels::new();
    };
    map.iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Decodes `text` as JSON, falling back to the text itself.
#[must_use]
pub fn decode_message(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_streams_plain_text() {
        let response = json!({
            "status": "success",
            "data": {
                "resultType": "streams",
                "result": [{"stream": {"job": "api"}, "values": [["1000000000", "hello"]]}]
            }
        });

        let records = normalize(&response);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.timestamp, json!("1000000000"));
        assert_eq!(record.timestamp_ms, Some(1000));
        assert_eq!(record.message, json!("hello"));
        assert_eq!(record.date, Utc.timestamp_millis_opt(1000).single());
        assert_eq!(record.labels.get("job").unwrap(), "api");
    }

    #[test]
    fn test_streams_skips_elements_without_values() {
        let response = json!({
            "data": {
                "resultType": "streams",
                "result": [
                    {"stream": {"job": "a"}},
                    {"stream": {"job": "b"}, "values": [["1", "x"], ["2"], ["3000000", "y"]]}
                ]
            }
        });

        let records = normalize(&response);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp_ms, Some(0));
        assert_eq!(records[1].timestamp_ms, Some(3));
        assert!(records.iter().all(|r| r.labels.get("job").unwrap() == "b"));
    }

    #[test]
    fn test_matrix_multi_entry_bucket() {
        let response = json!({
            "data": {
                "resultType": "matrix",
                "result": [{
                    "metric": {"job": "api"},
                    "values": [[1000, [["2000000000", "{\"a\":1}"]]]]
                }]
            }
        });

        let records = normalize(&response);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, json!({"a": 1}));
        assert_eq!(records[0].timestamp_ms, Some(2000));
        assert_eq!(records[0].labels.get("job").unwrap(), "api");
    }

    #[test]
    fn test_matrix_single_entry_bucket() {
        let response = json!({
            "data": {
                "resultType": "matrix",
                "result": [{
                    "metric": {"job": "api"},
                    "values": [
                        [1000, ["3000000000", "single"]],
                        [2000, [["4000000000", "one"], ["5000000000", "two"], ["short"]]]
                    ]
                }]
            }
        });

        let records = normalize(&response);
        let messages: Vec<_> = records.iter().map(|r| r.message.clone()).collect();
        assert_eq!(messages, vec![json!("single"), json!("one"), json!("two")]);
    }

    #[test]
    fn test_missing_result_is_empty() {
        assert!(normalize(&json!({})).is_empty());
        assert!(normalize(&json!({"data": {"resultType": "streams"}})).is_empty());
        assert!(normalize(&Value::Null).is_empty());
    }

    #[test]
    fn test_unknown_result_type_is_empty() {
        let response = json!({
            "data": {"resultType": "vector", "result": [{"metric": {}, "value": [1, "2"]}]}
        });
        assert!(normalize(&response).is_empty());

        let response = json!({"data": {"result": [{"stream": {}, "values": [["1", "x"]]}]}});
        assert!(normalize(&response).is_empty());
    }

    #[test]
    fn test_numeric_and_invalid_timestamps() {
        let response = json!({
            "data": {
                "resultType": "streams",
                "result": [{
                    "stream": {"job": "api"},
                    "values": [[1500000000, "num"], ["not-a-number", "hello"], ["", "x"]]
                }]
            }
        });

        let records = normalize(&response);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].timestamp, json!(1500000000));
        assert_eq!(records[0].timestamp_ms, Some(1500));
        assert!(records[0].date.is_some());

        assert_eq!(records[1].timestamp, json!("not-a-number"));
        assert_eq!(records[1].timestamp_ms, None);
        assert_eq!(records[1].date, None);
        assert_eq!(records[1].message, json!("hello"));
        assert_eq!(records[2].timestamp_ms, None);
        assert_eq!(records[2].labels.get("job").unwrap(), "api");
    }

    #[test]
    fn test_out_of_range_timestamp_has_no_date() {
        let far = i128::MAX.to_string();
        let response = json!({
            "data": {
                "resultType": "streams",
                "result": [{"stream": {}, "values": [[far, "far"]]}]
            }
        });

        let records = normalize(&response);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].message, json!("far"));
    }

    #[test]
    fn test_decode_message() {
        assert_eq!(decode_message(r#"{"level":"info"}"#), json!({"level": "info"}));
        assert_eq!(decode_message("42"), json!(42));
        assert_eq!(decode_message("plain text"), json!("plain text"));
        assert_eq!(decode_message("{broken"), json!("{broken"));
    }
}
