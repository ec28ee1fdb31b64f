// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Read operations: instant and range queries, label and series discovery.
//!
//! Each operation checks its required arguments before any request is made,
//! appends optional parameters only when they are set, and never mutates local
//! or remote state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error};

use crate::client::Client;
use crate::constants::{
    LABELS_PATH, LABEL_PATH, LABEL_VALUES_SEGMENT, QUERY_PATH, QUERY_RANGE_PATH, SERIES_PATH,
};
use crate::errors::Error;
use crate::headers::HeaderOptions;
use crate::normalize::{normalize, LogRecord};
use crate::transport::{Transport, TransportRequest};

/// A time bound as the service accepts it: nanoseconds since the epoch or a
/// literal such as an RFC3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Time {
    Nanos(i64),
    Text(String),
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Time::Nanos(nanos) => write!(f, "{nanos}"),
            Time::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Time {
    fn from(nanos: i64) -> Self {
        Time::Nanos(nanos)
    }
}

impl From<&str> for Time {
    fn from(text: &str) -> Self {
        Time::Text(text.to_string())
    }
}

impl From<String> for Time {
    fn from(text: String) -> Self {
        Time::Text(text)
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(date: DateTime<Utc>) -> Self {
        match date.timestamp_nanos_opt() {
            Some(nanos) => Time::Nanos(nanos),
            None => Time::Text(date.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<u32>,
    pub start: Option<Time>,
    pub end: Option<Time>,
    /// Return normalized [`LogRecord`]s instead of the raw response.
    pub parse: bool,
    pub headers: HeaderOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RangeOptions {
    /// Resolution step, e.g. `"30s"` or a number of seconds.
    pub step: Option<String>,
    pub limit: Option<u32>,
    /// Return normalized [`LogRecord`]s instead of the raw response.
    pub parse: bool,
    pub headers: HeaderOptions,
}

#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    pub start: Option<Time>,
    pub end: Option<Time>,
    pub headers: HeaderOptions,
}

/// Result of a query: the decoded body, or its flattened records.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Raw(Value),
    Records(Vec<LogRecord>),
}

impl QueryResponse {
    #[must_use]
    pub fn raw(&self) -> Option<&Value> {
        match self {
            QueryResponse::Raw(value) => Some(value),
            QueryResponse::Records(_) => None,
        }
    }

    #[must_use]
    pub fn records(&self) -> Option<&[LogRecord]> {
        match self {
            QueryResponse::Raw(_) => None,
            QueryResponse::Records(records) => Some(records),
        }
    }
}

/// One or more series selectors, e.g. `{job="api"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMatch(Vec<String>);

impl SeriesMatch {
    #[must_use]
    pub fn matchers(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for SeriesMatch {
    fn from(matcher: &str) -> Self {
        SeriesMatch(vec![matcher.to_string()])
    }
}

impl From<String> for SeriesMatch {
    fn from(matcher: String) -> Self {
        SeriesMatch(vec![matcher])
    }
}

impl From<Vec<String>> for SeriesMatch {
    fn from(matchers: Vec<String>) -> Self {
        SeriesMatch(matchers)
    }
}

impl From<&[&str]> for SeriesMatch {
    fn from(matchers: &[&str]) -> Self {
        SeriesMatch(matchers.iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SeriesMatch {
    fn from(matchers: [&str; N]) -> Self {
        SeriesMatch(matchers.iter().map(ToString::to_string).collect())
    }
}

/// Accepts a JSON string or an array of strings.
impl TryFrom<Value> for SeriesMatch {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(Error::MissingParameter("match")),
            Value::String(matcher) => Ok(SeriesMatch(vec![matcher])),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(matcher) => Ok(matcher),
                    other => Err(Error::InvalidInput(format!(
                        "series matchers must be strings, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(SeriesMatch),
            other => Err(Error::InvalidInput(format!(
                "match must be a string or a list of strings, got {other}"
            ))),
        }
    }
}

fn require<'a>(value: &'a str, name: &'static str) -> Result<&'a str, Error> {
    if value.trim().is_empty() {
        return Err(Error::MissingParameter(name));
    }
    Ok(value)
}

impl<T: Transport> Client<T> {
    /// Runs an instant query.
    pub async fn query(&self, query: &str, options: &QueryOptions) -> Result<QueryResponse, Error> {
        let query = require(query, "query")?;

        let mut request =
            TransportRequest::get(QUERY_PATH).with_headers(self.headers(&options.headers)?);
        request.param("query", query);
        request.param_opt("limit", options.limit);
        request.param_opt("start", options.start.as_ref());
        request.param_opt("end", options.end.as_ref());

        let response = self.send(request, "Failed to query logs").await?;
        Ok(shape(response, options.parse))
    }

    /// Runs a range query. `start` and `end` are required; `Some(0)` is a
    /// valid bound.
    pub async fn query_range(
        &self,
        query: &str,
        start: Option<Time>,
        end: Option<Time>,
        options: &RangeOptions,
    ) -> Result<QueryResponse, Error> {
        let query = require(query, "query")?;
        let start = start.ok_or(Error::MissingParameter("start"))?;
        let end = end.ok_or(Error::MissingParameter("end"))?;

        let mut request =
            TransportRequest::get(QUERY_RANGE_PATH).with_headers(self.headers(&options.headers)?);
        request.param("query", query);
        request.param("start", start);
        request.param("end", end);
        request.param_opt("step", options.step.as_deref());
        request.param_opt("limit", options.limit);

        let response = self.send(request, "Failed to query log range").await?;
        Ok(shape(response, options.parse))
    }

    /// Lists label names.
    pub async fn labels(&self, options: &LabelOptions) -> Result<Value, Error> {
        let request = bounded(TransportRequest::get(LABELS_PATH), options)
            .with_headers(self.headers(&options.headers)?);
        self.send(request, "Failed to fetch labels").await
    }

    /// Lists the values of one label. The name is sent as a single encoded
    /// path segment.
    pub async fn label_values(&self, label: &str, options: &LabelOptions) -> Result<Value, Error> {
        let label = require(label, "label")?;

        let request = TransportRequest::get(LABEL_PATH)
            .with_segment(label)
            .with_segment(LABEL_VALUES_SEGMENT);
        let request = bounded(request, options).with_headers(self.headers(&options.headers)?);
        self.send(request, "Failed to fetch label values").await
    }

    /// Lists series matching any of `matchers`, sent as repeated `match[]`.
    pub async fn series(
        &self,
        matchers: impl Into<SeriesMatch>,
        options: &LabelOptions,
    ) -> Result<Value, Error> {
        let matchers = matchers.into();
        if matchers.0.is_empty() || matchers.0.iter().all(|m| m.trim().is_empty()) {
            return Err(Error::MissingParameter("match"));
        }
        if matchers.0.iter().any(|m| m.trim().is_empty()) {
            return Err(Error::InvalidInput("series matchers cannot be empty".to_string()));
        }

        let mut request = TransportRequest::get(SERIES_PATH);
        for matcher in &matchers.0 {
            request.param("match[]", matcher);
        }
        let request = bounded(request, options).with_headers(self.headers(&options.headers)?);
        self.send(request, "Failed to fetch series").await
    }

    async fn send(&self, request: TransportRequest, context: &str) -> Result<Value, Error> {
        debug!("Reading {} with {} parameters", request.path, request.query.len());
        self.transport().request(request).await.map_err(|e| {
            let error = e.into_error(context);
            error!("{error}");
            error
        })
    }
}

fn bounded(mut request: TransportRequest, options: &LabelOptions) -> TransportRequest {
    request.param_opt("start", options.start.as_ref());
    request.param_opt("end", options.end.as_ref());
    request
}

fn shape(response: Value, parse: bool) -> QueryResponse {
    if parse {
        QueryResponse::Records(normalize(&response))
    } else {
        QueryResponse::Raw(response)
    }
}
