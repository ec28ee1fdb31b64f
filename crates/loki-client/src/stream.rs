// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered log streams with transactional confirm/undo.
//!
//! A [`StreamBuffer`] accumulates entries for one label set. A push hands the
//! buffer's [`CollectedStream`] to the service and then finalizes the buffer:
//! [`LogStream::confirm`] after a successful send, [`LogStream::undo`] after a
//! failed one. Until one of those runs, `collect` is free of side effects and
//! can be called any number of times.
//!
//! # Wire shape
//!
//! ```json
//! {"stream": {"job": "api"}, "values": [["1700000000000000000", "line", {"trace_id": "abc"}]]}
//! ```

use std::collections::BTreeMap;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use tracing::trace;

/// Label names mapped to label values.
pub type Labels = BTreeMap<String, String>;

/// Structured metadata attached to a single entry.
pub type Metadata = BTreeMap<String, String>;

/// Whether `name` is usable as a label name: `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
    pub line: String,
    pub metadata: Option<Metadata>,
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.metadata.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        // Loki expects nanosecond timestamps as strings
        seq.serialize_element(&self.timestamp_ns.to_string())?;
        seq.serialize_element(&self.line)?;
        if let Some(metadata) = &self.metadata {
            seq.serialize_element(metadata)?;
        }
        seq.end()
    }
}

/// Wire-ready snapshot of a stream's pending entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedStream {
    #[serde(rename = "stream")]
    pub labels: Labels,
    #[serde(rename = "values")]
    pub entries: Vec<Entry>,
}

/// Anything a push transaction can drain.
///
/// `confirm` and `undo` are infallible: once the network call has resolved the
/// transaction must be able to finalize every participant.
pub trait LogStream {
    /// Snapshot of the pending entries. Must not mutate the stream.
    fn collect(&self) -> CollectedStream;

    /// The collected entries were accepted by the service.
    fn confirm(&mut self);

    /// The collected entries were not accepted; keep them pending.
    fn undo(&mut self);
}

impl<T: LogStream + ?Sized> LogStream for &mut T {
    fn collect(&self) -> CollectedStream {
        (**self).collect()
    }

    fn confirm(&mut self) {
        (**self).confirm();
    }

    fn undo(&mut self) {
        (**self).undo();
    }
}

impl<T: LogStream + ?Sized> LogStream for Box<T> {
    fn collect(&self) -> CollectedStream {
        (**self).collect()
    }

    fn confirm(&mut self) {
        (**self).confirm();
    }

    fn undo(&mut self) {
        (**self).undo();
    }
}

/// Outcome of the last push the buffer took part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Fresh, or appended to since the last push.
    Open,
    Confirmed,
    Undone,
}

#[derive(Debug, Clone)]
pub struct StreamBuffer {
    labels: Labels,
    pending: Vec<Entry>,
    confirmed: Vec<Entry>,
    state: BufferState,
}

impl StreamBuffer {
    #[must_use]
    pub fn new(labels: Labels) -> Self {
        StreamBuffer {
            labels,
            pending: Vec::new(),
            confirmed: Vec::new(),
            state: BufferState::Open,
        }
    }

    /// Creates a buffer from `(name, value)` pairs. Later duplicates win.
    pub fn with_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn append(
        &mut self,
        timestamp_ns: i64,
        line: impl Into<String>,
        metadata: Option<Metadata>,
    ) {
        self.pending.push(Entry {
            timestamp_ns,
            line: line.into(),
            metadata,
        });
        self.state = BufferState::Open;
    }

    /// Appends a line stamped with the current wall clock.
    pub fn append_now(&mut self, line: impl Into<String>) {
        let now = chrono::Utc::now();
        // Out of the i64 nanosecond range only after the year 2262
        let timestamp_ns = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_millis().saturating_mul(1_000_000));
        self.append(timestamp_ns, line, None);
    }

    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    #[must_use]
    pub fn pending(&self) -> &[Entry] {
        &self.pending
    }

    #[must_use]
    pub fn confirmed(&self) -> &[Entry] {
        &self.confirmed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Drops the confirmed history and returns the buffer to [`BufferState::Open`].
    pub fn reset(&mut self) {
        self.confirmed.clear();
        self.state = BufferState::Open;
    }
}

impl LogStream for StreamBuffer {
    fn collect(&self) -> CollectedStream {
        CollectedStream {
            labels: self.labels.clone(),
            entries: self.pending.clone(),
        }
    }

    fn confirm(&mut self) {
        trace!("Confirming {} entries for {:?}", self.pending.len(), self.labels);
        self.confirmed.append(&mut self.pending);
        self.state = BufferState::Confirmed;
    }

    fn undo(&mut self) {
        trace!("Keeping {} entries pending for {:?}", self.pending.len(), self.labels);
        self.state = BufferState::Undone;
    }
}
