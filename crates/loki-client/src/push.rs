// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Atomic push of a set of log streams.
//!
//! ```text
//!   streams ──collect──> validate ──> {"streams": [...]} ──POST──> service
//!                                                              │
//!                      every stream <── confirm (ok) / undo (err)
//! ```
//!
//! Exactly one request is sent per push, even when nothing is pending. No
//! stream is touched until that request has resolved, and then every stream
//! is finalized the same way.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::client::Client;
use crate::constants::PUSH_PATH;
use crate::errors::Error;
use crate::headers::HeaderOptions;
use crate::stream::{is_valid_label_name, CollectedStream, LogStream};
use crate::transport::{Transport, TransportRequest};

/// Options of a push: tenant, async insert, retention.
pub type PushOptions = HeaderOptions;

#[derive(Serialize)]
struct PushPayload<'a> {
    streams: &'a [CollectedStream],
}

impl<T: Transport> Client<T> {
    /// Pushes the pending entries of `streams` in a single request.
    ///
    /// On success every stream is confirmed and the decoded response is
    /// returned. On failure every stream is undone, keeping its entries
    /// pending for a later attempt. Invalid labels fail before any request
    /// is made and leave the streams untouched.
    pub async fn push<S: LogStream>(
        &self,
        streams: &mut [S],
        options: &PushOptions,
    ) -> Result<Value, Error> {
        let collected: Vec<CollectedStream> = streams
            .iter()
            .map(|stream| stream.collect())
            .filter(|stream| !stream.entries.is_empty())
            .collect();
        collected.iter().try_for_each(validate_stream)?;

        let body = serde_json::to_vec(&PushPayload {
            streams: &collected,
        })
        .map_err(|e| Error::InvalidInput(format!("unable to serialize push payload: {e}")))?;
        let request = TransportRequest::post(PUSH_PATH, body).with_headers(self.headers(options)?);

        let n_entries: usize = collected.iter().map(|s| s.entries.len()).sum();
        debug!(
            "Pushing {} entries in {} streams ({} skipped as empty)",
            n_entries,
            collected.len(),
            streams.len() - collected.len()
        );

        match self.transport().request(request).await {
            Ok(response) => {
                streams.iter_mut().for_each(LogStream::confirm);
                debug!("Pushed {n_entries} entries");
                Ok(response)
            }
            Err(e) => {
                streams.iter_mut().for_each(LogStream::undo);
                let error = e.into_error("Failed to push logs");
                error!("{error}. {n_entries} entries kept pending");
                Err(error)
            }
        }
    }
}

fn validate_stream(stream: &CollectedStream) -> Result<(), Error> {
    if stream.labels.is_empty() {
        return Err(Error::InvalidInput(
            "a stream with entries must have at least one label".to_string(),
        ));
    }
    if let Some(name) = stream.labels.keys().find(|name| !is_valid_label_name(name)) {
        return Err(Error::InvalidInput(format!("invalid label name '{name}'")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::headers::{ASYNC_INSERT, ORG_ID, TTL_DAYS};
    use crate::stream::{BufferState, StreamBuffer};
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    /// Records every request and answers with a canned outcome.
    #[derive(Clone)]
    struct RecordingTransport {
        requests: Arc<Mutex<Vec<TransportRequest>>>,
        fail_with: Option<Option<u16>>,
    }

    impl RecordingTransport {
        fn ok() -> Self {
            RecordingTransport {
                requests: Arc::new(Mutex::new(Vec::new())),
                fail_with: None,
            }
        }

        fn failing(status: Option<u16>) -> Self {
            RecordingTransport {
                fail_with: Some(status),
                ..Self::ok()
            }
        }

        fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn request(&self, request: TransportRequest) -> Result<Value, TransportError> {
            self.requests.lock().unwrap().push(request);
            match self.fail_with {
                None => Ok(Value::Null),
                Some(status) => Err(TransportError::unclassified("connection reset", status)),
            }
        }
    }

    fn body_of(request: &TransportRequest) -> Value {
        serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
    }

    fn stream(job: &str, lines: &[&str]) -> StreamBuffer {
        let mut stream = StreamBuffer::with_labels([("job", job)]);
        for (i, line) in lines.iter().enumerate() {
            stream.append(i64::try_from(i).unwrap() + 1, *line, None);
        }
        stream
    }

    #[tokio::test]
    async fn test_push_confirms_all_streams() {
        let transport = RecordingTransport::ok();
        let client = Client::with_transport(transport.clone(), None);
        let mut streams = vec![
            stream("a", &["one", "two"]),
            stream("b", &[]),
            stream("c", &["three"]),
        ];

        client.push(&mut streams, &PushOptions::default()).await.unwrap();

        assert!(streams.iter().all(|s| s.state() == BufferState::Confirmed));
        assert!(streams.iter().all(StreamBuffer::is_empty));
        assert_eq!(streams[0].confirmed().len(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, PUSH_PATH);
        assert_eq!(requests[0].method, reqwest::Method::POST);
        assert_eq!(
            body_of(&requests[0]),
            json!({"streams": [
                {"stream": {"job": "a"}, "values": [["1", "one"], ["2", "two"]]},
                {"stream": {"job": "c"}, "values": [["1", "three"]]}
            ]})
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_failure_undoes_all_streams() {
        let transport = RecordingTransport::failing(Some(503));
        let client = Client::with_transport(transport.clone(), None);
        let mut streams = vec![stream("a", &["one"]), stream("b", &[])];
        let before: Vec<_> = streams.iter().map(LogStream::collect).collect();

        let err = client
            .push(&mut streams, &PushOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().starts_with("Failed to push logs"));
        assert!(streams.iter().all(|s| s.state() == BufferState::Undone));
        let after: Vec<_> = streams.iter().map(LogStream::collect).collect();
        assert_eq!(before, after);
        assert!(logs_contain("entries kept pending"));
    }

    #[tokio::test]
    async fn test_push_classified_error_passes_through() {
        struct Rejecting;

        #[async_trait]
        impl Transport for Rejecting {
            async fn request(&self, _request: TransportRequest) -> Result<Value, TransportError> {
                Err(Error::RemoteRejection {
                    status: 400,
                    body: "entry too far behind".to_string(),
                }
                .into())
            }
        }

        let client = Client::with_transport(Rejecting, None);
        let mut streams = [stream("a", &["one"])];
        let err = client
            .push(&mut streams, &PushOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteRejection);
        assert_eq!(err.status(), Some(400));
        assert_eq!(streams[0].state(), BufferState::Undone);
        assert_eq!(streams[0].len(), 1);
    }

    #[tokio::test]
    async fn test_push_empty_input_still_sends() {
        let transport = RecordingTransport::ok();
        let client = Client::with_transport(transport.clone(), None);

        let mut none: [StreamBuffer; 0] = [];
        client.push(&mut none, &PushOptions::default()).await.unwrap();

        let mut empty = [stream("a", &[]), stream("b", &[])];
        client.push(&mut empty, &PushOptions::default()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(body_of(&requests[0]), json!({"streams": []}));
        assert_eq!(body_of(&requests[1]), json!({"streams": []}));
        assert!(empty.iter().all(|s| s.state() == BufferState::Confirmed));
    }

    #[tokio::test]
    async fn test_push_invalid_labels_fail_before_sending() {
        let transport = RecordingTransport::ok();
        let client = Client::with_transport(transport.clone(), None);

        let mut unlabeled = StreamBuffer::new(Default::default());
        unlabeled.append(1, "orphan", None);
        let mut streams = [stream("a", &["one"]), unlabeled];
        let err = client
            .push(&mut streams, &PushOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut bad_name = StreamBuffer::with_labels([("service-name", "api")]);
        bad_name.append(1, "line", None);
        let err = client
            .push(&mut [bad_name], &PushOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(transport.requests().is_empty());
        assert!(streams.iter().all(|s| s.state() == BufferState::Open));
    }

    #[tokio::test]
    async fn test_push_headers() {
        let transport = RecordingTransport::ok();
        let client = Client::with_transport(transport.clone(), Some("default".to_string()));
        let mut streams = [stream("a", &["one"])];

        client
            .push(
                &mut streams,
                &PushOptions {
                    async_insert: true,
                    ttl_days: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let headers = &transport.requests()[0].headers;
        assert_eq!(headers.get(ORG_ID).unwrap(), "default");
        assert_eq!(headers.get(ASYNC_INSERT).unwrap(), "1");
        assert_eq!(headers.get(TTL_DAYS).unwrap(), "30");
    }

    #[tokio::test]
    async fn test_push_heterogeneous_streams() {
        let transport = RecordingTransport::ok();
        let client = Client::with_transport(transport.clone(), None);
        let mut a = stream("a", &["one"]);
        let mut b = stream("b", &["two"]);

        {
            let mut borrowed: Vec<Box<dyn LogStream + Send>> =
                vec![Box::new(stream("boxed", &["three"]))];
            client.push(&mut borrowed, &PushOptions::default()).await.unwrap();
        }
        client
            .push(&mut [&mut a, &mut b], &PushOptions::default())
            .await
            .unwrap();

        assert_eq!(a.state(), BufferState::Confirmed);
        assert_eq!(b.state(), BufferState::Confirmed);
        assert_eq!(transport.requests().len(), 2);
    }
}
