// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Network boundary of the client.
//!
//! Operations hand a [`TransportRequest`] to a [`Transport`] and get back the
//! decoded JSON body. [`HttpTransport`] is the reqwest implementation used in
//! production; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::{Auth, ClientConfig};
use crate::errors::Error;

/// A request relative to the service base URL.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    /// Segments appended after `path`, each percent-encoded as one segment.
    pub segments: Vec<String>,
    pub headers: HeaderMap,
    /// Query parameters in order. Keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        TransportRequest {
            method: Method::GET,
            path: path.into(),
            segments: Vec::new(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        TransportRequest {
            method: Method::POST,
            path: path.into(),
            segments: Vec::new(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter; repeated keys are kept.
    pub fn param(&mut self, key: &str, value: impl ToString) {
        self.query.push((key.to_string(), value.to_string()));
    }

    /// Appends a query parameter only when `value` is present.
    pub fn param_opt<V: ToString>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.param(key, value);
        }
    }
}

/// Failure reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Already carries a client classification; operations pass it through.
    #[error(transparent)]
    Classified(#[from] Error),

    /// Raw failure; operations wrap it with their own message.
    #[error("{source}")]
    Unclassified {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        status: Option<u16>,
    },
}

impl TransportError {
    pub fn unclassified<E>(source: E, status: Option<u16>) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Unclassified {
            source: source.into(),
            status,
        }
    }

    /// Converts into a client error, prefixing unclassified failures with
    /// `context` and keeping their status code.
    #[must_use]
    pub fn into_error(self, context: &str) -> Error {
        match self {
            TransportError::Classified(error) => error,
            TransportError::Unclassified { source, status } => Error::Transport {
                message: format!("{context}: {source}"),
                status,
            },
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the decoded JSON response body.
    /// An empty body decodes to [`Value::Null`].
    async fn request(&self, request: TransportRequest) -> Result<Value, TransportError>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    auth: Option<Auth>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("invalid URL {}: {e}", config.url)))?;
        let client = build_client(config.timeout, config.https_proxy.as_deref())
            .map_err(|e| Error::Config(format!("unable to build HTTP client: {e}")))?;
        Ok(HttpTransport {
            client,
            base_url,
            auth: config.auth(),
        })
    }

    fn url(&self, path: &str, segments: &[String]) -> Url {
        // Keep any path prefix of the base URL, e.g. a reverse proxy mount point
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        if let Ok(mut path_segments) = url.path_segments_mut() {
            path_segments.extend(segments);
        }
        url
    }
}

fn build_client(
    timeout: Duration,
    https_proxy: Option<&str>,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));
    if let Some(proxy) = https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let url = self.url(&request.path, &request.segments);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .query(&request.query);
        builder = match &self.auth {
            Some(Auth::Basic { username, password }) => {
                builder.basic_auth(username, password.as_deref())
            }
            Some(Auth::Bearer(token)) => builder.bearer_auth(token),
            None => builder,
        };
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        let response = builder.send().await.map_err(|e| {
            debug!("Request failed before a response arrived: {e}");
            let status = e.status().map(|s| s.as_u16());
            TransportError::unclassified(e, status)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::unclassified(e, Some(status.as_u16())))?;

        if !status.is_success() {
            debug!("{}: remote rejected request: {:?}", status, body);
            return Err(Error::RemoteRejection {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| TransportError::unclassified(e, Some(status.as_u16())))
    }
}
