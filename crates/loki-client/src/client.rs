// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use reqwest::header::HeaderMap;

use crate::config::ClientConfig;
use crate::errors::Error;
use crate::headers::{self, HeaderOptions};
use crate::transport::{HttpTransport, Transport};

/// Entry point for push and read operations.
///
/// Push lives in [`crate::push`], reads in [`crate::query`]. The client is
/// cheap to clone and keeps no per-request state.
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
    transport: Arc<T>,
    org_id: Option<String>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Client {
            transport: Arc::clone(&self.transport),
            org_id: self.org_id.clone(),
        }
    }
}

impl Client<HttpTransport> {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Client {
            transport: Arc::new(HttpTransport::new(config)?),
            org_id: config.org_id.clone(),
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::new(&ClientConfig::from_env()?)
    }
}

impl<T: Transport> Client<T> {
    /// Builds a client over any transport. `org_id` is the default tenant.
    pub fn with_transport(transport: T, org_id: Option<String>) -> Self {
        Client {
            transport: Arc::new(transport),
            org_id,
        }
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Headers for one request; the per-call org id wins over the default.
    pub(crate) fn headers(&self, options: &HeaderOptions) -> Result<HeaderMap, Error> {
        if options.org_id.is_some() || self.org_id.is_none() {
            return headers::build(options);
        }
        headers::build(&HeaderOptions {
            org_id: self.org_id.clone(),
            ..options.clone()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::headers::ORG_ID;
    use crate::transport::{TransportError, TransportRequest};
    use async_trait::async_trait;
    use serde_json::Value;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn request(&self, _request: TransportRequest) -> Result<Value, TransportError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_default_org_id_applies() {
        let client = Client::with_transport(NullTransport, Some("tenant-a".to_string()));
        let headers = client.headers(&HeaderOptions::default()).unwrap();
        assert_eq!(headers.get(ORG_ID).unwrap(), "tenant-a");
    }

    #[test]
    fn test_per_call_org_id_wins() {
        let client = Client::with_transport(NullTransport, Some("tenant-a".to_string()));
        let headers = client
            .headers(&HeaderOptions {
                org_id: Some("tenant-b".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(headers.get(ORG_ID).unwrap(), "tenant-b");
    }

    #[test]
    fn test_new_validates_config() {
        let result = Client::new(&ClientConfig {
            url: String::new(),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
