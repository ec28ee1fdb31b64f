// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request headers derived from per-call options.
//!
//! One mapping is shared by the push and the read paths: `ttl_days` always
//! lands in [`TTL_DAYS`] and `fp_limit` always lands in [`FP_LIMIT`].

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::errors::Error;

pub const ORG_ID: &str = "X-Scope-OrgID";
pub const ASYNC_INSERT: &str = "X-Async-Insert";
pub const TTL_DAYS: &str = "X-Ttl-Days";
pub const FP_LIMIT: &str = "X-Fp-Limit";

/// Options that turn into request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOptions {
    /// Tenant the request is scoped to.
    pub org_id: Option<String>,
    /// Ask the service to acknowledge before the insert is durable.
    pub async_insert: bool,
    /// Retention in days applied to pushed series.
    pub ttl_days: Option<u32>,
    /// Upper bound of fingerprints (series) touched by the request.
    pub fp_limit: Option<u64>,
}

/// Builds the header map for a request. Absent options add nothing.
pub fn build(options: &HeaderOptions) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    if let Some(org_id) = options.org_id.as_deref().filter(|id| !id.is_empty()) {
        insert(&mut headers, ORG_ID, org_id)?;
    }
    if options.async_insert {
        insert(&mut headers, ASYNC_INSERT, "1")?;
    }
    if let Some(ttl_days) = options.ttl_days {
        insert(&mut headers, TTL_DAYS, &ttl_days.to_string())?;
    }
    if let Some(fp_limit) = options.fp_limit {
        insert(&mut headers, FP_LIMIT, &fp_limit.to_string())?;
    }
    Ok(headers)
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid header name {name}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidInput(format!("header {name} has an invalid value: {e}")))?;
    headers.insert(header_name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_empty() {
        let headers = build(&HeaderOptions::default()).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_build_all_options() {
        let headers = build(&HeaderOptions {
            org_id: Some("tenant-a".to_string()),
            async_insert: true,
            ttl_days: Some(7),
            fp_limit: Some(1000),
        })
        .unwrap();

        assert_eq!(headers.get(ORG_ID).unwrap(), "tenant-a");
        assert_eq!(headers.get(ASYNC_INSERT).unwrap(), "1");
        assert_eq!(headers.get(TTL_DAYS).unwrap(), "7");
        assert_eq!(headers.get(FP_LIMIT).unwrap(), "1000");
    }

    #[test]
    fn test_build_skips_empty_org_id() {
        let headers = build(&HeaderOptions {
            org_id: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(!headers.contains_key(ORG_ID));
    }

    #[test]
    fn test_build_rejects_invalid_org_id() {
        let result = build(&HeaderOptions {
            org_id: Some("tenant\nInjected: yes".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
