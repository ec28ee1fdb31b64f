// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_LOG_LEVEL, DEFAULT_TIMEOUT_SECS, DEFAULT_URL, ENV_LOG_LEVEL, ENV_ORG_ID,
    ENV_PASSWORD, ENV_PROXY_HTTPS, ENV_TIMEOUT_SECS, ENV_TOKEN, ENV_URL, ENV_USERNAME,
};
use crate::errors::Error;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const REDACTED: &str = "<redacted>";

/// Credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &password.as_ref().map(|_| REDACTED))
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&REDACTED).finish(),
        }
    }
}

/// Configuration for a [`crate::client::Client`]
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Loki-compatible service
    pub url: String,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Bearer token, exclusive with basic auth
    pub token: Option<String>,
    /// Default tenant sent as `X-Scope-OrgID`
    pub org_id: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("org_id", &self.org_id)
            .field("timeout", &self.timeout)
            .field("https_proxy", &self.https_proxy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            token: None,
            org_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            https_proxy: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, Error> {
        let url = env::var(ENV_URL).unwrap_or_else(|_| DEFAULT_URL.to_string());
        let username = non_empty_var(ENV_USERNAME);
        let password = non_empty_var(ENV_PASSWORD);
        let token = non_empty_var(ENV_TOKEN);
        let org_id = non_empty_var(ENV_ORG_ID);
        let timeout = match env::var(ENV_TIMEOUT_SECS) {
            Ok(val) => {
                let secs = val.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!(
                        "{ENV_TIMEOUT_SECS} must be a number of seconds, got '{val}'"
                    ))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        let https_proxy = non_empty_var(ENV_PROXY_HTTPS).or_else(|| non_empty_var("HTTPS_PROXY"));
        let log_level = env::var(ENV_LOG_LEVEL)
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let config = Self {
            url,
            username,
            password,
            token,
            org_id,
            timeout,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(Error::Config(format!("{ENV_URL} cannot be empty")));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "{ENV_URL} must start with http:// or https://, got '{url}'"
            )));
        }

        if self.timeout.is_zero() {
            return Err(Error::Config("Request timeout must be greater than 0".to_string()));
        }

        if self.token.is_some() && (self.username.is_some() || self.password.is_some()) {
            return Err(Error::Config(format!(
                "{ENV_TOKEN} cannot be combined with {ENV_USERNAME}/{ENV_PASSWORD}"
            )));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(Error::Config(format!("{ENV_PASSWORD} requires {ENV_USERNAME}")));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn auth(&self) -> Option<Auth> {
        if let Some(token) = &self.token {
            return Some(Auth::Bearer(token.clone()));
        }
        self.username.as_ref().map(|username| Auth::Basic {
            username: username.clone(),
            password: self.password.clone(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}
