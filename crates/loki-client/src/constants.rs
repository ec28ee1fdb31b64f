// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub const PUSH_PATH: &str = "/loki/api/v1/push";
pub const QUERY_PATH: &str = "/loki/api/v1/query";
pub const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";
pub const LABELS_PATH: &str = "/loki/api/v1/labels";
pub const SERIES_PATH: &str = "/loki/api/v1/series";

/// Prefix of the per-label endpoints: `{LABEL_PATH}/<name>/values`.
pub const LABEL_PATH: &str = "/loki/api/v1/label";
pub const LABEL_VALUES_SEGMENT: &str = "values";

pub const DEFAULT_URL: &str = "http://localhost:3100";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_URL: &str = "LOKI_URL";
pub const ENV_USERNAME: &str = "LOKI_USERNAME";
pub const ENV_PASSWORD: &str = "LOKI_PASSWORD";
pub const ENV_TOKEN: &str = "LOKI_TOKEN";
pub const ENV_ORG_ID: &str = "LOKI_ORG_ID";
pub const ENV_TIMEOUT_SECS: &str = "LOKI_TIMEOUT_SECS";
pub const ENV_PROXY_HTTPS: &str = "LOKI_PROXY_HTTPS";
pub const ENV_LOG_LEVEL: &str = "LOKI_LOG_LEVEL";
