// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use loki_client::{
    client::Client,
    config::ClientConfig,
    errors::Error,
    headers::HeaderOptions,
    push::PushOptions,
    query::{LabelOptions, QueryOptions, QueryResponse, RangeOptions, SeriesMatch, Time},
    stream::{Labels, StreamBuffer},
};

/// Push and query logs against a Loki-compatible API.
///
/// Connection settings come from LOKI_URL, LOKI_USERNAME, LOKI_PASSWORD,
/// LOKI_TOKEN, LOKI_ORG_ID, LOKI_TIMEOUT_SECS and LOKI_LOG_LEVEL.
#[derive(Debug, Parser)]
#[command(name = "loki-cli", version)]
struct Cli {
    /// Tenant for this invocation, overrides LOKI_ORG_ID
    #[arg(long, global = true)]
    org_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push lines to one stream, stamped with the current time
    Push {
        /// Stream labels as name=value pairs separated by commas
        #[arg(long, value_parser = parse_labels)]
        labels: Labels,
        /// Acknowledge before the insert is durable
        #[arg(long)]
        async_insert: bool,
        /// Retention of the pushed series in days
        #[arg(long)]
        ttl_days: Option<u32>,
        /// Series fingerprint limit for this push
        #[arg(long)]
        fp_limit: Option<u64>,
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Run an instant query
    Query {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Print the response as returned instead of flattened records
        #[arg(long)]
        raw: bool,
    },
    /// Run a range query
    QueryRange {
        query: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        step: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Print the response as returned instead of flattened records
        #[arg(long)]
        raw: bool,
    },
    /// List label names
    Labels {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// List the values of a label
    LabelValues {
        label: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// List series; --match takes a selector or a JSON array of selectors
    Series {
        #[arg(long = "match", required = true)]
        matchers: Vec<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

fn parse_labels(input: &str) -> Result<Labels, String> {
    input
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
            None => Err(format!("expected name=value, got '{pair}'")),
        })
        .collect()
}

/// Numeric input is taken as nanoseconds, anything else is passed through.
fn parse_time(input: Option<String>) -> Option<Time> {
    input.map(|value| match value.parse::<i64>() {
        Ok(nanos) => Time::Nanos(nanos),
        Err(_) => Time::Text(value),
    })
}

fn series_match(matchers: Vec<String>) -> Result<SeriesMatch, Error> {
    if let [single] = matchers.as_slice() {
        if single.trim_start().starts_with('[') {
            let value: Value = serde_json::from_str(single)
                .map_err(|e| Error::InvalidInput(format!("--match is not valid JSON: {e}")))?;
            return SeriesMatch::try_from(value);
        }
    }
    Ok(SeriesMatch::from(matchers))
}

fn response_json(response: QueryResponse) -> Result<Value, Error> {
    match response {
        QueryResponse::Raw(value) => Ok(value),
        QueryResponse::Records(records) => serde_json::to_value(records)
            .map_err(|e| Error::InvalidInput(format!("unable to encode records: {e}"))),
    }
}

async fn run(client: &Client, command: Command, headers: HeaderOptions) -> Result<Value, Error> {
    match command {
        Command::Push {
            labels,
            async_insert,
            ttl_days,
            fp_limit,
            lines,
        } => {
            let mut stream = StreamBuffer::new(labels);
            for line in lines {
                stream.append_now(line);
            }
            let options = PushOptions {
                async_insert,
                ttl_days,
                fp_limit,
                ..headers
            };
            let response = client.push(&mut [&mut stream], &options).await?;
            info!("Pushed {} lines", stream.confirmed().len());
            Ok(response)
        }
        Command::Query {
            query,
            limit,
            start,
            end,
            raw,
        } => {
            let options = QueryOptions {
                limit,
                start: parse_time(start),
                end: parse_time(end),
                parse: !raw,
                headers,
            };
            response_json(client.query(&query, &options).await?)
        }
        Command::QueryRange {
            query,
            start,
            end,
            step,
            limit,
            raw,
        } => {
            let options = RangeOptions {
                step,
                limit,
                parse: !raw,
                headers,
            };
            response_json(
                client
                    .query_range(&query, parse_time(start), parse_time(end), &options)
                    .await?,
            )
        }
        Command::Labels { start, end } => {
            let options = LabelOptions {
                start: parse_time(start),
                end: parse_time(end),
                headers,
            };
            client.labels(&options).await
        }
        Command::LabelValues { label, start, end } => {
            let options = LabelOptions {
                start: parse_time(start),
                end: parse_time(end),
                headers,
            };
            client.label_values(&label, &options).await
        }
        Command::Series {
            matchers,
            start,
            end,
        } => {
            let options = LabelOptions {
                start: parse_time(start),
                end: parse_time(end),
                headers,
            };
            client.series(series_match(matchers)?, &options).await
        }
    }
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", config.log_level);
    let filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let client = match Client::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to create client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let headers = HeaderOptions {
        org_id: cli.org_id,
        ..Default::default()
    };
    match run(&client, cli.command, headers).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(output) => {
                println!("{output}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Unable to print response: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
