// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for log services exposing a Loki-compatible HTTP API.
//!
//! - **Push**: buffer entries in [`stream::StreamBuffer`]s and push them with
//!   [`client::Client::push`]. A push confirms every buffer or undoes every
//!   buffer, never a mix.
//! - **Read**: instant and range queries, label and series discovery. Query
//!   responses can be flattened into [`normalize::LogRecord`]s.
//!
//! ```rust,no_run
//! use loki_client::client::Client;
//! use loki_client::push::PushOptions;
//! use loki_client::stream::StreamBuffer;
//!
//! # async fn run() -> Result<(), loki_client::errors::Error> {
//! let client = Client::from_env()?;
//! let mut stream = StreamBuffer::with_labels([("job", "billing")]);
//! stream.append_now("invoice sent");
//! client.push(&mut [&mut stream], &PushOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod config;
pub mod constants;
pub mod errors;
pub mod headers;
pub mod normalize;
pub mod push;
pub mod query;
pub mod stream;
pub mod transport;
