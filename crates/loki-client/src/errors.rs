// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Classified errors returned by every public client operation.
//!
//! Callers branch on [`Error::kind`] rather than on message text. Status codes
//! reported by the remote service survive every wrapping step and are exposed
//! through [`Error::status`].

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent or empty.
    MissingParameter,
    /// An argument had the wrong shape or type.
    InvalidInput,
    /// The request could not be completed at the network boundary.
    TransportFailure,
    /// The remote service answered with a non-success status.
    RemoteRejection,
    /// The client configuration is unusable.
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    #[error("Remote service rejected the request with status {status}: {body}")]
    RemoteRejection { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Transport { .. } => ErrorKind::TransportFailure,
            Self::RemoteRejection { .. } => ErrorKind::RemoteRejection,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status code attached to the error, if the remote answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::RemoteRejection { status, .. } => Some(*status),
            _ => None,
        }
    }
}
