// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Deserialize;

/// Fallback shown when a rejected login carries no usable message.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// Failure to get any response from the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Errors surfaced by the auth pipeline.
///
/// `Clone` because a single refresh outcome is handed to every request that
/// joined it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("token refresh rejected ({status}): {body}")]
    RefreshRejected { status: u16, body: String },
    #[error("token refresh ended without a result")]
    RefreshAborted,
    #[error("{message}")]
    LoginRejected { status: u16, message: String },
    #[error("unexpected response from {endpoint}: {detail}")]
    Protocol { endpoint: &'static str, detail: String },
    #[error("credential cannot be sent as a header: {0}")]
    InvalidHeader(String),
}

impl AuthError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::RefreshRejected { .. } => "REFRESH_REJECTED",
            Self::RefreshAborted => "REFRESH_ABORTED",
            Self::LoginRejected { .. } => "LOGIN_REJECTED",
            Self::Protocol { .. } => "PROTOCOL",
            Self::InvalidHeader(_) => "INVALID_HEADER",
        }
    }
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
}

/// Extract the user-facing message from a rejected login body.
///
/// Uses the payload's `message` field when present and non-empty, otherwise
/// [`LOGIN_FAILED_MESSAGE`].
pub fn login_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorPayload>(body)
        .ok()
        .and_then(|p| p.message)
        .map(|m| m.trim().to_owned())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_owned())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
