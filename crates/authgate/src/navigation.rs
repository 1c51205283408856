// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth lifecycle events and the "go to login" navigation signal.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Receives the single "go to the unauthenticated landing state" signal.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn to_login(&self) {
        self()
    }
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// Explicit logout.
    UserRequested,
    /// The refresh endpoint rejected or failed the refresh.
    RefreshFailed,
}

/// Events broadcast over the auth lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    LoggedIn,
    TokenRefreshed,
    LoggedOut { reason: LogoutReason },
    NavigateToLogin,
}

/// Navigator that publishes [`AuthEvent::NavigateToLogin`] on a broadcast
/// channel. Having no subscribers is not an error.
#[derive(Clone)]
pub struct EventNavigator {
    event_tx: broadcast::Sender<AuthEvent>,
}

impl EventNavigator {
    pub fn new(event_tx: broadcast::Sender<AuthEvent>) -> Self {
        Self { event_tx }
    }
}

impl Navigator for EventNavigator {
    fn to_login(&self) {
        debug!("navigating to login");
        let _ = self.event_tx.send(AuthEvent::NavigateToLogin);
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
