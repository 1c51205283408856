// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh.
//!
//! At most one refresh call is outstanding at a time. The first caller that
//! finds the coordinator idle launches the refresh on its own task and parks a
//! `watch` cell in the in-flight slot; every caller (including the first)
//! waits on that cell. The task publishes exactly one outcome and clears the
//! slot under the same lock, so a caller either joins a cell that will
//! receive the outcome or finds the slot empty and starts the next cycle.
//! Dropping a waiting caller only drops its receiver; the refresh carries on
//! for everyone else.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::credential::CredentialStore;
use crate::error::AuthError;
use crate::flags::RequestFlags;
use crate::navigation::{AuthEvent, LogoutReason, Navigator};
use crate::request::{token_field, ApiRequest};
use crate::transport::Transport;

type Outcome = Result<String, AuthError>;

/// Receiving half of one refresh cycle's result. `None` until settled.
type OutcomeCell = watch::Receiver<Option<Outcome>>;

/// Serializes refresh attempts and fans the outcome out to all waiters.
pub struct RefreshCoordinator<T> {
    transport: Arc<T>,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    event_tx: broadcast::Sender<AuthEvent>,
    refresh_url: String,
    in_flight: Mutex<Option<OutcomeCell>>,
}

impl<T: Transport> RefreshCoordinator<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        refresh_url: impl Into<String>,
        event_tx: broadcast::Sender<AuthEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            store,
            navigator,
            event_tx,
            refresh_url: refresh_url.into(),
            in_flight: Mutex::new(None),
        })
    }

    /// Obtain a fresh credential, joining the in-flight refresh if there is
    /// one.
    ///
    /// On success the new token is already persisted. On failure the store is
    /// already cleared and the navigator signalled; every joined caller gets
    /// the same error.
    pub async fn refresh(self: &Arc<Self>) -> Result<String, AuthError> {
        let mut cell = self.join_or_start();
        let settled = cell.wait_for(Option::is_some).await.map_err(|_| AuthError::RefreshAborted)?;
        settled.clone().unwrap_or(Err(AuthError::RefreshAborted))
    }

    /// Whether a refresh call is currently outstanding.
    pub fn refresh_in_progress(&self) -> bool {
        self.in_flight.lock().as_ref().is_some_and(|cell| cell.has_changed().is_ok())
    }

    /// Check the slot and, if idle, claim it, in one critical section.
    fn join_or_start(self: &Arc<Self>) -> OutcomeCell {
        let mut slot = self.in_flight.lock();
        if let Some(cell) = slot.as_ref() {
            // A closed cell means the refresh task died without publishing.
            if cell.has_changed().is_ok() {
                debug!("joining in-flight token refresh");
                return cell.clone();
            }
            warn!("previous token refresh ended without a result, starting a new one");
        }

        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());
        drop(slot);

        debug!(url = %self.refresh_url, "starting token refresh");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(tx).await;
        });
        rx
    }

    async fn run(&self, tx: watch::Sender<Option<Outcome>>) {
        let outcome = self.request_token().await;
        match &outcome {
            Ok(token) => {
                self.store.set(token);
                info!("credential refreshed");
                let _ = self.event_tx.send(AuthEvent::TokenRefreshed);
            }
            Err(e) => {
                warn!(err = %e, "token refresh failed, logging out");
                self.store.clear();
                let _ = self
                    .event_tx
                    .send(AuthEvent::LoggedOut { reason: LogoutReason::RefreshFailed });
                self.navigator.to_login();
            }
        }

        let mut slot = self.in_flight.lock();
        *slot = None;
        tx.send_replace(Some(outcome));
    }

    async fn request_token(&self) -> Outcome {
        let request = ApiRequest::post(&self.refresh_url)
            .json(&serde_json::json!({}))
            .map_err(|e| AuthError::Protocol { endpoint: "refresh", detail: e.to_string() })?
            .with_flags(RequestFlags::anonymous())
            .with_credentials(true);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::RefreshRejected {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }
        parse_refresh_token(&response.body)
    }
}

/// Keys a refresh response may carry the new credential under, in order.
const REFRESH_TOKEN_KEYS: [&str; 3] = ["token", "accessToken", "access_token"];

/// Extract the new credential from a refresh response body.
pub fn parse_refresh_token(body: &[u8]) -> Result<String, AuthError> {
    token_field(body, "refresh", &REFRESH_TOKEN_KEYS)
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
