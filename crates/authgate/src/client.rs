// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The auth context: one object wiring store, coordinator, interceptor and
//! navigator together, built once at startup.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::credential::CredentialStore;
use crate::error::{login_error_message, AuthError};
use crate::flags::RequestFlags;
use crate::interceptor::AuthInterceptor;
use crate::navigation::{AuthEvent, EventNavigator, LogoutReason, Navigator};
use crate::refresh::RefreshCoordinator;
use crate::request::{token_field, ApiRequest, ApiResponse};
use crate::transport::Transport;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Capacity of the auth event channel. Slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// Where the auth endpoints live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_url: String,
    pub login_path: String,
    pub refresh_path: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl Endpoints {
    /// Endpoints under `api_url` with the default auth paths.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
        }
    }

    /// Join `path` onto the base URL without doubling the slash.
    pub fn url(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }

    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }
}

/// Authenticated API client.
pub struct AuthClient<T> {
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    coordinator: Arc<RefreshCoordinator<T>>,
    interceptor: AuthInterceptor<T>,
    event_tx: broadcast::Sender<AuthEvent>,
}

impl<T: Transport> AuthClient<T> {
    pub fn new(
        endpoints: Endpoints,
        transport: Arc<T>,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self::build(endpoints, transport, store, navigator, event_tx)
    }

    /// Client whose navigation signal is published as
    /// [`AuthEvent::NavigateToLogin`] on its own event channel.
    pub fn with_event_navigation(
        endpoints: Endpoints,
        transport: Arc<T>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let navigator = Arc::new(EventNavigator::new(event_tx.clone()));
        Self::build(endpoints, transport, store, navigator, event_tx)
    }

    fn build(
        endpoints: Endpoints,
        transport: Arc<T>,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        event_tx: broadcast::Sender<AuthEvent>,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&navigator),
            endpoints.refresh_url(),
            event_tx.clone(),
        );
        let interceptor =
            AuthInterceptor::new(transport, Arc::clone(&store), Arc::clone(&coordinator));
        Self { endpoints, store, navigator, coordinator, interceptor, event_tx }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        self.endpoints.url(path)
    }

    /// Subscribe to auth lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.event_tx.subscribe()
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<T>> {
        &self.coordinator
    }

    pub fn interceptor(&self) -> &AuthInterceptor<T> {
        &self.interceptor
    }

    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Exchange a username and password for a credential and store it.
    ///
    /// The login call never carries a bearer and a rejection never triggers a
    /// refresh. Cookies the server sets are kept for later refresh calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let request = ApiRequest::post(self.endpoints.login_url())
            .json(&serde_json::json!({ "username": username, "password": password }))
            .map_err(|e| AuthError::Protocol { endpoint: "login", detail: e.to_string() })?
            .with_flags(RequestFlags::anonymous())
            .with_credentials(true);

        let response = self.interceptor.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::LoginRejected {
                status: response.status.as_u16(),
                message: login_error_message(&response.body),
            });
        }

        let token = parse_login_token(&response.body)?;
        self.store.set(&token);
        info!(username, "logged in");
        let _ = self.event_tx.send(AuthEvent::LoggedIn);
        Ok(())
    }

    /// Forget the credential and send the user to login.
    pub fn logout(&self) {
        self.store.clear();
        info!("logged out");
        let _ = self.event_tx.send(AuthEvent::LoggedOut { reason: LogoutReason::UserRequested });
        self.navigator.to_login();
    }

    /// Send a request through the auth pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        self.interceptor.send(request).await
    }

    /// Force a refresh, joining any refresh already in flight.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        self.coordinator.refresh().await
    }
}

/// Extract the credential from a successful login body.
pub fn parse_login_token(body: &[u8]) -> Result<String, AuthError> {
    token_field(body, "login", &["token"])
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
