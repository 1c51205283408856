// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted transport, navigator spy, assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::sync::broadcast;

use crate::credential::{CredentialStore, MemoryCredentialStore};
use crate::error::TransportError;
use crate::interceptor::AuthInterceptor;
use crate::navigation::{AuthEvent, Navigator};
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

/// Base URL used by scripted transports.
pub const TEST_API: &str = "http://api.test";

/// Refresh endpoint path used by scripted transports.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Login endpoint path used by scripted transports.
pub const LOGIN_PATH: &str = "/auth/login";

pub fn test_url(path: &str) -> String {
    format!("{TEST_API}{path}")
}

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// In-process transport that answers from a closure and records every request.
pub struct MockTransport {
    handler: Box<Handler>,
    delays: HashMap<String, Duration>,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Box::new(handler), delays: HashMap::new(), log: Mutex::new(Vec::new()) }
    }

    /// An API where every path except the refresh endpoint requires
    /// `Bearer <valid_token>`, and the refresh endpoint answers `refresh_reply`.
    pub fn token_api(valid_token: &str, refresh_reply: ApiResponse) -> Self {
        let valid = valid_token.to_owned();
        Self::new(move |req| {
            if req.path() == REFRESH_PATH {
                return Ok(refresh_reply.clone());
            }
            if req.bearer_token() == Some(valid.as_str()) {
                Ok(ApiResponse::json_body(
                    StatusCode::OK,
                    &serde_json::json!({ "path": req.path() }),
                ))
            } else {
                Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "expired"))
            }
        })
    }

    /// Delay responses for `path` (applied before the handler runs).
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_owned(), delay);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.log.lock().iter().filter(|r| r.path() == path).cloned().collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.log.lock().iter().filter(|r| r.path() == path).count()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.lock().push(request.clone());
        if let Some(delay) = self.delays.get(request.path()) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(&request)
    }
}

/// Counts navigation signals.
#[derive(Default)]
pub struct RecordingNavigator {
    calls: AtomicU32,
}

impl RecordingNavigator {
    pub fn count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wired pipeline over a [`MockTransport`] and an in-memory store.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub coordinator: Arc<RefreshCoordinator<MockTransport>>,
    pub interceptor: AuthInterceptor<MockTransport>,
    pub events: broadcast::Receiver<AuthEvent>,
}

impl Harness {
    pub fn new(transport: MockTransport, token: Option<&str>) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(match token {
            Some(t) => MemoryCredentialStore::with_token(t),
            None => MemoryCredentialStore::new(),
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let (event_tx, events) = broadcast::channel(64);
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            test_url(REFRESH_PATH),
            event_tx,
        );
        let interceptor = AuthInterceptor::new(
            Arc::clone(&transport),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            Arc::clone(&coordinator),
        );
        Self { transport, store, navigator, coordinator, interceptor, events }
    }

    /// Drain all events broadcast so far.
    pub fn drain_events(&mut self) -> Vec<AuthEvent> {
        let mut out = Vec::new();
        while let Ok(e) = self.events.try_recv() {
            out.push(e);
        }
        out
    }
}

/// Assert that an expression returns `Err` whose `to_string()` contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
