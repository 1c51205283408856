// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock API: cookie-issuing login, cookie-checked refresh, and
//! bearer-protected resources.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "s3cret";
pub const REFRESH_COOKIE: &str = "refresh=R1";

pub struct MockApi {
    /// Bearer the resources currently accept.
    pub valid: Mutex<String>,
    /// Token handed out by the next successful refresh.
    pub next_token: Mutex<String>,
    pub refresh_delay: Mutex<Duration>,
    pub refresh_calls: AtomicU32,
    pub resource_calls: AtomicU32,
    pub refresh_saw_bearer: AtomicBool,
    pub refresh_saw_cookie: AtomicBool,
}

impl MockApi {
    /// Simulate expiry: resources now only accept `token`, which the next
    /// refresh issues.
    pub fn rotate(&self, token: &str) {
        *self.valid.lock() = token.to_owned();
        *self.next_token.lock() = token.to_owned();
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

pub async fn spawn_api(valid: &str) -> anyhow::Result<(String, Arc<MockApi>)> {
    let api = Arc::new(MockApi {
        valid: Mutex::new(valid.to_owned()),
        next_token: Mutex::new(valid.to_owned()),
        refresh_delay: Mutex::new(Duration::ZERO),
        refresh_calls: AtomicU32::new(0),
        resource_calls: AtomicU32::new(0),
        refresh_saw_bearer: AtomicBool::new(false),
        refresh_saw_cookie: AtomicBool::new(false),
    });

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/orders/{id}", get(order))
        .with_state(Arc::clone(&api));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((format!("http://{addr}"), api))
}

async fn login(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> Response {
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        let token = api.valid.lock().clone();
        let cookie = format!("{REFRESH_COOKIE}; Path=/; HttpOnly");
        ([(SET_COOKIE, cookie)], Json(json!({ "token": token }))).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" }))).into_response()
    }
}

async fn refresh(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Response {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(AUTHORIZATION) {
        api.refresh_saw_bearer.store(true, Ordering::SeqCst);
    }
    let delay = *api.refresh_delay.lock();
    tokio::time::sleep(delay).await;

    let has_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == REFRESH_COOKIE));
    if !has_cookie {
        return (StatusCode::UNAUTHORIZED, "missing refresh cookie").into_response();
    }
    api.refresh_saw_cookie.store(true, Ordering::SeqCst);
    let token = api.next_token.lock().clone();
    Json(json!({ "accessToken": token })).into_response()
}

async fn order(
    State(api): State<Arc<MockApi>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    api.resource_calls.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", api.valid.lock());
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented == Some(expected.as_str()) {
        Json(json!({ "id": id })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "token expired").into_response()
    }
}
