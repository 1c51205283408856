// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network transport seam and its `reqwest` implementation.

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing::debug;

use crate::error::TransportError;
use crate::request::{ApiRequest, ApiResponse};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes a single request. Implementations must not retry or interpret
/// statuses; every status is returned as an [`ApiResponse`].
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for rustls. Only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP transport with a shared cookie jar.
///
/// Cookies set by the server (e.g. a refresh cookie from login) are kept in
/// the jar for the lifetime of the transport. Requests without
/// `with_credentials` go through a second client that never sends them.
pub struct HttpTransport {
    with_cookies: reqwest::Client,
    without_cookies: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        ensure_crypto();
        let with_cookies = reqwest::Client::builder().timeout(timeout).cookie_store(true).build()?;
        let without_cookies = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { with_cookies, without_cookies })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let client =
            if request.with_credentials { &self.with_cookies } else { &self.without_cookies };
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = client.request(request.method, &request.url).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        debug!(status = status.as_u16(), "received response");
        Ok(ApiResponse { status, headers, body })
    }
}
