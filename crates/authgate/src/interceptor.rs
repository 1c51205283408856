// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request gate around the transport: attach, observe, refresh, retry once.

use std::sync::Arc;

use tracing::debug;

use crate::credential::CredentialStore;
use crate::error::AuthError;
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

/// Wraps every outgoing request with bearer attachment and 401 recovery.
pub struct AuthInterceptor<T> {
    transport: Arc<T>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T> Clone for AuthInterceptor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<T: Transport> AuthInterceptor<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<dyn CredentialStore>,
        coordinator: Arc<RefreshCoordinator<T>>,
    ) -> Self {
        Self { transport, store, coordinator }
    }

    /// Send `request`, recovering from one authentication failure.
    ///
    /// Every status other than 401 passes through as `Ok`. A 401 on a
    /// request flagged `skip_refresh` or `retried` is returned unchanged.
    /// Otherwise the request is resubmitted exactly once with the refreshed
    /// credential and the resubmission's result is returned as-is. If the
    /// refresh itself fails, its error replaces the 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let outgoing = self.authorize(request.clone())?;
        let response = self.transport.send(outgoing).await?;

        if !response.is_auth_failure() {
            return Ok(response);
        }
        if !request.flags.can_recover() {
            debug!(url = %request.url, flags = ?request.flags, "401 not recoverable, passing through");
            return Ok(response);
        }

        debug!(url = %request.url, "401 received, refreshing credential");
        let token = self.coordinator.refresh().await?;

        let flags = request.flags.mark_retried();
        let retry = request.with_flags(flags).bearer(&token)?;
        debug!(url = %retry.url, "retrying with refreshed credential");
        Ok(self.transport.send(retry).await?)
    }

    /// Attach the stored credential unless the request opts out.
    fn authorize(&self, request: ApiRequest) -> Result<ApiRequest, AuthError> {
        if request.flags.skip_auth {
            return Ok(request);
        }
        match self.store.get() {
            Some(token) => request.bearer(&token),
            None => Ok(request),
        }
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
