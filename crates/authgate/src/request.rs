// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request and response values passed through the pipeline.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AuthError;
use crate::flags::RequestFlags;

/// An outgoing request. Cloning is cheap (the body is reference counted).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub flags: RequestFlags,
    /// Send cookies / ambient credentials along with the request.
    pub with_credentials: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            flags: RequestFlags::default(),
            with_credentials: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Return a copy carrying `Authorization: Bearer <token>`.
    pub fn bearer(mut self, token: &str) -> Result<Self, AuthError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// The bearer token currently attached, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
    }

    /// URL path without scheme, authority or query.
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(i) => &self.url[i + 3..],
            None => self.url.as_str(),
        };
        let path = match rest.find('/') {
            Some(i) => &rest[i..],
            None => "/",
        };
        path.split(['?', '#']).next().unwrap_or(path)
    }
}

/// A response from the transport. Non-2xx statuses are values, not errors.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    /// Build a JSON response (used by scripted transports).
    pub fn json_body(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut resp = Self::new(status, value.to_string());
        resp.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The server rejected the credential as missing, invalid or expired.
    pub fn is_auth_failure(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Read the first non-empty string stored under one of `keys` in a JSON
/// object body. Any other top-level shape is a protocol error.
pub(crate) fn token_field(
    body: &[u8],
    endpoint: &'static str,
    keys: &[&str],
) -> Result<String, AuthError> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| AuthError::Protocol { endpoint, detail: e.to_string() })?;
    keys.iter()
        .filter_map(|key| object.get(*key)?.as_str())
        .find(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AuthError::Protocol {
            endpoint,
            detail: format!("missing {}", keys.join(", ")),
        })
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
