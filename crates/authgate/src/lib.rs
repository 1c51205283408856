// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side auth pipeline: bearer attachment, single-flight token refresh,
//! and retry-once recovery for expired credentials.

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod flags;
pub mod guard;
pub mod interceptor;
pub mod navigation;
pub mod refresh;
pub mod request;
pub mod test_support;
pub mod transport;

pub use client::{AuthClient, Endpoints};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{AuthError, TransportError};
pub use flags::RequestFlags;
pub use interceptor::AuthInterceptor;
pub use navigation::{AuthEvent, LogoutReason, Navigator};
pub use refresh::RefreshCoordinator;
pub use request::{ApiRequest, ApiResponse};
pub use transport::{HttpTransport, Transport};
