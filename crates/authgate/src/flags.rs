// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Per-request markers consumed by the [`AuthInterceptor`](crate::AuthInterceptor).
///
/// Flags are a plain `Copy` value carried by each request. The retried clone
/// of a request gets a new value built with [`RequestFlags::mark_retried`];
/// nothing mutates flags in place.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestFlags {
    /// Never attach a bearer credential (anonymous calls, the refresh call).
    pub skip_auth: bool,
    /// Never attempt refresh recovery on a 401 (the refresh call itself).
    pub skip_refresh: bool,
    /// This request is already the single permitted resubmission.
    pub retried: bool,
}

impl RequestFlags {
    /// Flags for an anonymous request that must not trigger a refresh.
    pub const fn anonymous() -> Self {
        Self { skip_auth: true, skip_refresh: true, retried: false }
    }

    pub const fn with_skip_auth(self) -> Self {
        Self { skip_auth: true, ..self }
    }

    pub const fn with_skip_refresh(self) -> Self {
        Self { skip_refresh: true, ..self }
    }

    pub const fn mark_retried(self) -> Self {
        Self { retried: true, ..self }
    }

    /// Whether a 401 on this request may be recovered by refresh-and-retry.
    pub const fn can_recover(&self) -> bool {
        !self.skip_refresh && !self.retried
    }
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
