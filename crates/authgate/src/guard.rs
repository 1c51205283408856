// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route guards: allow or redirect based on whether a credential is held.

use crate::credential::CredentialStore;

/// Landing routes the guards redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Gate for pages that need a session.
pub fn can_activate(store: &dyn CredentialStore) -> Decision {
    if store.is_authenticated() {
        Decision::Allow
    } else {
        Decision::Redirect(Route::Login)
    }
}

/// Gate for pages that only make sense without a session (login).
pub fn redirect_if_authenticated(store: &dyn CredentialStore) -> Decision {
    if store.is_authenticated() {
        Decision::Redirect(Route::Dashboard)
    } else {
        Decision::Allow
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
