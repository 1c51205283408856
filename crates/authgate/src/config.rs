// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::client::{Endpoints, DEFAULT_API_URL, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH};
use crate::credential;

/// Authenticated API client with transparent token refresh.
#[derive(Debug, Parser)]
#[command(name = "authgate", version, about)]
pub struct Config {
    /// API base URL.
    #[arg(long, env = "AUTHGATE_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Credentials file (defaults to the state directory).
    #[arg(long, env = "AUTHGATE_CREDENTIALS", global = true)]
    pub credentials: Option<PathBuf>,

    /// Login endpoint path.
    #[arg(long, env = "AUTHGATE_LOGIN_PATH", default_value = DEFAULT_LOGIN_PATH, global = true)]
    pub login_path: String,

    /// Refresh endpoint path.
    #[arg(long, env = "AUTHGATE_REFRESH_PATH", default_value = DEFAULT_REFRESH_PATH, global = true)]
    pub refresh_path: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "AUTHGATE_TIMEOUT_SECS", default_value = "30", global = true)]
    pub timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AUTHGATE_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "AUTHGATE_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the issued credential
    Login {
        #[arg(long, short)]
        username: String,

        /// Password (prefer the environment variable)
        #[arg(long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Log in again even when a credential is already stored
        #[arg(long)]
        force: bool,
    },
    /// Forget the stored credential
    Logout,
    /// Show whether a credential is stored
    Status,
    /// Exchange the refresh cookie for a new credential
    Refresh,
    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Send without a credential and without refresh on 401
        #[arg(long)]
        anonymous: bool,
    },
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("invalid --api-url {:?}: {e}", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("--api-url must use http or https, got {}", url.scheme());
        }
        for (flag, path) in [("--login-path", &self.login_path), ("--refresh-path", &self.refresh_path)]
        {
            if !path.starts_with('/') {
                anyhow::bail!("{flag} must start with '/', got {path:?}");
            }
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("invalid log format: {} (expected json or text)", self.log_format);
        }
        if let Command::Request { method, data, .. } = &self.command {
            reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|_| anyhow::anyhow!("invalid HTTP method: {method}"))?;
            if let Some(data) = data {
                serde_json::from_str::<serde_json::Value>(data)
                    .map_err(|e| anyhow::anyhow!("--data is not valid JSON: {e}"))?;
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials.clone().unwrap_or_else(credential::default_path)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_url: self.api_url.clone(),
            login_path: self.login_path.clone(),
            refresh_path: self.refresh_path.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
