// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::error;

use authgate::config::{Command, Config};
use authgate::guard::{self, Decision};
use authgate::{
    ApiRequest, AuthClient, AuthEvent, CredentialStore, FileCredentialStore, HttpTransport,
    RequestFlags,
};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<i32> {
    let credentials_path = config.credentials_path();
    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::open(&credentials_path));
    let transport = Arc::new(HttpTransport::new(config.timeout())?);
    let client =
        AuthClient::with_event_navigation(config.endpoints(), transport, Arc::clone(&store));
    let mut events = client.subscribe();

    let code = match config.command {
        Command::Status => {
            if client.is_authenticated() {
                println!("logged in ({})", credentials_path.display());
                0
            } else {
                println!("not logged in");
                1
            }
        }
        Command::Logout => {
            client.logout();
            println!("logged out");
            return Ok(0);
        }
        Command::Login { username, password, force } => {
            if !force {
                if let Decision::Redirect(_) = guard::redirect_if_authenticated(store.as_ref()) {
                    eprintln!("already logged in (use --force to log in again)");
                    return Ok(0);
                }
            }
            match client.login(&username, &password).await {
                Ok(()) => {
                    println!("logged in as {username}");
                    0
                }
                Err(authgate::AuthError::LoginRejected { message, .. }) => {
                    eprintln!("{message}");
                    1
                }
                Err(e) => return Err(e).context("login failed"),
            }
        }
        Command::Refresh => {
            if !require_session(store.as_ref()) {
                return Ok(1);
            }
            let refreshed = client.refresh().await;
            report_navigation(&mut events);
            refreshed.context("token refresh failed")?;
            println!("credential refreshed");
            0
        }
        Command::Request { method, path, data, anonymous } => {
            if !anonymous && !require_session(store.as_ref()) {
                return Ok(1);
            }
            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method: {method}"))?;
            let mut request = ApiRequest::new(method, client.url(&path));
            if let Some(data) = data {
                let body: serde_json::Value =
                    serde_json::from_str(&data).context("--data is not valid JSON")?;
                request = request.json(&body)?;
            }
            if anonymous {
                request = request.with_flags(RequestFlags::anonymous());
            }

            let response = client.send(request).await;
            report_navigation(&mut events);
            let response = response.with_context(|| format!("request to {path} failed"))?;
            println!("{}", response.text());
            if response.is_success() {
                0
            } else {
                eprintln!("server returned {}", response.status);
                1
            }
        }
    };

    report_navigation(&mut events);
    Ok(code)
}

/// Refuse commands that need a stored credential.
fn require_session(store: &dyn CredentialStore) -> bool {
    match guard::can_activate(store) {
        Decision::Allow => true,
        Decision::Redirect(route) => {
            eprintln!("not logged in (redirect to {route}): run `authgate login`");
            false
        }
    }
}

/// Tell the user when the session ended underneath a command.
fn report_navigation(events: &mut broadcast::Receiver<AuthEvent>) {
    while let Ok(event) = events.try_recv() {
        if event == AuthEvent::NavigateToLogin {
            eprintln!("session expired: run `authgate login`");
        }
    }
}
