use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use url::Url;

use crate::{
    adapter::memory::MemoryAdapter,
    api,
    config::{AuthConfig, SessionStrategy},
    provider::config::load_providers,
    state::AuthState,
};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub base_url: Url,
    pub base_path: String,
    pub secrets: Vec<SecretString>,
    pub strategy: SessionStrategy,
    pub session_max_age: i64,
    pub session_update_age: i64,
    pub providers: Option<PathBuf>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let providers = match &args.providers {
        Some(path) => load_providers(path)
            .with_context(|| format!("failed to load providers from {}", path.display()))?,
        None => {
            warn!("no providers configured; only session endpoints will be useful");
            Vec::new()
        }
    };

    let config = AuthConfig::new(args.base_url, args.secrets)
        .with_base_path(args.base_path)
        .with_strategy(args.strategy)
        .with_session_max_age_seconds(args.session_max_age)
        .with_session_update_age_seconds(args.session_update_age);

    let mut state = AuthState::new(config, providers)?;
    if args.strategy == SessionStrategy::Database {
        // Until a real adapter is wired in, sessions live in process memory
        // and vanish on restart.
        warn!("database strategy backed by the in-memory adapter");
        state = state.with_adapter(Arc::new(MemoryAdapter::new()));
    }

    api::new(args.port, Arc::new(state)).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("base_url", args.base_url.to_string()),
        ("base_path", args.base_path.clone()),
        ("secrets", args.secrets.len().to_string()),
        ("strategy", format!("{:?}", args.strategy).to_lowercase()),
        ("session_max_age", args.session_max_age.to_string()),
        ("session_update_age", args.session_update_age.to_string()),
        (
            "providers",
            args.providers
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = "Startup configuration:".to_string();
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}
