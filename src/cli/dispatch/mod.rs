use crate::cli::{
    actions::{server, Action},
    commands::{oauth, session},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;

use crate::config::SessionStrategy;

/// Build the [`Action`] from parsed arguments.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);

    let base_url = matches
        .get_one::<String>(oauth::ARG_BASE_URL)
        .context("missing required argument: --base-url")?;
    let base_url = Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;

    let base_path = matches
        .get_one::<String>(oauth::ARG_BASE_PATH)
        .cloned()
        .unwrap_or_else(|| "/auth".to_string());

    let secrets: Vec<SecretString> = matches
        .get_many::<String>(session::ARG_SECRET)
        .context("missing required argument: --secret")?
        .map(|secret| SecretString::from(secret.clone()))
        .collect();

    let strategy = matches
        .get_one::<String>(session::ARG_SESSION_STRATEGY)
        .map(String::as_str)
        .unwrap_or("jwt")
        .parse::<SessionStrategy>()
        .map_err(anyhow::Error::msg)?;

    let session_max_age = matches
        .get_one::<i64>(session::ARG_SESSION_MAX_AGE)
        .copied()
        .unwrap_or(2_592_000);
    let session_update_age = matches
        .get_one::<i64>(session::ARG_SESSION_UPDATE_AGE)
        .copied()
        .unwrap_or(86_400);

    let providers = matches
        .get_one::<String>(oauth::ARG_PROVIDERS)
        .map(PathBuf::from);

    Ok(Action::Server(server::Args {
        port,
        base_url,
        base_path,
        secrets,
        strategy,
        session_max_age,
        session_update_age,
        providers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn handler_builds_a_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "ensaluti",
            "--base-url",
            "http://localhost:3000",
            "--secret",
            "current,previous",
        ]);
        let Action::Server(args) = handler(&matches).unwrap();

        assert_eq!(args.port, 3000);
        assert_eq!(args.base_url.as_str(), "http://localhost:3000/");
        assert_eq!(args.base_path, "/auth");
        assert_eq!(args.secrets.len(), 2);
        assert_eq!(args.strategy, SessionStrategy::Jwt);
        assert!(args.providers.is_none());
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        let matches = commands::new().get_matches_from(vec![
            "ensaluti",
            "--base-url",
            "not a url",
            "--secret",
            "s1",
        ]);
        assert!(handler(&matches).is_err());
    }
}
