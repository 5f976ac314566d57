//! scantoken - print a valid Hub scan ID for the given user.
//!
//! Reuses the token cached under the scan configuration directory while it
//! is still valid, and negotiates a new one with Hub otherwise.

use std::io;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scantoken_core::{
    Authenticator, Config, Credentials, HubClient, KeySet, TokenStore, TokenValidator,
};

const USERNAME_ENV: &str = "SCANTOKEN_USERNAME";
const PASSWORD_ENV: &str = "SCANTOKEN_PASSWORD";

const USAGE: &str = "\
Usage:
  scantoken token [--username <name>]   Print a valid scan ID
  scantoken logout --username <name>    Forget the cached scan ID

Environment:
  SCANTOKEN_USERNAME, SCANTOKEN_PASSWORD   Hub credentials
  SCANTOKEN_HUB_URL, SCANTOKEN_JWKS        Override config.json settings
  RUST_LOG                                 Log filter (default: warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("token") => print_token(username_arg(&args[1..])?),
        Some("logout") => logout(username_arg(&args[1..])?),
        Some("-h") | Some("--help") | None => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => Err(anyhow::anyhow!("Unknown command: {}\n\n{}", other, USAGE)),
    }
}

/// `--username <name>` if given
fn username_arg(args: &[String]) -> Result<Option<String>> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--username" | "-u" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--username requires a value"))?;
                return Ok(Some(value.clone()));
            }
            other => anyhow::bail!("Unexpected argument: {}", other),
        }
    }
    Ok(None)
}

fn print_token(username: Option<String>) -> Result<()> {
    let config = Config::load()?;
    debug!(hub_url = %config.hub_url, "Config loaded");

    let jwks_path = config.jwks_path.clone().ok_or_else(|| {
        anyhow::anyhow!("No verification keys configured: set jwks_path in scan/config.json or SCANTOKEN_JWKS")
    })?;
    let keys = KeySet::from_file(&jwks_path)?;
    debug!(kids = ?keys.kids(), "Verification keys loaded");

    let credentials = resolve_credentials(username)?;

    let authenticator = Authenticator::new(
        HubClient::new(config.hub_url.clone())?,
        TokenStore::default_location()?,
        TokenValidator::new(keys, config.expiration_leeway()),
    );

    let token = authenticator.get_token(&credentials)?;
    println!("{}", token);
    Ok(())
}

fn logout(username: Option<String>) -> Result<()> {
    let username = username
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| anyhow::anyhow!("logout requires --username"))?;

    let store = TokenStore::default_location()?;
    store
        .remove(&username)
        .with_context(|| format!("Failed to remove cached scan id for {}", username))?;
    info!(username = %username, "Cached scan id removed");
    Ok(())
}

fn resolve_credentials(username: Option<String>) -> Result<Credentials> {
    let username = username
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| anyhow::anyhow!("No Hub username: pass --username or set {}", USERNAME_ENV))?;

    let secret = match std::env::var(PASSWORD_ENV) {
        Ok(secret) if !secret.is_empty() => secret,
        _ => prompt_password(&username)?,
    };

    let credentials = Credentials::new(username, secret);
    if !credentials.is_complete() {
        anyhow::bail!("Username and password required");
    }
    Ok(credentials)
}

fn prompt_password(username: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("Hub password for {}: ", username))?;
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_username_arg() {
        assert_eq!(username_arg(&args(&[])).unwrap(), None);
        assert_eq!(
            username_arg(&args(&["--username", "bob"])).unwrap(),
            Some("bob".to_string())
        );
        assert_eq!(
            username_arg(&args(&["-u", "alice"])).unwrap(),
            Some("alice".to_string())
        );
        assert!(username_arg(&args(&["--username"])).is_err());
        assert!(username_arg(&args(&["--verbose"])).is_err());
    }
}
