//! Credential resolution for ticketstore commands.
//!
//! Identity is resolved through a chain:
//!
//! 1. `--as <identity>` — explicit per-command override
//! 2. `TICKETSTORE_IDENTITY` env var — process/session level
//! 3. `identity` in `~/.ticketstore/config.toml` — global default
//!
//! The secret only ever comes from the environment variable named by the
//! config's `secret-env`, so it never sits in a file next to the identity.

use std::env;

use secrecy::SecretString;

use crate::config::{Config, ConfigError, Result};

/// Environment variable that overrides the configured identity.
pub const IDENTITY_ENV: &str = "TICKETSTORE_IDENTITY";

/// Environment variable that routes requests to the staging server.
pub const STAGING_ENV: &str = "TICKETSTORE_STAGING";

/// Resolve the acting identity from the tiered resolution chain.
pub fn resolve_identity(explicit: Option<&str>, config: &Config) -> Result<String> {
    pick_identity(explicit, env::var(IDENTITY_ENV).ok(), &config.identity)
}

/// Read the secret from the configured environment variable.
pub fn resolve_secret(config: &Config) -> Result<SecretString> {
    match env::var(&config.secret_env) {
        Ok(secret) if !secret.is_empty() => Ok(SecretString::from(secret)),
        _ => Err(ConfigError::SecretRequired(config.secret_env.clone())),
    }
}

/// Whether staging was requested, by flag or by `TICKETSTORE_STAGING`.
pub fn staging_requested(flag: bool) -> bool {
    flag || env::var(STAGING_ENV).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

fn pick_identity(
    explicit: Option<&str>,
    from_env: Option<String>,
    configured: &str,
) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }

    if let Some(id) = from_env
        && !id.is_empty()
    {
        return Ok(id);
    }

    if !configured.is_empty() {
        return Ok(configured.to_string());
    }

    Err(ConfigError::IdentityRequired)
}
