//! ticketstore configuration.
//!
//! Loaded from `~/.ticketstore/config.toml`, then resolved once into a
//! [`ClientConfig`] that the tracker is built from. Nothing below the CLI
//! reads the environment.

use std::path::{Path, PathBuf};
use std::{fs, io};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Custom field that holds the payload unless configured otherwise.
pub const DEFAULT_FIELD: &str = "customfield_14000";

/// Environment variable holding the secret unless configured otherwise.
pub const DEFAULT_SECRET_ENV: &str = "TICKETSTORE_SECRET";

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error(
        "no config file found at {}\n\
         Create one with at minimum:\n\n\
         project = \"EXAMPLE\"\n\
         endpoint = \"https://jira.example.net\"",
        .0.display()
    )]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0} is empty; set it in ~/.ticketstore/config.toml")]
    Empty(&'static str),

    #[error("staging requested but no staging-endpoint is configured")]
    NoStagingEndpoint,

    #[error("identity required: pass --as <identity>, set TICKETSTORE_IDENTITY, or add `identity = \"...\"` to ~/.ticketstore/config.toml")]
    IdentityRequired,

    #[error("secret required: set {0}")]
    SecretRequired(String),
}

pub type Result<T> = core::result::Result<T, ConfigError>;

/// ticketstore configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Account used to authenticate. Can be overridden per invocation.
    #[serde(default)]
    pub identity: String,

    /// Project whose open tickets `list` shows.
    pub project: String,

    /// Custom field id of the designated field, used for reads and writes alike.
    #[serde(default = "default_field")]
    pub field: String,

    /// Production server.
    pub endpoint: String,

    /// Staging server, used when staging is requested.
    pub staging_endpoint: Option<String>,

    /// HTTPS proxy for the production server. Never used for staging.
    pub proxy: Option<String>,

    /// Name of the environment variable holding the secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

fn default_secret_env() -> String {
    DEFAULT_SECRET_ENV.to_string()
}

/// Everything needed to connect to the ticket service, resolved once per client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity: String,
    pub secret: SecretString,
    pub endpoint: String,
    pub proxy: Option<String>,
}

impl Config {
    /// Load config from `~/.ticketstore/config.toml`.
    pub fn load() -> Result<Self> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

        if config.project.is_empty() {
            return Err(ConfigError::Empty("project"));
        }
        if config.endpoint.is_empty() {
            return Err(ConfigError::Empty("endpoint"));
        }
        if config.field.is_empty() {
            return Err(ConfigError::Empty("field"));
        }

        Ok(config)
    }

    /// The config file path: `~/.ticketstore/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ticketstore").join("config.toml"))
    }

    /// Resolves the connection settings for production or staging.
    ///
    /// The proxy only applies to production.
    pub fn resolve(
        &self,
        identity: String,
        secret: SecretString,
        staging: bool,
    ) -> Result<ClientConfig> {
        let (endpoint, proxy) = if staging {
            let endpoint = self
                .staging_endpoint
                .clone()
                .ok_or(ConfigError::NoStagingEndpoint)?;
            (endpoint, None)
        } else {
            (self.endpoint.clone(), self.proxy.clone())
        };

        Ok(ClientConfig {
            identity,
            secret,
            endpoint,
            proxy,
        })
    }
}
