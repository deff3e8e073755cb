//! Search API credentials.
//!
//! Credentials come from two places: the process environment and an optional
//! `.env`-style file of `KEY=VALUE` lines. The file is parsed into a plain
//! mapping without touching the environment; [`Credentials::resolve`] then
//! prefers environment values and only falls back to the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Environment variable holding the API client id.
pub const CLIENT_ID_VAR: &str = "NAVER_CLIENT_ID";
/// Environment variable holding the API client secret.
pub const CLIENT_SECRET_VAR: &str = "NAVER_CLIENT_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variables NAVER_CLIENT_ID / NAVER_CLIENT_SECRET are required (a .env file may be used)")]
    MissingCredentials,

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenv::Error,
    },
}

/// Parse a `KEY=VALUE` file into a mapping.
///
/// Blank lines and `#` comments are skipped. A missing file is not an error
/// and yields an empty mapping.
// dotenv 0.15 marks `from_path_iter` deprecated; it is the only reader that
// leaves the process environment untouched.
#[allow(deprecated)]
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut vars = BTreeMap::new();
    if !path.exists() {
        debug!("No env file present");
        return Ok(vars);
    }

    let to_err = |source| ConfigError::EnvFile {
        path: path.display().to_string(),
        source,
    };
    for entry in dotenv::from_path_iter(path).map_err(to_err)? {
        let (key, value) = entry.map_err(to_err)?;
        vars.insert(key, value);
    }

    info!(count = vars.len(), "Parsed env file");
    Ok(vars)
}

/// API credentials passed explicitly into the search client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials, environment first, file values as defaults.
    ///
    /// `env` is the environment lookup; the binary passes
    /// `|k| std::env::var(k).ok()`.
    pub fn resolve<F>(file_vars: &BTreeMap<String, String>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env(key)
                .or_else(|| file_vars.get(key).cloned())
                .filter(|v| !v.trim().is_empty())
        };

        match (lookup(CLIENT_ID_VAR), lookup(CLIENT_SECRET_VAR)) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    /// Parse `path` and resolve against the real process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file_vars = parse_env_file(path)?;
        Self::resolve(&file_vars, |key| std::env::var(key).ok())
    }
}
