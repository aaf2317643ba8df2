//! Configuration file support (`consign.toml`).
//!
//! Everything here is optional: a missing file means defaults, and
//! credentials can always come from `CONSIGN_USERNAME` / `CONSIGN_PASSWORD`
//! instead of the file. Environment variables win over file values so CI can
//! inject credentials without touching the checked-in config.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{Credentials, PublishingType};

pub const CONFIG_FILE: &str = "consign.toml";
pub const USERNAME_ENV: &str = "CONSIGN_USERNAME";
pub const PASSWORD_ENV: &str = "CONSIGN_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Publisher API base URL override (defaults to the production portal).
    pub base_url: Option<String>,
    /// `AUTOMATIC` or `USER_MANAGED`.
    pub publishing_type: Option<PublishingType>,
    /// Digest algorithms beyond the mandatory MD5 + SHA-1.
    pub extra_algorithms: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Load `consign.toml`. A missing file is `None`; a file that exists but
/// does not parse is an error, never silently ignored.
pub fn load_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read config file {}", path.display()), e))?;
    let config: FileConfig = toml::from_str(&content).map_err(|e| {
        Error::InvalidInput(format!("failed to parse config file {}: {e}", path.display()))
    })?;
    Ok(Some(config))
}

/// Resolve credentials from the environment, falling back to the config
/// file. Blank results are caught later by `Credentials::validate`.
pub fn resolve_credentials(config: Option<&FileConfig>) -> Credentials {
    resolve_credentials_with(config, |key| std::env::var(key).ok())
}

fn resolve_credentials_with(
    config: Option<&FileConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> Credentials {
    let from_file = |pick: fn(&FileConfig) -> Option<&String>| {
        config.and_then(pick).cloned().unwrap_or_default()
    };
    let username = env(USERNAME_ENV).unwrap_or_else(|| from_file(|c| c.username.as_ref()));
    let password = env(PASSWORD_ENV).unwrap_or_else(|| from_file(|c| c.password.as_ref()));
    Credentials { username, password }
}
