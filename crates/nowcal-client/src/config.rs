//! Client configuration.
//!
//! Optional settings live in a `config.toml` file at
//! `~/.config/nowcal/config.toml` by default. Command-line flags win over the
//! file, the file wins over built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use nowcal_auth::OAuthConfig;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Default client-secret file, relative to the working directory.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Default token cache, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Default number of events requested.
pub const DEFAULT_MAX_RESULTS: usize = 10;

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the nowcal client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Which calendar to read.
    pub calendar: CalendarSettings,

    /// Token cache settings.
    pub auth: AuthSettings,
}

/// Calendar selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar identifier.
    pub id: Option<String>,

    /// Maximum number of events to request.
    pub max_results: Option<usize>,
}

/// OAuth and token cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Google client-secret JSON file.
    pub credentials_file: Option<PathBuf>,

    /// Token cache file.
    pub token_file: Option<PathBuf>,

    /// Scopes requested on top of read-only calendar access.
    pub scopes: Vec<String>,

    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Seconds before expiry at which a token is refreshed.
    pub safety_margin_secs: Option<i64>,
}

impl ClientConfig {
    /// Loads configuration from the default path, if the file exists.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nowcal")
    }
}

// ---------------------------------------------------------------------------
// Settings (flags merged over config.toml)
// ---------------------------------------------------------------------------

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub calendar_id: String,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub force_interactive: bool,
    pub extra_scopes: Vec<String>,
    pub timeout: Duration,
    pub safety_margin: Option<TimeDelta>,
    pub max_results: usize,
}

impl Settings {
    /// Merges command-line flags over the configuration file.
    pub fn resolve(cli: &Cli, config: &ClientConfig) -> ClientResult<Self> {
        let calendar_id = cli
            .calendar
            .clone()
            .or_else(|| config.calendar.id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ClientError::Config(
                    "missing calendar: pass --calendar or set [calendar] id in config.toml"
                        .to_string(),
                )
            })?;

        let max_results = cli
            .max_results
            .or(config.calendar.max_results)
            .unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 {
            return Err(ClientError::Config("max_results must be at least 1".to_string()));
        }

        let timeout_secs = cli
            .timeout
            .or(config.auth.timeout_secs)
            .unwrap_or(OAuthConfig::DEFAULT_TIMEOUT_SECS);

        let safety_margin = config
            .auth
            .safety_margin_secs
            .map(|secs| {
                TimeDelta::try_seconds(secs).ok_or_else(|| {
                    ClientError::Config(format!("safety_margin_secs {} is out of range", secs))
                })
            })
            .transpose()?;

        let mut extra_scopes = config.auth.scopes.clone();
        for scope in &cli.scope {
            if !extra_scopes.contains(scope) {
                extra_scopes.push(scope.clone());
            }
        }

        Ok(Self {
            calendar_id,
            credentials_file: cli
                .credentials_file
                .clone()
                .or_else(|| config.auth.credentials_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE)),
            token_file: cli
                .token_file
                .clone()
                .or_else(|| config.auth.token_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            force_interactive: cli.update,
            extra_scopes,
            timeout: Duration::from_secs(timeout_secs),
            safety_margin,
            max_results,
        })
    }

    /// Loads the client-secret file and applies these settings to it.
    pub fn oauth_config(&self) -> ClientResult<OAuthConfig> {
        let mut config = OAuthConfig::from_client_secrets_file(&self.credentials_file)?
            .with_timeout(self.timeout);
        for scope in &self.extra_scopes {
            config = config.with_scope(scope.as_str());
        }
        if let Some(margin) = self.safety_margin {
            config = config.with_safety_margin(margin);
        }
        config.validate()?;
        Ok(config)
    }
}
