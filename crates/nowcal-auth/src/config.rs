//! OAuth client configuration.
//!
//! The configuration is usually loaded from the client-secret JSON that the
//! Google Cloud Console hands out for installed applications. The redirect
//! target defaults to the out-of-band URN: the user pastes the code back into
//! the terminal.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;
use url::Url;

use crate::error::{AuthError, AuthResult};

/// Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Redirect target telling the provider to show the code to the user.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Read-only calendar access.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Structure of a client-secret JSON file.
///
/// Accepts the console format with an `installed` or `web` section, and a
/// flat format with `client_id`/`client_secret` at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    #[serde(default)]
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Client identity and endpoint parameters for the token cache.
///
/// Read-only once built; every token cache operation receives it explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Authorization endpoint the user visits.
    pub auth_url: String,
    /// Token endpoint for code and refresh exchanges.
    pub token_url: String,
    /// Redirect target sent with the grant.
    pub redirect_uri: String,
    /// Scopes to request.
    pub scopes: Vec<String>,
    /// Timeout applied to each token endpoint call.
    pub timeout: Duration,
    /// A credential expiring within this margin is treated as stale.
    pub safety_margin: TimeDelta,
}

impl OAuthConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default safety margin in seconds.
    pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 5 * 60;

    /// Creates a configuration against the Google endpoints with the
    /// read-only calendar scope.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_uri: OOB_REDIRECT_URI.to_string(),
            scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            safety_margin: TimeDelta::seconds(Self::DEFAULT_SAFETY_MARGIN_SECS),
        }
    }

    /// Loads the configuration from a client-secret JSON file.
    pub fn from_client_secrets_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::config(format!(
                "failed to read client secret file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_client_secrets_json(&content)
    }

    /// Parses a client-secret JSON string.
    ///
    /// `auth_uri`, `token_uri` and the first of `redirect_uris` from the file
    /// override the Google defaults.
    pub fn from_client_secrets_json(json: &str) -> AuthResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| AuthError::config(format!("failed to parse client secret JSON: {}", e)))?;

        if let Some(section) = file.installed.or(file.web) {
            let mut config = Self::new(section.client_id, section.client_secret);
            if let Some(auth_uri) = section.auth_uri {
                config.auth_url = auth_uri;
            }
            if let Some(token_uri) = section.token_uri {
                config.token_url = token_uri;
            }
            if let Some(redirect_uri) = section.redirect_uris.into_iter().find(|u| !u.is_empty()) {
                config.redirect_uri = redirect_uri;
            }
            return Ok(config);
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(AuthError::config(
            "client secret file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the redirect target.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Replaces the requested scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds a scope unless it is already requested.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Sets the token endpoint timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the expiry safety margin.
    pub fn with_safety_margin(mut self, margin: TimeDelta) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Checks that every field the token cache relies on is usable.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::config("client_id is required"));
        }
        Self::validate_endpoint("authorization endpoint", &self.auth_url)?;
        Self::validate_endpoint("token endpoint", &self.token_url)?;
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::config("redirect target is required"));
        }
        if self.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(AuthError::config("at least one OAuth scope is required"));
        }
        if self.timeout.is_zero() {
            return Err(AuthError::config("timeout must be greater than zero"));
        }
        if self.safety_margin < TimeDelta::zero() {
            return Err(AuthError::config("safety margin must not be negative"));
        }
        Ok(())
    }

    fn validate_endpoint(name: &str, value: &str) -> AuthResult<()> {
        if value.trim().is_empty() {
            return Err(AuthError::config(format!("{} is required", name)));
        }
        Url::parse(value)
            .map_err(|e| AuthError::config(format!("{} {:?} is not a URL: {}", name, value, e)))?;
        Ok(())
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .field("safety_margin", &self.safety_margin)
            .finish()
    }
}
