//! Token endpoint exchanges.
//!
//! [`TokenEndpoint`] is the seam between the token cache and the identity
//! provider: one call swaps an authorization code for a credential, the other
//! swaps a refresh token for a new access token. [`HttpTokenEndpoint`] talks
//! to the real endpoint over HTTPS with a bounded timeout.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OAuthConfig;
use crate::credential::{Credential, DEFAULT_TOKEN_TYPE, split_scopes};
use crate::error::{AuthError, AuthResult, ExchangeError};

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single token endpoint call.
pub type ExchangeResult = Result<TokenResponse, ExchangeError>;

/// Successful response from a token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// A new (or rotated) refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Creates a response carrying an access token valid for `expires_in` seconds.
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: Some(expires_in),
            refresh_token: None,
            token_type: None,
            scope: None,
        }
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Builds the credential described by this response.
    ///
    /// `previous_refresh_token` is carried over when the response does not
    /// rotate it. `fallback_scope` is used when the response lists no scope.
    /// A response without `expires_in` is malformed.
    pub fn into_credential(
        self,
        now: DateTime<Utc>,
        previous_refresh_token: Option<&str>,
        fallback_scope: &[String],
    ) -> Result<Credential, String> {
        let expires_in = self
            .expires_in
            .ok_or_else(|| "token response has no expires_in".to_string())?;
        let expiry = TimeDelta::try_seconds(expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| format!("token response has out of range expires_in {}", expires_in))?;

        if self.access_token.is_empty() {
            return Err("token response has an empty access_token".to_string());
        }

        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string));
        let scope = match self.scope.as_deref().map(split_scopes) {
            Some(scope) if !scope.is_empty() => scope,
            _ => fallback_scope.to_vec(),
        };
        let token_type = self
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());

        Ok(Credential {
            access_token: self.access_token,
            token_type,
            refresh_token,
            expiry,
            scope,
        })
    }
}

/// Exchanges with the identity provider's token endpoint.
///
/// Implementations never retry: a failure is returned as-is and the caller
/// decides what to do.
pub trait TokenEndpoint: Send + Sync {
    /// Exchanges an authorization code for tokens.
    fn exchange_code<'a>(
        &'a self,
        config: &'a OAuthConfig,
        code: &'a str,
        code_verifier: &'a str,
    ) -> BoxFuture<'a, ExchangeResult>;

    /// Exchanges a refresh token for a new access token.
    fn refresh<'a>(
        &'a self,
        config: &'a OAuthConfig,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ExchangeResult>;
}

/// Error body returned by OAuth token endpoints (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Token endpoint reached over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    http_client: reqwest::Client,
}

impl HttpTokenEndpoint {
    /// Creates an HTTP endpoint whose requests time out after `config.timeout`.
    pub fn new(config: &OAuthConfig) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("nowcal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn post_form(&self, token_url: &str, params: &[(&str, &str)]) -> ExchangeResult {
        debug!(endpoint = token_url, grant_type = ?grant_type(params), "calling token endpoint");

        let response = self
            .http_client
            .post(token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ExchangeError::new(token_url, describe_transport_error(&e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ExchangeError::new(token_url, format!("failed to read response: {}", e))
                .with_status(status.as_u16())
        })?;

        if !status.is_success() {
            return Err(
                ExchangeError::new(token_url, describe_error_body(&body))
                    .with_status(status.as_u16()),
            );
        }

        serde_json::from_str(&body).map_err(|e| {
            ExchangeError::new(token_url, format!("invalid token response: {}", e))
                .with_status(status.as_u16())
        })
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    fn exchange_code<'a>(
        &'a self,
        config: &'a OAuthConfig,
        code: &'a str,
        code_verifier: &'a str,
    ) -> BoxFuture<'a, ExchangeResult> {
        Box::pin(async move {
            let params = [
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("code", code),
                ("code_verifier", code_verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", config.redirect_uri.as_str()),
            ];
            let response = self.post_form(&config.token_url, &params).await?;
            info!("obtained tokens from authorization code");
            Ok(response)
        })
    }

    fn refresh<'a>(
        &'a self,
        config: &'a OAuthConfig,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ExchangeResult> {
        Box::pin(async move {
            let params = [
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ];
            let response = self.post_form(&config.token_url, &params).await?;
            info!("refreshed access token");
            Ok(response)
        })
    }
}

fn grant_type<'a>(params: &[(&str, &'a str)]) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| *key == "grant_type")
        .map(|(_, value)| *value)
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(OAuthErrorBody { error, .. }) => error,
        Err(_) if body.trim().is_empty() => "empty error response".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
