//! The cached OAuth credential.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Token type used when the provider does not name one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Where a credential stands relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Usable as-is: expiry is further away than the safety margin.
    Valid,
    /// Stale, but a refresh token is available.
    Refreshable,
    /// Stale and no refresh token: only an interactive grant helps.
    ExpiredTerminal,
}

/// An access token with its refresh token and expiry metadata.
///
/// This is the record written to the token file. Field names are stable:
/// files written by earlier runs must keep loading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The access token for API requests.
    pub access_token: String,

    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type", deserialize_with = "token_type_or_default")]
    pub token_type: String,

    /// The refresh token for obtaining new access tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC).
    pub expiry: DateTime<Utc>,

    /// The OAuth scopes that were granted.
    #[serde(default, deserialize_with = "scope_list")]
    pub scope: Vec<String>,
}

impl Credential {
    /// Creates a bearer credential without refresh token or scope.
    pub fn new(access_token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            refresh_token: None,
            expiry,
            scope: Vec::new(),
        }
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the granted scopes.
    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the time left until expiry, negative once expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expiry - now
    }

    /// True when the credential outlives `now` by more than `margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.time_until_expiry(now) > margin
    }

    /// True when the access token is past its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    /// True when a refresh token is available.
    pub fn is_refreshable(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Classifies the credential at `now`.
    pub fn state(&self, now: DateTime<Utc>, margin: TimeDelta) -> CredentialState {
        if self.is_valid_at(now, margin) {
            CredentialState::Valid
        } else if self.is_refreshable() {
            CredentialState::Refreshable
        } else {
            CredentialState::ExpiredTerminal
        }
    }

    /// Returns true if every required scope was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scope.contains(scope))
    }

    /// Value for the HTTP `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish()
    }
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

fn token_type_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(deserializer)?.unwrap_or_else(default_token_type))
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Scope as written by different tools: a list, or one space-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    List(Vec<String>),
    Joined(String),
}

fn scope_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let scopes = match Option::<ScopeRepr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ScopeRepr::List(list)) => list,
        Some(ScopeRepr::Joined(joined)) => split_scopes(&joined),
    };
    Ok(scopes)
}

/// Splits a space-separated OAuth scope string.
pub(crate) fn split_scopes(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn margin() -> TimeDelta {
        TimeDelta::minutes(5)
    }

    #[test]
    fn valid_outside_margin() {
        let now = Utc::now();
        let credential = Credential::new("access", now + TimeDelta::minutes(10));
        assert!(credential.is_valid_at(now, margin()));
        assert_eq!(credential.state(now, margin()), CredentialState::Valid);
    }

    #[test]
    fn stale_inside_margin() {
        let now = Utc::now();
        let credential = Credential::new("access", now + TimeDelta::minutes(1));
        assert!(!credential.is_valid_at(now, margin()));
        assert!(!credential.is_expired_at(now));
        assert_eq!(
            credential.state(now, margin()),
            CredentialState::ExpiredTerminal
        );

        let credential = credential.with_refresh_token("refresh");
        assert_eq!(credential.state(now, margin()), CredentialState::Refreshable);
    }

    #[test]
    fn exactly_at_margin_is_stale() {
        let now = Utc::now();
        let credential = Credential::new("access", now + margin());
        assert!(!credential.is_valid_at(now, margin()));
    }

    #[test]
    fn authorization_header_uses_token_type() {
        let credential = Credential::new("abc", Utc::now());
        assert_eq!(credential.authorization_header(), "Bearer abc");
    }

    #[test]
    fn scope_check() {
        let credential = Credential::new("access", Utc::now())
            .with_scope(vec!["scope1".to_string(), "scope2".to_string()]);
        assert!(credential.has_scopes(&["scope1".to_string()]));
        assert!(!credential.has_scopes(&["scope3".to_string()]));
    }

    #[test]
    fn reads_file_written_by_other_clients() {
        // Layout written by other OAuth clients: no scope,
        // offset timestamp, empty refresh token.
        let json = r#"{
            "access_token": "ya29.token",
            "token_type": "Bearer",
            "refresh_token": "",
            "expiry": "2024-03-15T12:00:00.123456+02:00"
        }"#;

        let credential: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(credential.access_token, "ya29.token");
        assert_eq!(credential.refresh_token, None);
        assert!(credential.scope.is_empty());
        assert_eq!(
            credential.expiry.to_rfc3339(),
            "2024-03-15T10:00:00.123456+00:00"
        );
    }

    #[test]
    fn scope_accepts_joined_string() {
        let json = format!(
            r#"{{"access_token": "a", "expiry": "2024-03-15T10:00:00Z", "scope": "{} openid"}}"#,
            SCOPE
        );
        let credential: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(credential.scope, vec![SCOPE.to_string(), "openid".to_string()]);
        assert_eq!(credential.token_type, DEFAULT_TOKEN_TYPE);
    }

    #[test]
    fn missing_expiry_is_rejected() {
        let result: Result<Credential, _> = serde_json::from_str(r#"{"access_token": "a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let credential =
            Credential::new("secret-access", Utc::now()).with_refresh_token("secret-refresh");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn serialized_layout() {
        let expiry = DateTime::parse_from_rfc3339("2024-03-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let credential = Credential::new("access-token", expiry)
            .with_refresh_token("refresh-token")
            .with_scope(vec![SCOPE.to_string()]);

        insta::assert_json_snapshot!(credential, @r#"
        {
          "access_token": "access-token",
          "token_type": "Bearer",
          "refresh_token": "refresh-token",
          "expiry": "2024-03-15T10:00:00Z",
          "scope": [
            "https://www.googleapis.com/auth/calendar.readonly"
          ]
        }
        "#);
    }
}
