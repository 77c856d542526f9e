//! Client error types.

use std::fmt;

use nowcal_auth::{AuthError, AuthErrorKind};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Token acquisition failed.
    Auth(AuthError),
    /// The calendar API call failed.
    Calendar(String),
    /// IO error.
    Io(std::io::Error),
}

impl ClientError {
    /// A follow-up suggestion for the user, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Auth(e) => match e.kind() {
                AuthErrorKind::CredentialUnavailable | AuthErrorKind::RefreshFailed => {
                    Some("run again with --update to authorize access")
                }
                AuthErrorKind::ConfigInvalid => {
                    Some("check the client-secret file given with --credentials-file")
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Auth(err) => write!(f, "authentication failed: {}", err),
            Self::Calendar(msg) => write!(f, "calendar error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcal_auth::ExchangeError;

    #[test]
    fn refresh_failure_suggests_update() {
        let err: ClientError = AuthError::RefreshFailed(
            ExchangeError::new("https://oauth2.googleapis.com/token", "invalid_grant")
                .with_status(400),
        )
        .into();
        assert_eq!(err.hint(), Some("run again with --update to authorize access"));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn calendar_error_has_no_hint() {
        let err = ClientError::Calendar("API error (500)".to_string());
        assert!(err.hint().is_none());
        assert_eq!(err.to_string(), "calendar error: API error (500)");
    }
}
