//! Error types for token acquisition.
//!
//! Every failure of the token cache maps to one [`AuthErrorKind`]. Token
//! endpoint failures carry an [`ExchangeError`] with the endpoint URL and the
//! HTTP status, when one was received, so callers can log and decide.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The category of an authentication error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Configuration is missing required fields.
    ConfigInvalid,
    /// No stored credential and no interactive grant possible.
    CredentialUnavailable,
    /// Refresh exchange rejected or unreachable.
    RefreshFailed,
    /// Authorization code exchange rejected.
    GrantExchangeFailed,
    /// Writing the credential store failed.
    PersistFailed,
    /// The credential store holds malformed data.
    StoreCorrupt,
}

impl AuthErrorKind {
    /// Returns a stable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "config_invalid",
            Self::CredentialUnavailable => "credential_unavailable",
            Self::RefreshFailed => "refresh_failed",
            Self::GrantExchangeFailed => "grant_exchange_failed",
            Self::PersistFailed => "persist_failed",
            Self::StoreCorrupt => "store_corrupt",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed call to the token (or authorization) endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint}{}: {message}", status_suffix(.status))]
pub struct ExchangeError {
    /// The endpoint that was called.
    pub endpoint: String,
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// What went wrong.
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ExchangeError {
    /// Creates an exchange error without an HTTP status.
    pub fn new(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Errors returned by the token cache.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Configuration missing required fields.
    #[error("invalid OAuth configuration: {message}")]
    ConfigInvalid { message: String },

    /// No usable credential could be obtained without a human.
    #[error("no usable credential: {message}")]
    CredentialUnavailable { message: String },

    /// Refresh exchange failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] ExchangeError),

    /// Authorization code exchange failed.
    #[error("authorization code exchange failed: {0}")]
    GrantExchangeFailed(#[source] ExchangeError),

    /// Writing the credential store failed.
    #[error("failed to persist credential to {}: {source}", .path.display())]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The credential store could not be read or parsed.
    #[error("credential store {} is unreadable: {message}", .path.display())]
    StoreCorrupt { path: PathBuf, message: String },
}

impl AuthError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Creates a credential unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::CredentialUnavailable {
            message: message.into(),
        }
    }

    /// Creates a persist error.
    pub fn persist(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PersistFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates a store corruption error.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::ConfigInvalid { .. } => AuthErrorKind::ConfigInvalid,
            Self::CredentialUnavailable { .. } => AuthErrorKind::CredentialUnavailable,
            Self::RefreshFailed(_) => AuthErrorKind::RefreshFailed,
            Self::GrantExchangeFailed(_) => AuthErrorKind::GrantExchangeFailed,
            Self::PersistFailed { .. } => AuthErrorKind::PersistFailed,
            Self::StoreCorrupt { .. } => AuthErrorKind::StoreCorrupt,
        }
    }

    /// Returns the endpoint failure behind an exchange error.
    pub fn exchange(&self) -> Option<&ExchangeError> {
        match self {
            Self::RefreshFailed(e) | Self::GrantExchangeFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for token cache operations.
pub type AuthResult<T> = Result<T, AuthError>;
