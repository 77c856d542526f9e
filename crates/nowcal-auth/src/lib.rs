//! OAuth 2.0 token cache for command-line tools.
//!
//! The crate hands out an access token that is valid right now, touching the
//! network or the user only when it has to:
//!
//! - [`TokenCacheManager`] - `acquire`, `load` and `persist` over one token file
//! - [`TokenStore`] - atomic, owner-only JSON storage of a [`Credential`]
//! - [`TokenEndpoint`] - code and refresh exchanges ([`HttpTokenEndpoint`] in production)
//! - [`CodePrompt`] - shows the authorization URL and reads the pasted code
//! - [`AuthError`] - one variant per failure, see [`AuthErrorKind`]
//!
//! # Flow
//!
//! ```text
//!             acquire(force_interactive)
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐           ┌─────────────┐
//!   │ TokenStore  │──stale──▶ │  refresh /  │
//!   │   load()    │           │   grant     │
//!   └──────┬──────┘           └──────┬──────┘
//!          │ valid                   │ persist()
//!          ▼                         ▼
//!       Credential ◀─────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nowcal_auth::{OAuthConfig, TokenCacheManager, TokenStore};
//!
//! let config = OAuthConfig::from_client_secrets_file("credentials.json")?;
//! let manager = TokenCacheManager::for_console(&config, TokenStore::new("token.json"))?;
//! let credential = manager.acquire(&config, false).await?;
//! ```

pub mod config;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod grant;
pub mod manager;
pub mod store;

// Re-export main types at crate root
pub use config::{CALENDAR_READONLY_SCOPE, OAuthConfig};
pub use credential::{Credential, CredentialState};
pub use endpoint::{BoxFuture, ExchangeResult, HttpTokenEndpoint, TokenEndpoint, TokenResponse};
pub use error::{AuthError, AuthErrorKind, AuthResult, ExchangeError};
pub use grant::{CodeInputError, CodePrompt, ConsolePrompt, GrantSession};
pub use manager::TokenCacheManager;
pub use store::TokenStore;
