//! The token cache manager.
//!
//! [`TokenCacheManager::acquire`] returns a credential that is usable right
//! now, walking this state machine once per call:
//!
//! ```text
//! START -> (force_interactive) -> GRANT
//! START -> LOAD -> (absent) -> FAILED(CredentialUnavailable)
//! LOAD -> (valid) -> RETURN
//! LOAD -> (stale, refreshable) -> REFRESH -> (ok) -> RETURN
//! REFRESH -> (fail) -> FAILED(RefreshFailed)
//! LOAD -> (stale, not refreshable) -> GRANT
//! LOAD -> (granted scope misses a requested one) -> GRANT
//! GRANT -> (ok) -> RETURN
//! GRANT -> (fail) -> FAILED(GrantExchangeFailed)
//! ```
//!
//! A call writes the store at most once, and only after a refresh or grant.
//! A store write failure is logged and the fresh credential is still
//! returned. Nothing is retried.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::OAuthConfig;
use crate::credential::{Credential, CredentialState};
use crate::endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenResponse};
use crate::error::{AuthError, AuthResult, ExchangeError};
use crate::grant::{CodeInputError, CodePrompt, ConsolePrompt, GrantSession};
use crate::store::TokenStore;

/// Loads, refreshes, grants and persists credentials for one token file.
#[derive(Debug)]
pub struct TokenCacheManager<E = HttpTokenEndpoint, P = ConsolePrompt> {
    store: TokenStore,
    endpoint: E,
    prompt: P,
}

impl TokenCacheManager {
    /// Creates a manager that talks to the real token endpoint and prompts
    /// on the terminal.
    pub fn for_console(config: &OAuthConfig, store: TokenStore) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self::new(store, HttpTokenEndpoint::new(config)?, ConsolePrompt))
    }
}

impl<E, P> TokenCacheManager<E, P>
where
    E: TokenEndpoint,
    P: CodePrompt,
{
    /// Creates a manager from its collaborators.
    pub fn new(store: TokenStore, endpoint: E, prompt: P) -> Self {
        Self {
            store,
            endpoint,
            prompt,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Loads the stored credential; corrupt or missing yields `None`.
    pub fn load(&self) -> Option<Credential> {
        self.store.load()
    }

    /// Writes `credential` to the store.
    pub fn persist(&self, credential: &Credential) -> AuthResult<()> {
        self.store.persist(credential)
    }

    /// Returns a credential valid at the moment of return.
    ///
    /// With `force_interactive` the stored credential is ignored and the
    /// interactive grant runs. Without it, a missing store is an error
    /// ([`AuthError::CredentialUnavailable`]): the first grant must be asked
    /// for explicitly.
    pub async fn acquire(
        &self,
        config: &OAuthConfig,
        force_interactive: bool,
    ) -> AuthResult<Credential> {
        config.validate()?;

        if force_interactive {
            info!("interactive grant requested");
            return self.grant(config).await;
        }

        let stored = self.store.load().ok_or_else(|| {
            AuthError::unavailable(format!(
                "no stored credential at {}; run once with the interactive grant",
                self.store.path().display()
            ))
        })?;

        // Token files without a scope list predate scope tracking and are trusted.
        if !stored.scope.is_empty() && !stored.has_scopes(&config.scopes) {
            info!(
                granted = ?stored.scope,
                requested = ?config.scopes,
                "stored credential lacks requested scopes"
            );
            return self.grant(config).await;
        }

        match stored.state(Utc::now(), config.safety_margin) {
            CredentialState::Valid => {
                debug!(expiry = %stored.expiry, "stored credential is valid");
                Ok(stored)
            }
            CredentialState::Refreshable => self.refresh(config, stored).await,
            CredentialState::ExpiredTerminal => {
                info!(
                    expiry = %stored.expiry,
                    "stored credential is stale and has no refresh token"
                );
                self.grant(config).await
            }
        }
    }

    async fn refresh(&self, config: &OAuthConfig, stale: Credential) -> AuthResult<Credential> {
        let Some(refresh_token) = stale.refresh_token.as_deref() else {
            return Err(AuthError::unavailable("stored credential has no refresh token"));
        };
        debug!(expiry = %stale.expiry, "refreshing stale access token");

        let response = self
            .endpoint
            .refresh(config, refresh_token)
            .await
            .map_err(AuthError::RefreshFailed)?;

        let credential = Self::finish(config, response, Some(refresh_token), &stale.scope)
            .map_err(AuthError::RefreshFailed)?;
        self.persist_best_effort(&credential);
        Ok(credential)
    }

    async fn grant(&self, config: &OAuthConfig) -> AuthResult<Credential> {
        if !self.prompt.is_interactive() {
            return Err(AuthError::unavailable(
                "the interactive grant needs a terminal to read the authorization code",
            ));
        }

        let session = GrantSession::new();
        let url = session.authorization_url(config)?;
        debug!(url = %url, "authorization URL");

        let input = self.prompt.prompt(url.as_str()).map_err(|e| {
            AuthError::unavailable(format!("failed to read authorization code: {}", e))
        })?;

        let code = session.parse_code(&input).map_err(|e| match e {
            CodeInputError::Empty => AuthError::unavailable("no authorization code entered"),
            CodeInputError::Denied(reason) => AuthError::GrantExchangeFailed(ExchangeError::new(
                &config.auth_url,
                format!("authorization denied: {}", reason),
            )),
            CodeInputError::StateMismatch => AuthError::GrantExchangeFailed(ExchangeError::new(
                &config.auth_url,
                "state mismatch in pasted redirect",
            )),
        })?;

        let response = self
            .endpoint
            .exchange_code(config, &code, &session.verifier)
            .await
            .map_err(AuthError::GrantExchangeFailed)?;

        let credential = Self::finish(config, response, None, &config.scopes)
            .map_err(AuthError::GrantExchangeFailed)?;
        self.persist_best_effort(&credential);
        info!(expiry = %credential.expiry, "interactive grant complete");
        Ok(credential)
    }

    /// Turns an endpoint response into a credential that is not yet expired.
    fn finish(
        config: &OAuthConfig,
        response: TokenResponse,
        previous_refresh_token: Option<&str>,
        fallback_scope: &[String],
    ) -> Result<Credential, ExchangeError> {
        let credential = response
            .into_credential(Utc::now(), previous_refresh_token, fallback_scope)
            .map_err(|message| ExchangeError::new(&config.token_url, message))?;

        if credential.is_expired_at(Utc::now()) {
            return Err(ExchangeError::new(
                &config.token_url,
                format!("token endpoint returned a credential already expired at {}", credential.expiry),
            ));
        }
        if !credential.is_valid_at(Utc::now(), config.safety_margin) {
            warn!(
                expiry = %credential.expiry,
                "new credential expires within the safety margin"
            );
        }
        Ok(credential)
    }

    fn persist_best_effort(&self, credential: &Credential) {
        if let Err(e) = self.store.persist(credential) {
            warn!(
                error = %e,
                "credential is usable for this run but was not saved; \
                 the next run will need the interactive grant again"
            );
        }
    }
}
