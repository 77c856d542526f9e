//! Interactive authorization grant for command-line use.
//!
//! The user opens the authorization URL in a browser, approves access and
//! pastes the code back into the terminal. Each grant gets a fresh
//! anti-forgery `state` and a PKCE (RFC 7636) verifier/challenge pair.
//!
//! What the user pastes can be either the bare code or the whole redirect URL
//! (or its query string). In the latter case the `state` it carries must match
//! the one that was sent.

use std::io::{self, BufRead, IsTerminal, Write};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{AuthError, AuthResult};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Length of the random state (in bytes, before base64 encoding).
const STATE_LENGTH: usize = 16;

/// Per-grant secrets.
#[derive(Debug)]
pub struct GrantSession {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

/// Why the pasted authorization input was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeInputError {
    /// Nothing usable was entered.
    Empty,
    /// The provider reported an error instead of a code.
    Denied(String),
    /// The returned state does not match the one sent.
    StateMismatch,
}

impl GrantSession {
    /// Creates a session with a random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_token(STATE_LENGTH);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the S256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the URL the user must visit to approve access.
    pub fn authorization_url(&self, config: &OAuthConfig) -> AuthResult<Url> {
        let mut url = Url::parse(&config.auth_url).map_err(|e| {
            AuthError::config(format!(
                "invalid authorization endpoint {:?}: {}",
                config.auth_url, e
            ))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", &self.state)
            .append_pair("code_challenge", &self.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Extracts the authorization code from what the user pasted.
    pub fn parse_code(&self, input: &str) -> Result<String, CodeInputError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CodeInputError::Empty);
        }

        if !looks_like_query(input) {
            return Ok(input.to_string());
        }

        let query = input.split_once('?').map_or(input, |(_, query)| query);
        let query = query.split_once('#').map_or(query, |(query, _)| query);

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(CodeInputError::Denied(error));
        }
        if let Some(state) = state
            && state != self.state
        {
            return Err(CodeInputError::StateMismatch);
        }

        code.filter(|c| !c.is_empty()).ok_or(CodeInputError::Empty)
    }
}

impl Default for GrantSession {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn looks_like_query(input: &str) -> bool {
    input.contains("code=") || input.contains("error=")
}

/// Presents the authorization URL and collects the code.
pub trait CodePrompt: Send + Sync {
    /// Whether a human can answer the prompt.
    fn is_interactive(&self) -> bool;

    /// Shows `authorization_url` and returns the line the user typed.
    fn prompt(&self, authorization_url: &str) -> io::Result<String>;
}

/// Prompt on the controlling terminal.
///
/// Instructions go to stderr so that stdout only carries program output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl CodePrompt for ConsolePrompt {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn prompt(&self, authorization_url: &str) -> io::Result<String> {
        let mut stderr = io::stderr().lock();
        writeln!(
            stderr,
            "Go to the following link in your browser. After completing the \
             authorization flow, enter the authorization code on the command line:\n\n{}\n",
            authorization_url
        )?;
        write!(stderr, "Authorization code: ")?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed before a code was entered",
            ));
        }
        Ok(line)
    }
}
