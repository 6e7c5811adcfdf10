//! Delegated Google credentials — one installed-app flow covering Gmail
//! and Sheets.
//!
//! Tokens are persisted to a local cache file. On startup the authenticator
//! loads the cache, refreshes an expired token silently when a refresh token
//! is present, and re-runs the interactive browser flow otherwise. Every
//! failure on this path is fatal to the process.

use std::path::Path;

use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod, read_application_secret};

use crate::error::AuthError;

/// Permission scopes requested during authorization: mail read/modify and
/// spreadsheet write.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// Shared credential handle for both Google services.
pub struct GoogleAuth {
    auth: DefaultAuthenticator,
}

impl GoogleAuth {
    /// Load the application secret and build the authenticator.
    ///
    /// Runs the interactive flow immediately only if the token cache has no
    /// usable credential; otherwise authorization is deferred to the first
    /// `bearer()` call.
    pub async fn acquire(client_secret: &Path, token_cache: &Path) -> Result<Self, AuthError> {
        let secret = read_application_secret(client_secret)
            .await
            .map_err(|source| AuthError::Secret {
                path: client_secret.display().to_string(),
                source,
            })?;

        let auth =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .persist_tokens_to_disk(token_cache)
                .build()
                .await
                .map_err(AuthError::Flow)?;

        Ok(Self { auth })
    }

    /// Fetch a current access token, refreshing through the cached refresh
    /// token when the stored one is expired.
    ///
    /// Called per request, so each poll cycle picks up the refresh path
    /// without re-running the interactive flow.
    pub async fn bearer(&self) -> Result<String, AuthError> {
        let token = self.auth.token(&SCOPES).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or(AuthError::EmptyToken)
    }
}
