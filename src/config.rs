//! Configuration, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default poll interval: 20 minutes.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 1200;

/// Default cap on unread messages fetched per cycle.
const DEFAULT_MAX_MESSAGES: u32 = 5;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generation provider API key.
    pub gemini_api_key: SecretString,
    /// Target spreadsheet for the triage log.
    pub spreadsheet_id: String,
    /// Sheet tab receiving appended rows.
    pub sheet_name: String,
    /// Directory for local plain-text archives.
    pub archive_dir: PathBuf,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Unread messages fetched per cycle.
    pub max_messages: u32,
    /// OAuth application secret (client secret JSON).
    pub client_secret: PathBuf,
    /// Persisted token cache.
    pub token_cache: PathBuf,
    /// Generation model name.
    pub model: String,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// `GEMINI_API_KEY` and `TRIAGE_SPREADSHEET_ID` are required; everything
    /// else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;

        let spreadsheet_id = std::env::var("TRIAGE_SPREADSHEET_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TRIAGE_SPREADSHEET_ID".into()))?;

        let sheet_name =
            std::env::var("TRIAGE_SHEET_NAME").unwrap_or_else(|_| "Sheet1".to_string());

        let archive_dir = std::env::var("TRIAGE_ARCHIVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("email_archive"));

        let poll_interval_secs: u64 = std::env::var("TRIAGE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let max_messages: u32 = std::env::var("TRIAGE_MAX_MESSAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_MESSAGES);

        let client_secret = std::env::var("TRIAGE_CLIENT_SECRET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("credentials.json"));

        let token_cache = std::env::var("TRIAGE_TOKEN_CACHE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tokencache.json"));

        let model =
            std::env::var("TRIAGE_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        Ok(Self {
            gemini_api_key,
            spreadsheet_id,
            sheet_name,
            archive_dir,
            poll_interval_secs,
            max_messages,
            client_secret,
            token_cache,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_requires_api_key() {
        // SAFETY: this test runs in isolation; no other thread reads these
        // variables concurrently.
        unsafe { std::env::remove_var("GEMINI_API_KEY") };
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "GEMINI_API_KEY"));
    }
}
