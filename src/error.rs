//! Error types for the triage agent.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Google authorization errors. All of these are fatal — the agent
/// cannot proceed without valid delegated credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to read application secret from {path}: {source}")]
    Secret {
        path: String,
        source: std::io::Error,
    },

    #[error("Authorization flow failed: {0}")]
    Flow(std::io::Error),

    #[error("Token acquisition failed: {0}")]
    Token(#[from] yup_oauth2::Error),

    #[error("Authenticator returned an empty access token")]
    EmptyToken,
}

/// Gmail API errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode message body: {0}")]
    Decode(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Sheets API errors.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },
}

/// Per-message pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Archive write failed: {0}")]
    Archive(#[from] std::io::Error),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
