use crate::smtp::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a dispatch run.
///
/// Anything that only affects a single recipient is a [`SkipReason`]
/// instead and never travels through this type.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template variable missing: {0}")]
    MissingVariable(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Missing SMTP credentials: set --username/--password or MAIL_USERNAME/MAIL_PASSWORD")]
    MissingCredentials,

    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<config::ConfigError> for DispatchError {
    fn from(err: config::ConfigError) -> Self {
        DispatchError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Why a single recipient was not delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("invalid address")]
    InvalidAddress,

    #[error("duplicate")]
    Duplicate,

    #[error("no consent")]
    NoConsent,

    #[error("message could not be built: {0}")]
    Build(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}
