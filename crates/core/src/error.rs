use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),
    #[error("Missing message attribute: {0}")]
    MissingAttribute(&'static str),
    #[error("Unknown transaction category: '{0}'")]
    UnknownCategory(String),
    #[error("Unknown processing status: '{0}'")]
    UnknownStatus(String),
}
