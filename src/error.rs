use aws_smithy_types::error::display::DisplayErrorContext;

use crate::llm::LlmError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Table error: {0}")]
    Table(String),
    #[error("Parameter store error: {0}")]
    Parameter(String),
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),
    #[error("Model error: {0}")]
    Model(#[from] LlmError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Render an AWS SDK error with its full source chain.
pub(crate) fn sdk_message<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}
