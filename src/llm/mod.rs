pub mod bedrock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub delta: String,
    pub done: bool,
}

/// Callback receiving tokens as the model produces them.
pub type ChunkHandler = Arc<dyn Fn(StreamChunk) + Send + Sync>;

/// A hosted text-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, returning the full generated text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Invoke error: {0}")]
    Invoke(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
