use super::{ChunkHandler, LanguageModel, LlmError, StreamChunk};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::ResponseStream;
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::sdk_message;

#[derive(Serialize)]
struct MistralRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct MistralChunk {
    outputs: Vec<MistralOutput>,
}

#[derive(Deserialize)]
struct MistralOutput {
    text: String,
    stop_reason: Option<String>,
}

/// Text completion against a Bedrock-hosted Mistral model, streamed.
pub struct BedrockLlm {
    client: Client,
    config: ModelConfig,
    on_chunk: Option<ChunkHandler>,
}

impl BedrockLlm {
    pub fn new(client: Client, config: ModelConfig) -> Self {
        Self {
            client,
            config,
            on_chunk: None,
        }
    }

    pub fn with_stream_handler(mut self, handler: ChunkHandler) -> Self {
        self.on_chunk = Some(handler);
        self
    }

    fn emit(&self, chunk: StreamChunk) {
        if let Some(handler) = &self.on_chunk {
            handler(chunk);
        }
    }
}

fn build_body(config: &ModelConfig, prompt: &str) -> Result<Vec<u8>, LlmError> {
    serde_json::to_vec(&MistralRequest {
        prompt,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    })
    .map_err(|e| LlmError::Parse(e.to_string()))
}

/// Decode one streamed payload into (text delta, finished).
fn parse_chunk(bytes: &[u8]) -> Result<(String, bool), LlmError> {
    let chunk: MistralChunk =
        serde_json::from_slice(bytes).map_err(|e| LlmError::Parse(e.to_string()))?;
    let mut text = String::new();
    let mut done = false;
    for output in chunk.outputs {
        text.push_str(&output.text);
        done |= output.stop_reason.is_some();
    }
    Ok((text, done))
}

#[async_trait]
impl LanguageModel for BedrockLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = build_body(&self.config, prompt)?;

        let mut output = self
            .client
            .invoke_model_with_response_stream()
            .model_id(&self.config.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| LlmError::Invoke(sdk_message(e)))?;

        let mut full_content = String::new();

        while let Some(event) = output
            .body
            .recv()
            .await
            .map_err(|e| LlmError::Stream(sdk_message(e)))?
        {
            let ResponseStream::Chunk(part) = event else {
                continue;
            };
            let Some(bytes) = part.bytes() else {
                continue;
            };

            let (delta, done) = parse_chunk(bytes.as_ref())?;
            if !delta.is_empty() {
                full_content.push_str(&delta);
                self.emit(StreamChunk { delta, done: false });
            }
            if done {
                break;
            }
        }

        self.emit(StreamChunk {
            delta: String::new(),
            done: true,
        });
        Ok(full_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        ModelConfig {
            model_id: "mistral.mistral-7b-instruct-v0:2".into(),
            region: "ap-southeast-2".into(),
            max_tokens: 256,
            temperature: 0.2,
        }
    }

    #[test]
    fn test_build_body() {
        let body = build_body(&config(), "Question: hi").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["prompt"], "Question: hi");
        assert_eq!(value["max_tokens"], 256);
    }

    #[test]
    fn test_parse_chunk_partial() {
        let (text, done) = parse_chunk(br#"{"outputs":[{"text":" Hello","stop_reason":null}]}"#).unwrap();
        assert_eq!(text, " Hello");
        assert!(!done);
    }

    #[test]
    fn test_parse_chunk_final() {
        let (text, done) = parse_chunk(br#"{"outputs":[{"text":".","stop_reason":"stop"}]}"#).unwrap();
        assert_eq!(text, ".");
        assert!(done);
    }

    #[test]
    fn test_parse_chunk_garbage() {
        assert!(matches!(parse_chunk(b"not json"), Err(LlmError::Parse(_))));
    }
}
