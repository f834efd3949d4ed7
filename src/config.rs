use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL_ID: &str = "mistral.mistral-7b-instruct-v0:2";
pub const DEFAULT_MODEL_REGION: &str = "ap-southeast-2";
const DEFAULT_PRESIGNED_EXPIRY_SECS: u64 = 300;
const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_TEMPERATURE: f32 = 0.5;

/// How the metadata sidecar reaches the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarUpload {
    /// Issue a presigned PUT URL and upload through it.
    Presigned { expires_in: Duration },
    /// Plain `PutObject` with the function's own credentials.
    Direct,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub document_table: String,
    pub memory_table: String,
    pub bucket: String,
    pub knowledge_base_details_path: String,
    pub sidecar_upload: SidecarUpload,
}

impl UploadConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let sidecar_upload = match lookup("SIDECAR_UPLOAD").as_deref() {
            None | Some("presigned") => {
                let secs = parse_or(&lookup, "PRESIGNED_URL_EXPIRY_SECS", DEFAULT_PRESIGNED_EXPIRY_SECS)?;
                SidecarUpload::Presigned {
                    expires_in: Duration::from_secs(secs),
                }
            }
            Some("direct") => SidecarUpload::Direct,
            Some(other) => {
                return Err(Error::Config(format!(
                    "SIDECAR_UPLOAD must be 'presigned' or 'direct', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            document_table: required(&lookup, "DOCUMENT_TABLE")?,
            memory_table: required(&lookup, "MEMORY_TABLE")?,
            bucket: required(&lookup, "BUCKET")?,
            knowledge_base_details_path: required(&lookup, "KNOWLEDGE_BASE_DETAILS_SSM_PATH")?,
            sidecar_upload,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_id: String,
    pub region: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub memory_table: String,
    pub knowledge_base_details_path: String,
    pub model: ModelConfig,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let model = ModelConfig {
            model_id: lookup("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            region: lookup("MODEL_REGION").unwrap_or_else(|| DEFAULT_MODEL_REGION.to_string()),
            max_tokens: parse_or(&lookup, "MODEL_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            temperature: parse_or(&lookup, "MODEL_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        };

        Ok(Self {
            memory_table: required(&lookup, "MEMORY_TABLE")?,
            knowledge_base_details_path: required(&lookup, "KNOWLEDGE_BASE_DETAILS_SSM_PATH")?,
            model,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", key)))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
