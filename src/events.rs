//! Lambda event payloads.
//!
//! Only the fields the handlers read are modelled; everything else in the
//! S3 and API Gateway envelopes is ignored during deserialization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

// ── S3 object-created ──

#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Owner and file name recovered from an upload key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadKey {
    /// Decoded object key, as stored in the bucket.
    pub key: String,
    pub user_id: String,
    pub file_name: String,
}

impl UploadKey {
    /// Decode an event key of the form `{user_id}/{file_name}`.
    ///
    /// S3 event keys are form-encoded: `+` stands for a space and everything
    /// else is percent-escaped.
    pub fn parse(raw: &str) -> Result<Self> {
        let plus_decoded = raw.replace('+', " ");
        let key = urlencoding::decode(&plus_decoded)
            .map_err(|e| Error::InvalidEvent(format!("Key '{}' is not valid UTF-8: {}", raw, e)))?
            .into_owned();

        let (user_id, file_name) = key
            .split_once('/')
            .filter(|(user, file)| !user.is_empty() && !file.is_empty())
            .ok_or_else(|| {
                Error::InvalidEvent(format!("Key '{}' is not of the form user/file", key))
            })?;

        Ok(Self {
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            key,
        })
    }
}

// ── API Gateway proxy ──

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestEvent {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub authorizer: Option<Authorizer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorizer {
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PromptBody {
    prompt: String,
}

/// The validated pieces of a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInput {
    pub prompt: String,
    pub conversation_id: String,
    pub user_id: String,
}

impl ChatRequestEvent {
    pub fn into_input(self) -> Result<ChatInput> {
        let body = self
            .body
            .ok_or_else(|| Error::InvalidRequest("Request has no body".into()))?;
        let PromptBody { prompt } = serde_json::from_str(&body)
            .map_err(|e| Error::InvalidRequest(format!("Body must contain a prompt: {}", e)))?;

        let conversation_id = self
            .path_parameters
            .and_then(|mut params| params.remove("conversationid"))
            .ok_or_else(|| Error::InvalidRequest("Missing path parameter conversationid".into()))?;

        let user_id = self
            .request_context
            .and_then(|ctx| ctx.authorizer)
            .and_then(|auth| auth.claims.get("sub").and_then(|v| v.as_str()).map(String::from))
            .ok_or_else(|| Error::InvalidRequest("Missing caller identity claim 'sub'".into()))?;

        Ok(ChatInput {
            prompt,
            conversation_id,
            user_id,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    /// A 200 response whose body is `value` encoded as JSON, with open CORS headers.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let headers = [
            ("Content-Type", "application/json"),
            ("Access-Control-Allow-Headers", "*"),
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "*"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Ok(Self {
            status_code: 200,
            headers,
            body: serde_json::to_string(value)?,
        })
    }
}
