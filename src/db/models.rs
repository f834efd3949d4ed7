use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocStatus {
    Uploaded,
    Ready,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Uploaded => "UPLOADED",
            DocStatus::Ready => "READY",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationRef {
    pub conversationid: String,
    pub created: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Document {
    pub userid: String,
    pub documentid: String,
    pub filename: String,
    pub created: String,
    pub pages: u32,
    pub filesize: u64,
    pub docstatus: DocStatus,
    pub conversations: Vec<ConversationRef>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Ai,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Human => "human",
            MessageRole::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "human" => Some(MessageRole::Human),
            "ai" => Some(MessageRole::Ai),
            _ => None,
        }
    }
}

/// One turn in a conversation history record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

impl HistoryMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Ai,
            content: content.into(),
        }
    }
}

/// Sidecar read by the knowledge base ingestion job for metadata filtering.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSidecar {
    pub metadata_attributes: MetadataAttributes,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetadataAttributes {
    pub userid: String,
    pub documentid: String,
    pub filename: String,
    pub created: String,
    pub pages: String,
}

impl From<&Document> for MetadataSidecar {
    fn from(doc: &Document) -> Self {
        MetadataSidecar {
            metadata_attributes: MetadataAttributes {
                userid: doc.userid.clone(),
                documentid: doc.documentid.clone(),
                filename: doc.filename.clone(),
                created: doc.created.clone(),
                pages: doc.pages.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_json_layout() {
        let doc = Document {
            userid: "u1".into(),
            documentid: "d1".into(),
            filename: "a.pdf".into(),
            created: "2024-01-01T00:00:00.000000Z".into(),
            pages: 3,
            filesize: 100,
            docstatus: DocStatus::Uploaded,
            conversations: vec![],
        };
        let value = serde_json::to_value(MetadataSidecar::from(&doc)).unwrap();
        assert_eq!(value["metadataAttributes"]["userid"], "u1");
        assert_eq!(value["metadataAttributes"]["pages"], "3");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DocStatus::Uploaded.as_str(), "UPLOADED");
        assert_eq!(serde_json::to_string(&DocStatus::Ready).unwrap(), "\"READY\"");
    }
}
