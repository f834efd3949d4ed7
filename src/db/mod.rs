pub mod models;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use models::{ConversationRef, DocStatus, Document, HistoryMessage, MessageRole};
use std::collections::HashMap;

use crate::error::{sdk_message, Error, Result};

type Item = HashMap<String, AttributeValue>;

/// Document records, keyed by (`userid`, `documentid`).
#[async_trait]
pub trait DocumentTable: Send + Sync {
    async fn put_document(&self, document: &Document) -> Result<()>;
    async fn set_status(&self, user_id: &str, document_id: &str, status: DocStatus) -> Result<()>;
}

/// Conversation history records, keyed by `SessionId`.
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Write an empty history, replacing whatever was stored under the id.
    async fn create_session(&self, session_id: &str) -> Result<()>;
    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>>;
    async fn append(&self, session_id: &str, messages: &[HistoryMessage]) -> Result<()>;
}

pub struct DocumentRecords {
    client: Client,
    table: String,
}

impl DocumentRecords {
    pub fn new(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }
}

/// Table-backed conversation memory.
pub struct ChatHistory {
    client: Client,
    table: String,
}

impl ChatHistory {
    pub fn new(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }
}

#[async_trait]
impl DocumentTable for DocumentRecords {
    async fn put_document(&self, document: &Document) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(document_to_item(document)))
            .send()
            .await
            .map_err(|e| Error::Table(sdk_message(e)))?;
        Ok(())
    }

    async fn set_status(&self, user_id: &str, document_id: &str, status: DocStatus) -> Result<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key("userid", AttributeValue::S(user_id.to_string()))
            .key("documentid", AttributeValue::S(document_id.to_string()))
            .update_expression("SET docstatus = :status")
            .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
            .send()
            .await
            .map_err(|e| Error::Table(sdk_message(e)))?;
        Ok(())
    }
}

#[async_trait]
impl ChatHistoryStore for ChatHistory {
    async fn create_session(&self, session_id: &str) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item("SessionId", AttributeValue::S(session_id.to_string()))
            .item("History", AttributeValue::L(Vec::new()))
            .send()
            .await
            .map_err(|e| Error::Table(sdk_message(e)))?;
        Ok(())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("SessionId", AttributeValue::S(session_id.to_string()))
            .send()
            .await
            .map_err(|e| Error::Table(sdk_message(e)))?;

        match output.item() {
            Some(item) => history_from_item(item),
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, session_id: &str, messages: &[HistoryMessage]) -> Result<()> {
        let turns = messages.iter().map(message_to_attr).collect();
        self.client
            .update_item()
            .table_name(&self.table)
            .key("SessionId", AttributeValue::S(session_id.to_string()))
            .update_expression("SET History = list_append(if_not_exists(History, :empty), :turns)")
            .expression_attribute_values(":empty", AttributeValue::L(Vec::new()))
            .expression_attribute_values(":turns", AttributeValue::L(turns))
            .send()
            .await
            .map_err(|e| Error::Table(sdk_message(e)))?;
        Ok(())
    }
}

// ── Item mapping ──

fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub(crate) fn document_to_item(doc: &Document) -> Item {
    let conversations = doc
        .conversations
        .iter()
        .map(|c: &ConversationRef| {
            AttributeValue::M(HashMap::from([
                ("conversationid".to_string(), s(&c.conversationid)),
                ("created".to_string(), s(&c.created)),
            ]))
        })
        .collect();

    HashMap::from([
        ("userid".to_string(), s(&doc.userid)),
        ("documentid".to_string(), s(&doc.documentid)),
        ("filename".to_string(), s(&doc.filename)),
        ("created".to_string(), s(&doc.created)),
        ("pages".to_string(), s(&doc.pages.to_string())),
        ("filesize".to_string(), s(&doc.filesize.to_string())),
        ("docstatus".to_string(), s(doc.docstatus.as_str())),
        ("conversations".to_string(), AttributeValue::L(conversations)),
    ])
}

/// Stored turns follow the `{type, data: {type, content}}` message layout.
pub(crate) fn message_to_attr(message: &HistoryMessage) -> AttributeValue {
    let role = message.role.as_str();
    let data = HashMap::from([
        ("type".to_string(), s(role)),
        ("content".to_string(), s(&message.content)),
    ]);
    AttributeValue::M(HashMap::from([
        ("type".to_string(), s(role)),
        ("data".to_string(), AttributeValue::M(data)),
    ]))
}

pub(crate) fn history_from_item(item: &Item) -> Result<Vec<HistoryMessage>> {
    let Some(history) = item.get("History") else {
        return Ok(Vec::new());
    };
    let turns = history
        .as_l()
        .map_err(|_| Error::Table("History attribute is not a list".into()))?;

    turns
        .iter()
        .map(|turn| {
            let turn = turn
                .as_m()
                .map_err(|_| Error::Table("History entry is not a map".into()))?;
            let role = turn
                .get("type")
                .and_then(|v| v.as_s().ok())
                .and_then(|v| MessageRole::parse(v))
                .ok_or_else(|| Error::Table("History entry has no known type".into()))?;
            let content = turn
                .get("data")
                .and_then(|v| v.as_m().ok())
                .and_then(|data| data.get("content"))
                .and_then(|v| v.as_s().ok())
                .ok_or_else(|| Error::Table("History entry has no content".into()))?;
            Ok(HistoryMessage {
                role,
                content: content.clone(),
            })
        })
        .collect()
}
