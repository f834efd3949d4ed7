//! In-memory stand-ins for the AWS services, shared by the unit tests.

use async_trait::async_trait;
use lopdf::{dictionary, Object};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::db::models::{DocStatus, Document, HistoryMessage};
use crate::db::{ChatHistoryStore, DocumentTable};
use crate::error::{Error, Result};
use crate::knowledge::{IngestionService, KnowledgeBaseSearch, RetrievalConfig, RetrievedDocument};
use crate::llm::{LanguageModel, LlmError};
use crate::settings::{KnowledgeBaseDetails, ParameterStore};
use crate::storage::ObjectStore;

/// Build a minimal PDF with `pages` blank pages.
pub fn pdf_with_pages(pages: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub presigned: Option<Duration>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    fail_puts: bool,
}

impl MemoryObjectStore {
    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Default::default()
        }
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: "application/pdf".into(),
                presigned: None,
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn store(&self, bucket: &str, key: &str, object: StoredObject) -> Result<()> {
        if self.fail_puts {
            return Err(Error::Storage("put rejected".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), object);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| Error::Storage(format!("NoSuchKey: {}/{}", bucket, key)))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.store(
            bucket,
            key,
            StoredObject {
                body,
                content_type: content_type.into(),
                presigned: None,
            },
        )
    }

    async fn put_object_presigned(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<()> {
        self.store(
            bucket,
            key,
            StoredObject {
                body,
                content_type: content_type.into(),
                presigned: Some(expires_in),
            },
        )
    }
}

/// Document and memory tables in one place.
#[derive(Default)]
pub struct MemoryTables {
    documents: Mutex<Vec<Document>>,
    sessions: Mutex<HashMap<String, Vec<HistoryMessage>>>,
}

impl MemoryTables {
    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.lock().unwrap().keys().cloned().collect()
    }

    pub fn history(&self, session_id: &str) -> Vec<HistoryMessage> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_session(&self, session_id: &str, messages: Vec<HistoryMessage>) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), messages);
    }
}

#[async_trait]
impl DocumentTable for MemoryTables {
    async fn put_document(&self, document: &Document) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        documents.retain(|d| !(d.userid == document.userid && d.documentid == document.documentid));
        documents.push(document.clone());
        Ok(())
    }

    async fn set_status(&self, user_id: &str, document_id: &str, status: DocStatus) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .iter_mut()
            .find(|d| d.userid == user_id && d.documentid == document_id)
            .ok_or_else(|| Error::Table(format!("No document {}/{}", user_id, document_id)))?;
        doc.docstatus = status;
        Ok(())
    }
}

#[async_trait]
impl ChatHistoryStore for MemoryTables {
    async fn create_session(&self, session_id: &str) -> Result<()> {
        self.seed_session(session_id, Vec::new());
        Ok(())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        Ok(self.history(session_id))
    }

    async fn append(&self, session_id: &str, messages: &[HistoryMessage]) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}

pub struct StaticParameters {
    values: HashMap<String, String>,
}

impl StaticParameters {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            values: HashMap::from([(name.to_string(), value.to_string())]),
        }
    }
}

#[async_trait]
impl ParameterStore for StaticParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Parameter(format!("ParameterNotFound: {}", name)))
    }
}

#[derive(Default)]
pub struct RecordingIngestion {
    requests: Mutex<Vec<KnowledgeBaseDetails>>,
    fail: bool,
}

impl RecordingIngestion {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<KnowledgeBaseDetails> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestionService for RecordingIngestion {
    async fn start_ingestion_job(&self, details: &KnowledgeBaseDetails) -> Result<()> {
        self.requests.lock().unwrap().push(details.clone());
        if self.fail {
            return Err(Error::KnowledgeBase("ConflictException: job already running".into()));
        }
        Ok(())
    }
}

/// Knowledge base search returning fixed chunks and capturing each call.
pub struct RecordingSearch {
    chunks: Vec<String>,
    calls: Mutex<Vec<(RetrievalConfig, String)>>,
}

impl RecordingSearch {
    pub fn new(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(String::from).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(RetrievalConfig, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBaseSearch for RecordingSearch {
    async fn retrieve(&self, config: &RetrievalConfig, query: &str) -> Result<Vec<RetrievedDocument>> {
        self.calls
            .lock()
            .unwrap()
            .push((config.clone(), query.to_string()));
        Ok(self
            .chunks
            .iter()
            .map(|content| RetrievedDocument {
                content: content.clone(),
                score: Some(0.5),
                metadata: HashMap::new(),
            })
            .collect())
    }
}

/// Model returning scripted replies in order and recording prompts.
pub struct ScriptedLlm {
    replies: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(LlmError::Invoke("ThrottlingException".into()));
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::Invoke("no scripted reply left".into()))
    }
}
