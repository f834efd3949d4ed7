use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{SidecarUpload, UploadConfig};
use crate::db::models::{ConversationRef, DocStatus, Document, MetadataSidecar};
use crate::db::{ChatHistoryStore, DocumentTable};
use crate::doc_processor;
use crate::error::Result;
use crate::events::{S3Event, S3EventRecord, UploadKey};
use crate::ids::short_id;
use crate::knowledge::IngestionService;
use crate::settings::{KnowledgeBaseDetails, ParameterStore};
use crate::storage::ObjectStore;

pub const SIDECAR_SUFFIX: &str = ".metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IngestionResult {
    Requested,
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub key: String,
    pub document_id: String,
    pub conversation_id: String,
    pub pages: u32,
    pub status: DocStatus,
    pub ingestion: IngestionResult,
    pub sidecar_uploaded: bool,
}

/// Reacts to PDFs landing in the upload bucket.
pub struct UploadTrigger {
    config: UploadConfig,
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentTable>,
    history: Arc<dyn ChatHistoryStore>,
    parameters: Arc<dyn ParameterStore>,
    ingestion: Arc<dyn IngestionService>,
}

impl UploadTrigger {
    pub fn new(
        config: UploadConfig,
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentTable>,
        history: Arc<dyn ChatHistoryStore>,
        parameters: Arc<dyn ParameterStore>,
        ingestion: Arc<dyn IngestionService>,
    ) -> Self {
        Self {
            config,
            objects,
            documents,
            history,
            parameters,
            ingestion,
        }
    }

    /// Process every record of the event in order; the first hard failure
    /// aborts the invocation.
    pub async fn handle(&self, event: S3Event) -> Result<Vec<UploadOutcome>> {
        let mut outcomes = Vec::with_capacity(event.records.len());
        for record in &event.records {
            if let Some(outcome) = self.handle_record(record).await? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    async fn handle_record(&self, record: &S3EventRecord) -> Result<Option<UploadOutcome>> {
        let key = UploadKey::parse(&record.s3.object.key)?;
        if key.key.ends_with(SIDECAR_SUFFIX) {
            info!(key = %key.key, "Skipping metadata sidecar");
            return Ok(None);
        }

        let bucket = if record.s3.bucket.name.is_empty() {
            self.config.bucket.as_str()
        } else {
            record.s3.bucket.name.as_str()
        };

        let document_id = short_id();
        let conversation_id = short_id();

        let body = self.objects.get_object(bucket, &key.key).await?;
        let pages = doc_processor::count_pages(&body)?;
        let created = timestamp();

        let mut document = Document {
            userid: key.user_id.clone(),
            documentid: document_id.clone(),
            filename: key.file_name.clone(),
            created: created.clone(),
            pages,
            filesize: record.s3.object.size.unwrap_or(body.len() as u64),
            docstatus: DocStatus::Uploaded,
            conversations: vec![ConversationRef {
                conversationid: conversation_id.clone(),
                created,
            }],
        };

        // Two independent writes; a crash in between leaves an orphan.
        self.documents.put_document(&document).await?;
        self.history.create_session(&conversation_id).await?;
        info!(
            user_id = %document.userid,
            document_id = %document_id,
            conversation_id = %conversation_id,
            pages,
            "Document recorded"
        );

        let ingestion = self.request_ingestion().await?;
        if !matches!(ingestion, IngestionResult::Skipped { .. }) {
            self.documents
                .set_status(&document.userid, &document_id, DocStatus::Ready)
                .await?;
            document.docstatus = DocStatus::Ready;
        }

        let sidecar_uploaded = self.upload_sidecar(bucket, &key, &document).await;

        Ok(Some(UploadOutcome {
            key: key.key,
            document_id,
            conversation_id,
            pages,
            status: document.docstatus,
            ingestion,
            sidecar_uploaded,
        }))
    }

    /// Best effort once the parameter is read: an unparseable value or a
    /// failed job is logged, never raised. Read failures propagate.
    async fn request_ingestion(&self) -> Result<IngestionResult> {
        let raw = self
            .parameters
            .get_parameter(&self.config.knowledge_base_details_path)
            .await?;
        let details = match KnowledgeBaseDetails::parse(&raw) {
            Ok(details) => details,
            Err(e) => {
                error!(error = %e, "Failed to parse knowledge base details, skipping ingestion");
                return Ok(IngestionResult::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        Ok(match self.ingestion.start_ingestion_job(&details).await {
            Ok(()) => IngestionResult::Requested,
            Err(e) => {
                error!(error = %e, "Error triggering knowledge base sync");
                IngestionResult::Failed {
                    error: e.to_string(),
                }
            }
        })
    }

    async fn upload_sidecar(&self, bucket: &str, key: &UploadKey, document: &Document) -> bool {
        let sidecar_key = format!("{}{}", key.key, SIDECAR_SUFFIX);
        let body = match serde_json::to_vec(&MetadataSidecar::from(document)) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to encode metadata sidecar");
                return false;
            }
        };

        let result = match self.config.sidecar_upload {
            SidecarUpload::Presigned { expires_in } => {
                self.objects
                    .put_object_presigned(bucket, &sidecar_key, body, "application/json", expires_in)
                    .await
            }
            SidecarUpload::Direct => {
                self.objects
                    .put_object(bucket, &sidecar_key, body, "application/json")
                    .await
            }
        };

        match result {
            Ok(()) => {
                info!(key = %sidecar_key, "Metadata sidecar uploaded");
                true
            }
            Err(e) => {
                warn!(key = %sidecar_key, error = %e, "Metadata sidecar upload failed");
                false
            }
        }
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}
