//! Bedrock knowledge base: ingestion control plane and retrieval.

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::types::{
    FilterAttribute, KnowledgeBaseQuery, KnowledgeBaseRetrievalConfiguration,
    KnowledgeBaseVectorSearchConfiguration, RetrievalFilter, SearchType as BedrockSearchType,
};
use aws_smithy_types::Document as SmithyDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{sdk_message, Error, Result};
use crate::settings::KnowledgeBaseDetails;

pub const DEFAULT_NUMBER_OF_RESULTS: i32 = 4;

// ── Ingestion ──

#[async_trait]
pub trait IngestionService: Send + Sync {
    async fn start_ingestion_job(&self, details: &KnowledgeBaseDetails) -> Result<()>;
}

pub struct BedrockIngestion {
    client: aws_sdk_bedrockagent::Client,
}

impl BedrockIngestion {
    pub fn new(client: aws_sdk_bedrockagent::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IngestionService for BedrockIngestion {
    async fn start_ingestion_job(&self, details: &KnowledgeBaseDetails) -> Result<()> {
        let output = self
            .client
            .start_ingestion_job()
            .knowledge_base_id(&details.knowledge_base_id)
            .data_source_id(&details.data_source_id)
            .send()
            .await
            .map_err(|e| Error::KnowledgeBase(sdk_message(e)))?;

        info!(
            knowledge_base_id = %details.knowledge_base_id,
            job = ?output.ingestion_job(),
            "Ingestion job started"
        );
        Ok(())
    }
}

// ── Retrieval ──

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchType {
    Hybrid,
    Semantic,
}

/// Restrict results to chunks whose metadata `key` equals `value`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub knowledge_base_id: String,
    pub number_of_results: i32,
    pub search_type: Option<SearchType>,
    pub filter: Option<MetadataFilter>,
}

impl RetrievalConfig {
    /// Hybrid search over one user's documents, top four results.
    pub fn for_user(knowledge_base_id: &str, user_id: &str) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.to_string(),
            number_of_results: DEFAULT_NUMBER_OF_RESULTS,
            search_type: Some(SearchType::Hybrid),
            filter: Some(MetadataFilter {
                key: "userid".into(),
                value: user_id.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    pub score: Option<f64>,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Raw knowledge base query, parameterised per call.
#[async_trait]
pub trait KnowledgeBaseSearch: Send + Sync {
    async fn retrieve(&self, config: &RetrievalConfig, query: &str) -> Result<Vec<RetrievedDocument>>;
}

/// Fetches documents relevant to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>>;
}

/// A [`Retriever`] bound to one knowledge base and one retrieval configuration.
pub struct KnowledgeBaseRetriever {
    search: Arc<dyn KnowledgeBaseSearch>,
    config: RetrievalConfig,
}

impl KnowledgeBaseRetriever {
    pub fn new(search: Arc<dyn KnowledgeBaseSearch>, config: RetrievalConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

#[async_trait]
impl Retriever for KnowledgeBaseRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        self.search.retrieve(&self.config, query).await
    }
}

pub struct BedrockKnowledgeBase {
    client: aws_sdk_bedrockagentruntime::Client,
}

impl BedrockKnowledgeBase {
    pub fn new(client: aws_sdk_bedrockagentruntime::Client) -> Self {
        Self { client }
    }
}

fn build_error(e: impl std::fmt::Display) -> Error {
    Error::KnowledgeBase(format!("Invalid retrieval request: {}", e))
}

fn retrieval_configuration(config: &RetrievalConfig) -> Result<KnowledgeBaseRetrievalConfiguration> {
    let mut vector = KnowledgeBaseVectorSearchConfiguration::builder()
        .number_of_results(config.number_of_results);

    if let Some(search_type) = config.search_type {
        vector = vector.override_search_type(match search_type {
            SearchType::Hybrid => BedrockSearchType::Hybrid,
            SearchType::Semantic => BedrockSearchType::Semantic,
        });
    }

    if let Some(filter) = &config.filter {
        let attribute = FilterAttribute::builder()
            .key(&filter.key)
            .value(SmithyDocument::String(filter.value.clone()))
            .build()
            .map_err(build_error)?;
        vector = vector.filter(RetrievalFilter::Equals(attribute));
    }

    Ok(KnowledgeBaseRetrievalConfiguration::builder()
        .vector_search_configuration(vector.build())
        .build())
}

fn document_to_json(doc: &SmithyDocument) -> serde_json::Value {
    use serde_json::Value;
    match doc {
        SmithyDocument::Null => Value::Null,
        SmithyDocument::Bool(b) => Value::Bool(*b),
        SmithyDocument::String(s) => Value::String(s.clone()),
        SmithyDocument::Number(n) => match *n {
            aws_smithy_types::Number::PosInt(v) => Value::from(v),
            aws_smithy_types::Number::NegInt(v) => Value::from(v),
            aws_smithy_types::Number::Float(v) => Value::from(v),
        },
        SmithyDocument::Array(items) => Value::Array(items.iter().map(document_to_json).collect()),
        SmithyDocument::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), document_to_json(v)))
                .collect(),
        ),
    }
}

#[async_trait]
impl KnowledgeBaseSearch for BedrockKnowledgeBase {
    async fn retrieve(&self, config: &RetrievalConfig, query: &str) -> Result<Vec<RetrievedDocument>> {
        let query = KnowledgeBaseQuery::builder()
            .text(query)
            .build();

        let output = self
            .client
            .retrieve()
            .knowledge_base_id(&config.knowledge_base_id)
            .retrieval_query(query)
            .retrieval_configuration(retrieval_configuration(config)?)
            .send()
            .await
            .map_err(|e| Error::KnowledgeBase(sdk_message(e)))?;

        let documents = output
            .retrieval_results()
            .iter()
            .filter_map(|result| {
                let content = result.content().map(|c| c.text())?.to_string();
                let metadata = result
                    .metadata()
                    .map(|m| {
                        m.iter()
                            .map(|(k, v)| (k.clone(), document_to_json(v)))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(RetrievedDocument {
                    content,
                    score: result.score(),
                    metadata,
                })
            })
            .collect();
        Ok(documents)
    }
}
