use async_trait::async_trait;
use aws_sdk_ssm::Client;
use serde::{Deserialize, Serialize};

use crate::error::{sdk_message, Error, Result};

#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

pub struct SsmParameters {
    client: Client,
}

impl SsmParameters {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| Error::Parameter(sdk_message(e)))?;
        output
            .parameter()
            .and_then(|p| p.value())
            .map(String::from)
            .ok_or_else(|| Error::Parameter(format!("Parameter {} has no value", name)))
    }
}

/// Connection details for the knowledge base and its data source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseDetails {
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

impl KnowledgeBaseDetails {
    /// Parse the stored value, repairing single-quoted pseudo JSON first.
    ///
    /// The parameter is sometimes written as a Python-style dict
    /// (`{'knowledgeBaseId': '...'}`); every `'` is rewritten to `"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let repaired = raw.replace('\'', "\"");
        serde_json::from_str(&repaired).map_err(|e| {
            Error::Config(format!("Knowledge base details are not valid JSON: {}", e))
        })
    }

    pub async fn load(store: &dyn ParameterStore, path: &str) -> Result<Self> {
        let raw = store.get_parameter(path).await?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticParameters;

    #[test]
    fn test_parse_double_quoted() {
        let details =
            KnowledgeBaseDetails::parse(r#"{"knowledgeBaseId": "KB123", "dataSourceId": "DS456"}"#)
                .unwrap();
        assert_eq!(details.knowledge_base_id, "KB123");
        assert_eq!(details.data_source_id, "DS456");
    }

    #[test]
    fn test_parse_single_quoted() {
        let details =
            KnowledgeBaseDetails::parse("{'knowledgeBaseId': 'KB123', 'dataSourceId': 'DS456'}")
                .unwrap();
        assert_eq!(
            details,
            KnowledgeBaseDetails {
                knowledge_base_id: "KB123".into(),
                data_source_id: "DS456".into(),
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            KnowledgeBaseDetails::parse("knowledgeBaseId=KB123"),
            Err(Error::Config(_))
        ));
        assert!(KnowledgeBaseDetails::parse("{'knowledgeBaseId': 'KB123'}").is_err());
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = StaticParameters::new("/kb", "{'knowledgeBaseId': 'KB', 'dataSourceId': 'DS'}");
        let details = KnowledgeBaseDetails::load(&store, "/kb").await.unwrap();
        assert_eq!(details.data_source_id, "DS");
        assert!(KnowledgeBaseDetails::load(&store, "/other").await.is_err());
    }
}
