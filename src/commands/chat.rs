use std::sync::Arc;
use tracing::{debug, error, info};

use crate::chain::{ConversationMemory, ConversationalRetrievalChain};
use crate::db::ChatHistoryStore;
use crate::error::Result;
use crate::events::{ChatRequestEvent, ProxyResponse};
use crate::knowledge::{KnowledgeBaseRetriever, KnowledgeBaseSearch, RetrievalConfig};
use crate::llm::LanguageModel;
use crate::settings::{KnowledgeBaseDetails, ParameterStore};

/// Answers `POST /conversations/{conversationid}`.
pub struct ChatHandler {
    knowledge_base_details_path: String,
    parameters: Arc<dyn ParameterStore>,
    search: Arc<dyn KnowledgeBaseSearch>,
    history: Arc<dyn ChatHistoryStore>,
    llm: Arc<dyn LanguageModel>,
}

impl ChatHandler {
    pub fn new(
        knowledge_base_details_path: &str,
        parameters: Arc<dyn ParameterStore>,
        search: Arc<dyn KnowledgeBaseSearch>,
        history: Arc<dyn ChatHistoryStore>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            knowledge_base_details_path: knowledge_base_details_path.to_string(),
            parameters,
            search,
            history,
            llm,
        }
    }

    pub async fn handle(&self, event: ChatRequestEvent) -> Result<ProxyResponse> {
        let input = event.into_input()?;

        let details =
            KnowledgeBaseDetails::load(self.parameters.as_ref(), &self.knowledge_base_details_path)
                .await?;

        // Callers only ever see chunks from their own uploads.
        let retriever = Arc::new(KnowledgeBaseRetriever::new(
            self.search.clone(),
            RetrievalConfig::for_user(&details.knowledge_base_id, &input.user_id),
        ));
        debug!(retrieval = ?retriever.config(), "Retriever configured");
        let memory = ConversationMemory::new(self.history.clone(), &input.conversation_id);
        let chain = ConversationalRetrievalChain::new(self.llm.clone(), retriever, memory);

        match chain.call(&input.prompt).await {
            Ok(output) => {
                info!(
                    conversation_id = %input.conversation_id,
                    generated_question = %output.generated_question,
                    answer = %output.answer,
                    sources = output.source_documents.len(),
                    "Response from llm"
                );
                ProxyResponse::json(&output.answer)
            }
            Err(e) => {
                error!(conversation_id = %input.conversation_id, error = %e, "Chat pipeline failed");
                Err(e)
            }
        }
    }
}
