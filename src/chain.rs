//! Conversational retrieval: condense the follow-up question against the
//! conversation so far, retrieve supporting chunks, answer from them, and
//! record the turn.

use std::sync::Arc;
use tracing::debug;

use crate::db::models::{HistoryMessage, MessageRole};
use crate::db::ChatHistoryStore;
use crate::error::Result;
use crate::knowledge::{RetrievedDocument, Retriever};
use crate::llm::LanguageModel;

const CONDENSE_QUESTION_PROMPT: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.\n\n\
Chat History:\n{chat_history}\nFollow Up Input: {question}\nStandalone question:";

const QA_PROMPT: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:";

/// Message history of one conversation, backed by the memory table.
pub struct ConversationMemory {
    store: Arc<dyn ChatHistoryStore>,
    session_id: String,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn ChatHistoryStore>, session_id: &str) -> Self {
        Self {
            store,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn load(&self) -> Result<Vec<HistoryMessage>> {
        self.store.messages(&self.session_id).await
    }

    pub async fn save_turn(&self, question: &str, answer: &str) -> Result<()> {
        self.store
            .append(
                &self.session_id,
                &[HistoryMessage::human(question), HistoryMessage::ai(answer)],
            )
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub question: String,
    pub generated_question: String,
    pub answer: String,
    pub source_documents: Vec<RetrievedDocument>,
}

pub struct ConversationalRetrievalChain {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    memory: ConversationMemory,
}

impl ConversationalRetrievalChain {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            llm,
            retriever,
            memory,
        }
    }

    pub async fn call(&self, question: &str) -> Result<ChainOutput> {
        let history = self.memory.load().await?;

        let generated_question = if history.is_empty() {
            question.to_string()
        } else {
            let prompt = CONDENSE_QUESTION_PROMPT
                .replace("{chat_history}", &format_history(&history))
                .replace("{question}", question);
            self.llm.complete(&prompt).await?
        };
        debug!(session_id = %self.memory.session_id(), %generated_question, "Standalone question");

        let source_documents = self.retriever.relevant_documents(&generated_question).await?;

        let prompt = QA_PROMPT
            .replace("{context}", &format_context(&source_documents))
            .replace("{question}", &generated_question);
        let answer = self.llm.complete(&prompt).await?;

        self.memory.save_turn(question, &answer).await?;

        Ok(ChainOutput {
            question: question.to_string(),
            generated_question,
            answer,
            source_documents,
        })
    }
}

fn format_history(history: &[HistoryMessage]) -> String {
    history
        .iter()
        .map(|m| match m.role {
            MessageRole::Human => format!("\nHuman: {}", m.content),
            MessageRole::Ai => format!("\nAssistant: {}", m.content),
        })
        .collect()
}

fn format_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
