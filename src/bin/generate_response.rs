//! `generate_response`
//!
//! Answers `POST /conversations/{conversationid}` behind an API Gateway
//! Cognito authorizer. Requires `MEMORY_TABLE` and
//! `KNOWLEDGE_BASE_DETAILS_SSM_PATH`; the model is chosen with `MODEL_ID`
//! and `MODEL_REGION`.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use doc_chat_lib::commands::ChatHandler;
use doc_chat_lib::config::ChatConfig;
use doc_chat_lib::db::ChatHistory;
use doc_chat_lib::events::{ChatRequestEvent, ProxyResponse};
use doc_chat_lib::knowledge::BedrockKnowledgeBase;
use doc_chat_lib::llm::bedrock::BedrockLlm;
use doc_chat_lib::llm::StreamChunk;
use doc_chat_lib::settings::SsmParameters;
use doc_chat_lib::telemetry;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{debug, info_span, trace, Instrument};

async fn function_handler(
    handler: &ChatHandler,
    event: LambdaEvent<ChatRequestEvent>,
) -> Result<ProxyResponse, Error> {
    let span = info_span!("generate_response", request_id = %event.context.request_id);
    async move {
        debug!(event = ?event.payload, "Received event");
        Ok(handler.handle(event.payload).await?)
    }
    .instrument(span)
    .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let config = ChatConfig::from_env()?;
    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let runtime_conf = aws_sdk_bedrockruntime::config::Builder::from(&aws)
        .region(Region::new(config.model.region.clone()))
        .build();
    let llm = BedrockLlm::new(
        aws_sdk_bedrockruntime::Client::from_conf(runtime_conf),
        config.model.clone(),
    )
    .with_stream_handler(Arc::new(|chunk: StreamChunk| {
        if !chunk.done {
            trace!(delta = %chunk.delta, "Model token");
        }
    }));

    let history = ChatHistory::new(aws_sdk_dynamodb::Client::new(&aws), &config.memory_table);
    let handler = ChatHandler::new(
        &config.knowledge_base_details_path,
        Arc::new(SsmParameters::new(aws_sdk_ssm::Client::new(&aws))),
        Arc::new(BedrockKnowledgeBase::new(aws_sdk_bedrockagentruntime::Client::new(&aws))),
        Arc::new(history),
        Arc::new(llm),
    );

    run(service_fn(|event| function_handler(&handler, event))).await
}
