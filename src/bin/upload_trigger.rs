//! `upload_trigger`
//!
//! Invoked by S3 when a PDF lands under `{user_id}/{file_name}`. Requires
//! `DOCUMENT_TABLE`, `MEMORY_TABLE`, `BUCKET` and
//! `KNOWLEDGE_BASE_DETAILS_SSM_PATH`; see `UploadConfig` for the optional
//! sidecar settings.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use doc_chat_lib::commands::{UploadOutcome, UploadTrigger};
use doc_chat_lib::config::UploadConfig;
use doc_chat_lib::db::{ChatHistory, DocumentRecords};
use doc_chat_lib::events::S3Event;
use doc_chat_lib::knowledge::BedrockIngestion;
use doc_chat_lib::settings::SsmParameters;
use doc_chat_lib::storage::S3Store;
use doc_chat_lib::telemetry;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{debug, info_span, Instrument};

async fn function_handler(
    trigger: &UploadTrigger,
    event: LambdaEvent<S3Event>,
) -> Result<Vec<UploadOutcome>, Error> {
    let span = info_span!("upload_trigger", request_id = %event.context.request_id);
    async move {
        debug!(event = ?event.payload, "Received event");
        Ok(trigger.handle(event.payload).await?)
    }
    .instrument(span)
    .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let config = UploadConfig::from_env()?;
    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let dynamo = aws_sdk_dynamodb::Client::new(&aws);
    let documents = DocumentRecords::new(dynamo.clone(), &config.document_table);
    let history = ChatHistory::new(dynamo, &config.memory_table);
    let trigger = UploadTrigger::new(
        config,
        Arc::new(S3Store::new(aws_sdk_s3::Client::new(&aws))),
        Arc::new(documents),
        Arc::new(history),
        Arc::new(SsmParameters::new(aws_sdk_ssm::Client::new(&aws))),
        Arc::new(BedrockIngestion::new(aws_sdk_bedrockagent::Client::new(&aws))),
    );

    run(service_fn(|event| function_handler(&trigger, event))).await
}
