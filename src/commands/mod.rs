pub mod chat;
pub mod upload;

pub use chat::ChatHandler;
pub use upload::{IngestionResult, UploadOutcome, UploadTrigger};
