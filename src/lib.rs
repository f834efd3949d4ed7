pub mod chain;
pub mod commands;
pub mod config;
pub mod db;
pub mod doc_processor;
pub mod error;
pub mod events;
pub mod ids;
pub mod knowledge;
pub mod llm;
pub mod settings;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
