pub mod config;
pub mod db;
pub mod error;
pub mod gmail;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;

pub use pipeline::{ExtractionPipeline, ExtractionSummary};
