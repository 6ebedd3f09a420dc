use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ApplicationChangeset, JobApplication, JobUpdate, NewJobApplication, NewJobUpdate,
};

pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("database task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-indexed access to applications and their stage history.
#[async_trait]
pub trait ApplicationStore: Send + Sync + 'static {
    async fn find_by_company(&self, company: &str) -> StoreResult<Option<JobApplication>>;

    async fn insert_application(&self, row: NewJobApplication) -> StoreResult<JobApplication>;

    async fn update_application(
        &self,
        id: Uuid,
        changes: ApplicationChangeset,
    ) -> StoreResult<()>;

    async fn insert_update(&self, row: NewJobUpdate) -> StoreResult<JobUpdate>;

    /// Stage history of one application, newest first.
    async fn updates_for(&self, job_id: Uuid) -> StoreResult<Vec<JobUpdate>>;

    /// All applications, most recently first-applied first.
    async fn list_applications(&self) -> StoreResult<Vec<JobApplication>>;

    /// Returns `false` when no application had that id.
    async fn delete_application(&self, id: Uuid) -> StoreResult<bool>;
}

/// Record of message ids that already went through the pipeline.
#[async_trait]
pub trait ProcessedLedger: Send + Sync + 'static {
    async fn is_processed(&self, message_id: &str) -> StoreResult<bool>;

    /// Idempotent: marking an id twice is not an error.
    async fn mark_processed(&self, message_id: &str) -> StoreResult<()>;
}
