//! Inbox-to-tracker pipeline: filter, extract, reconcile.

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

pub mod bounder;
pub mod content;
pub mod extractor;
pub mod filter;
pub mod orchestrator;
pub mod reconciler;

pub use extractor::StructuredExtractor;
pub use orchestrator::ExtractionPipeline;
pub use reconciler::{ReconcileOutcome, Reconciler};

/// Fields the model extracted from a job-related email. The reconciler decides
/// which of them are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobUpdateFields {
    pub company: Option<String>,
    pub position: Option<String>,
    pub application_date: Option<String>,
    pub stage: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedUpdate {
    NotJobRelated,
    JobUpdate(JobUpdateFields),
}

/// Message that survived content extraction; lives for one pipeline pass.
#[derive(Debug, Clone)]
pub struct CandidateEmail {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    pub processed_count: usize,
    pub job_related_count: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    JobUpdate {
        email_id: String,
        #[serde(flatten)]
        fields: JobUpdateFields,
        outcome: &'static str,
        job_id: Option<Uuid>,
    },
    Summary(ExtractionSummary),
    Error {
        message: String,
    },
}

impl PipelineEvent {
    pub fn job_update(email_id: &str, fields: JobUpdateFields, outcome: &ReconcileOutcome) -> Self {
        let (label, job_id) = match outcome {
            ReconcileOutcome::Created(id) => ("created", Some(*id)),
            ReconcileOutcome::Updated(id) => ("updated", Some(*id)),
            ReconcileOutcome::Suppressed(id) => ("duplicate", Some(*id)),
            ReconcileOutcome::Dropped(_) => ("dropped", None),
        };
        PipelineEvent::JobUpdate {
            email_id: email_id.to_string(),
            fields,
            outcome: label,
            job_id,
        }
    }
}
