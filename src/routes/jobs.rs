use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{JobApplication, JobUpdate},
    state::AppState,
};

#[derive(Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub company: String,
    pub position: Option<String>,
    pub first_applied: String,
    pub latest_update_at: String,
    pub current_status: Option<String>,
    pub email_id: Option<String>,
}

#[derive(Serialize)]
pub struct JobUpdateEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub company: String,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub received_at: String,
}

impl From<JobApplication> for JobSummary {
    fn from(job: JobApplication) -> Self {
        Self {
            id: job.id,
            company: job.company,
            position: job.position,
            first_applied: job.first_applied.format("%Y-%m-%d").to_string(),
            latest_update_at: to_iso(job.latest_update_at),
            current_status: job.current_status,
            email_id: job.email_id,
        }
    }
}

impl From<JobUpdate> for JobUpdateEntry {
    fn from(update: JobUpdate) -> Self {
        Self {
            id: update.id,
            job_id: update.job_id,
            company: update.company,
            stage: update.stage,
            description: update.description,
            received_at: to_iso(update.received_at),
        }
    }
}

pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<JobSummary>>> {
    let jobs = state.applications.list_applications().await?;
    Ok(Json(jobs.into_iter().map(JobSummary::from).collect()))
}

pub async fn list_job_updates(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Vec<JobUpdateEntry>>> {
    let updates = state.applications.updates_for(job_id).await?;
    Ok(Json(updates.into_iter().map(JobUpdateEntry::from).collect()))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !state.applications.delete_application(job_id).await? {
        return Err(AppError::not_found());
    }
    tracing::info!(%job_id, "deleted job application");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
