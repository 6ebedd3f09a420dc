use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::JobUpdateFields;
use crate::{
    models::{ApplicationChangeset, JobApplication, NewJobApplication, NewJobUpdate},
    store::{ApplicationStore, StoreResult},
};

/// Span within which an identical stage+description update counts as a repeat.
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created(Uuid),
    Updated(Uuid),
    /// An identical update was already recorded inside the duplicate window.
    Suppressed(Uuid),
    Dropped(&'static str),
}

pub struct Reconciler {
    store: Arc<dyn ApplicationStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(
        &self,
        update: &JobUpdateFields,
        source_message_id: &str,
    ) -> StoreResult<ReconcileOutcome> {
        let Some(company) = update.company.as_deref() else {
            warn!(message_id = %source_message_id, "job update without company; dropping");
            return Ok(ReconcileOutcome::Dropped("missing company"));
        };
        let Some(applied_at) = update
            .application_date
            .as_deref()
            .and_then(parse_application_timestamp)
        else {
            warn!(
                message_id = %source_message_id,
                company,
                raw_date = ?update.application_date,
                "job update without usable application date; dropping"
            );
            return Ok(ReconcileOutcome::Dropped("missing application date"));
        };
        if update.stage.as_deref().map_or(true, |stage| stage.trim().is_empty()) {
            warn!(message_id = %source_message_id, company, "job update without stage; dropping");
            return Ok(ReconcileOutcome::Dropped("missing stage"));
        }

        match self.store.find_by_company(company).await? {
            None => self.create(company, applied_at, update, source_message_id).await,
            Some(existing) => self.merge(existing, applied_at, update).await,
        }
    }

    async fn create(
        &self,
        company: &str,
        applied_at: NaiveDateTime,
        update: &JobUpdateFields,
        source_message_id: &str,
    ) -> StoreResult<ReconcileOutcome> {
        let application = self
            .store
            .insert_application(NewJobApplication {
                id: Uuid::new_v4(),
                company: company.to_string(),
                position: update.position.clone(),
                first_applied: applied_at.date(),
                latest_update_at: applied_at,
                current_status: update.stage.clone(),
                email_id: Some(source_message_id.to_string()),
            })
            .await?;

        self.append_update(&application, applied_at, update).await?;
        info!(company, job_id = %application.id, stage = ?update.stage, "created job application");
        Ok(ReconcileOutcome::Created(application.id))
    }

    async fn merge(
        &self,
        existing: JobApplication,
        applied_at: NaiveDateTime,
        update: &JobUpdateFields,
    ) -> StoreResult<ReconcileOutcome> {
        let history = self.store.updates_for(existing.id).await?;
        let window = Duration::hours(DUPLICATE_WINDOW_HOURS);
        let repeated = history.iter().any(|previous| {
            previous.stage == update.stage
                && previous.description == update.description
                && (previous.received_at - applied_at).abs() <= window
        });
        if repeated {
            info!(
                company = %existing.company,
                job_id = %existing.id,
                stage = ?update.stage,
                "suppressed duplicate stage update"
            );
            return Ok(ReconcileOutcome::Suppressed(existing.id));
        }

        let changes = merge_changes(&existing, applied_at, update);
        self.store.update_application(existing.id, changes).await?;
        self.append_update(&existing, applied_at, update).await?;
        info!(
            company = %existing.company,
            job_id = %existing.id,
            stage = ?update.stage,
            "updated job application"
        );
        Ok(ReconcileOutcome::Updated(existing.id))
    }

    async fn append_update(
        &self,
        application: &JobApplication,
        applied_at: NaiveDateTime,
        update: &JobUpdateFields,
    ) -> StoreResult<()> {
        self.store
            .insert_update(NewJobUpdate {
                id: Uuid::new_v4(),
                job_id: application.id,
                company: application.company.clone(),
                stage: update.stage.clone(),
                description: update.description.clone(),
                received_at: applied_at,
            })
            .await?;
        Ok(())
    }
}

/// Status follows the last processed update, not the latest-dated one.
pub fn merge_changes(
    existing: &JobApplication,
    applied_at: NaiveDateTime,
    update: &JobUpdateFields,
) -> ApplicationChangeset {
    ApplicationChangeset {
        position: update.position.clone(),
        first_applied: existing.first_applied.min(applied_at.date()),
        latest_update_at: existing.latest_update_at.max(applied_at),
        current_status: Some(update.stage.clone()),
    }
}

/// Accepts the date shapes the model tends to echo back.
pub fn parse_application_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
