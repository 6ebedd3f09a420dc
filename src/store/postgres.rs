use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use super::{ApplicationStore, ProcessedLedger, StoreError, StoreResult};
use crate::{
    db::PgPool,
    models::{
        ApplicationChangeset, JobApplication, JobUpdate, NewJobApplication, NewJobUpdate,
        NewProcessedEmail,
    },
    schema::{job_applications, job_updates, processed_emails},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, diesel::result::Error> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn).map_err(StoreError::from)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn find_by_company(&self, company: &str) -> StoreResult<Option<JobApplication>> {
        let company = company.to_string();
        self.with_conn(move |conn| {
            job_applications::table
                .filter(job_applications::company.eq(company))
                .first::<JobApplication>(conn)
                .optional()
        })
        .await
    }

    async fn insert_application(&self, row: NewJobApplication) -> StoreResult<JobApplication> {
        self.with_conn(move |conn| {
            diesel::insert_into(job_applications::table)
                .values(&row)
                .get_result(conn)
        })
        .await
    }

    async fn update_application(
        &self,
        id: Uuid,
        changes: ApplicationChangeset,
    ) -> StoreResult<()> {
        self.with_conn(move |conn| {
            diesel::update(job_applications::table.find(id))
                .set(&changes)
                .execute(conn)
                .map(|_| ())
        })
        .await
    }

    async fn insert_update(&self, row: NewJobUpdate) -> StoreResult<JobUpdate> {
        self.with_conn(move |conn| {
            diesel::insert_into(job_updates::table)
                .values(&row)
                .get_result(conn)
        })
        .await
    }

    async fn updates_for(&self, job_id: Uuid) -> StoreResult<Vec<JobUpdate>> {
        self.with_conn(move |conn| {
            job_updates::table
                .filter(job_updates::job_id.eq(job_id))
                .order(job_updates::received_at.desc())
                .load(conn)
        })
        .await
    }

    async fn list_applications(&self) -> StoreResult<Vec<JobApplication>> {
        self.with_conn(|conn| {
            job_applications::table
                .order(job_applications::first_applied.desc())
                .load(conn)
        })
        .await
    }

    async fn delete_application(&self, id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(job_updates::table.filter(job_updates::job_id.eq(id)))
                    .execute(conn)?;
                let deleted = diesel::delete(job_applications::table.find(id)).execute(conn)?;
                Ok(deleted > 0)
            })
        })
        .await
    }
}

#[async_trait]
impl ProcessedLedger for PgStore {
    async fn is_processed(&self, message_id: &str) -> StoreResult<bool> {
        let message_id = message_id.to_string();
        self.with_conn(move |conn| {
            diesel::select(diesel::dsl::exists(
                processed_emails::table.filter(processed_emails::id.eq(message_id)),
            ))
            .get_result(conn)
        })
        .await
    }

    async fn mark_processed(&self, message_id: &str) -> StoreResult<()> {
        let message_id = message_id.to_string();
        self.with_conn(move |conn| {
            diesel::insert_into(processed_emails::table)
                .values(&NewProcessedEmail { id: &message_id })
                .on_conflict_do_nothing()
                .execute(conn)
                .map(|_| ())
        })
        .await
    }
}
