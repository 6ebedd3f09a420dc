use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = job_applications)]
pub struct JobApplication {
    pub id: Uuid,
    pub company: String,
    pub position: Option<String>,
    pub first_applied: NaiveDate,
    pub latest_update_at: NaiveDateTime,
    pub current_status: Option<String>,
    pub email_id: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = job_applications)]
pub struct NewJobApplication {
    pub id: Uuid,
    pub company: String,
    pub position: Option<String>,
    pub first_applied: NaiveDate,
    pub latest_update_at: NaiveDateTime,
    pub current_status: Option<String>,
    pub email_id: Option<String>,
}

/// Merge result written back onto an existing application.
///
/// `position` is skipped when `None` so a known title is never erased;
/// `current_status` is always written, including a null stage.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = job_applications)]
pub struct ApplicationChangeset {
    pub position: Option<String>,
    pub first_applied: NaiveDate,
    pub latest_update_at: NaiveDateTime,
    pub current_status: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations)]
#[diesel(table_name = job_updates)]
#[diesel(belongs_to(JobApplication, foreign_key = job_id))]
pub struct JobUpdate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub company: String,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = job_updates)]
pub struct NewJobUpdate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub company: String,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = processed_emails)]
pub struct NewProcessedEmail<'a> {
    pub id: &'a str,
}
