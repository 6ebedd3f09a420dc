use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    content::{extract_body, subject_of},
    filter::{is_job_related, matched_label, screen_subject, SubjectVerdict},
    CandidateEmail, ExtractedUpdate, ExtractionSummary, PipelineEvent, Reconciler,
    StructuredExtractor,
};
use crate::{
    config::PipelineSettings,
    gmail::{search_query, MessageSource},
    llm::InferenceClient,
    store::{ApplicationStore, ProcessedLedger, StoreResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageOutcome {
    AlreadyProcessed,
    Handled { job_related: bool },
    Failed,
    Cancelled,
}

/// Sequential inbox scan for one mailbox and date range.
pub struct ExtractionPipeline {
    source: Arc<dyn MessageSource>,
    ledger: Arc<dyn ProcessedLedger>,
    extractor: StructuredExtractor,
    reconciler: Reconciler,
}

impl ExtractionPipeline {
    pub fn new(
        source: Arc<dyn MessageSource>,
        ledger: Arc<dyn ProcessedLedger>,
        store: Arc<dyn ApplicationStore>,
        inference: Arc<dyn InferenceClient>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            source,
            ledger,
            extractor: StructuredExtractor::new(inference, settings),
            reconciler: Reconciler::new(store),
        }
    }

    /// Processes every message received between `start` and `end` (inclusive).
    ///
    /// Cancellation is a normal stop and yields a summary with `stopped` set.
    /// Only persistence failures are returned as errors; mailbox failures on a
    /// single message are logged and that message is left for the next run.
    pub async fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<PipelineEvent>>,
    ) -> StoreResult<ExtractionSummary> {
        let query = search_query(start, end);
        let mut summary = ExtractionSummary::default();
        let mut page_token: Option<String> = None;
        info!(%query, "starting inbox extraction");

        loop {
            if cancel.is_cancelled() {
                return Ok(stopped(summary));
            }
            let listing = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(stopped(summary)),
                listing = self.source.list_messages(&query, page_token.as_deref()) => listing,
            };
            let page = match listing {
                Ok(page) => page,
                Err(err) => {
                    error!(error = %err, "failed to list messages; ending run");
                    break;
                }
            };
            debug!(count = page.ids.len(), "fetched message page");

            for message_id in &page.ids {
                if cancel.is_cancelled() {
                    return Ok(stopped(summary));
                }
                match self.process_message(message_id, cancel, events).await? {
                    MessageOutcome::AlreadyProcessed | MessageOutcome::Failed => {}
                    MessageOutcome::Handled { job_related } => {
                        summary.processed_count += 1;
                        if job_related {
                            summary.job_related_count += 1;
                        }
                    }
                    MessageOutcome::Cancelled => return Ok(stopped(summary)),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            processed = summary.processed_count,
            job_related = summary.job_related_count,
            "inbox extraction finished"
        );
        Ok(summary)
    }

    async fn process_message(
        &self,
        message_id: &str,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<PipelineEvent>>,
    ) -> StoreResult<MessageOutcome> {
        if self.ledger.is_processed(message_id).await? {
            return Ok(MessageOutcome::AlreadyProcessed);
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(MessageOutcome::Cancelled),
            fetched = self.source.get_message(message_id) => fetched,
        };
        let message = match fetched {
            Ok(message) => message,
            Err(err) => {
                warn!(message_id, error = %err, "failed to fetch message; skipping");
                return Ok(MessageOutcome::Failed);
            }
        };
        if cancel.is_cancelled() {
            return Ok(MessageOutcome::Cancelled);
        }

        let subject = subject_of(&message.payload.headers);
        if screen_subject(&subject) == SubjectVerdict::Excluded {
            debug!(message_id, %subject, "subject excluded");
            self.ledger.mark_processed(message_id).await?;
            return Ok(MessageOutcome::Handled { job_related: false });
        }

        let body = extract_body(&message.payload).unwrap_or_default();
        if body.trim().is_empty() || !is_job_related(&subject, &body) {
            debug!(message_id, %subject, "not job related");
            self.ledger.mark_processed(message_id).await?;
            return Ok(MessageOutcome::Handled { job_related: false });
        }
        debug!(
            message_id,
            rule = matched_label(&subject, &body).unwrap_or_default(),
            "candidate email"
        );

        let candidate = CandidateEmail {
            id: message.id.clone(),
            subject,
            received_at: message
                .received_at()
                .unwrap_or_else(|| Utc::now().naive_utc()),
            body,
        };

        let update = self
            .extractor
            .extract(&candidate.body, candidate.received_at, cancel)
            .await;
        if cancel.is_cancelled() {
            return Ok(MessageOutcome::Cancelled);
        }

        let job_related = match update {
            ExtractedUpdate::NotJobRelated => false,
            ExtractedUpdate::JobUpdate(fields) => {
                let outcome = self.reconciler.reconcile(&fields, message_id).await?;
                if let Some(events) = events {
                    let _ = events.send(PipelineEvent::job_update(message_id, fields, &outcome));
                }
                true
            }
        };

        self.ledger.mark_processed(message_id).await?;
        debug!(message_id, subject = %candidate.subject, job_related, "message processed");
        Ok(MessageOutcome::Handled { job_related })
    }
}

fn stopped(summary: ExtractionSummary) -> ExtractionSummary {
    info!(
        processed = summary.processed_count,
        job_related = summary.job_related_count,
        "inbox extraction cancelled"
    );
    ExtractionSummary {
        stopped: true,
        ..summary
    }
}
