use std::{sync::Arc, time::Duration};

use chrono::NaiveDateTime;
use serde::Deserialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::bounder::bound;
use super::{ExtractedUpdate, JobUpdateFields};
use crate::{
    config::PipelineSettings,
    llm::{InferenceClient, InferenceError},
};

pub const STAGES: &[&str] = &[
    "Application Received",
    "Screen",
    "Interview Scheduled",
    "Technical Interview",
    "Assessment",
    "Offer",
    "Rejection",
    "Follow-up",
];

pub const RECEIVED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns an email body into an [`ExtractedUpdate`] via the inference client.
pub struct StructuredExtractor {
    client: Arc<dyn InferenceClient>,
    max_tokens: usize,
    cooldown: Duration,
    max_retries: u32,
}

impl StructuredExtractor {
    pub fn new(client: Arc<dyn InferenceClient>, settings: &PipelineSettings) -> Self {
        Self {
            client,
            max_tokens: settings.max_tokens,
            cooldown: settings.rate_limit_cooldown,
            max_retries: settings.rate_limit_max_retries,
        }
    }

    /// Never fails: provider errors, malformed output and cancellation all
    /// degrade to [`ExtractedUpdate::NotJobRelated`].
    pub async fn extract(
        &self,
        body: &str,
        received_at: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> ExtractedUpdate {
        let bounded = bound(body, self.max_tokens);
        let prompt = build_prompt(&bounded, &received_at.format(RECEIVED_DATE_FORMAT).to_string());

        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return ExtractedUpdate::NotJobRelated,
                result = self.client.infer(&prompt) => result,
            };

            match result {
                Ok(response) => {
                    let update = parse_extraction(&response);
                    if update == ExtractedUpdate::NotJobRelated {
                        debug!(%response, "model reported no job update");
                    }
                    return update;
                }
                Err(InferenceError::RateLimited) if attempt < self.max_retries => {
                    attempt += 1;
                    info!(
                        attempt,
                        cooldown_secs = self.cooldown.as_secs(),
                        "inference rate limited; cooling down"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return ExtractedUpdate::NotJobRelated,
                        _ = sleep(self.cooldown) => {}
                    }
                }
                Err(InferenceError::RateLimited) => {
                    warn!(attempts = attempt + 1, "inference still rate limited; giving up");
                    return ExtractedUpdate::NotJobRelated;
                }
                Err(err) => {
                    warn!(error = %err, "inference failed");
                    return ExtractedUpdate::NotJobRelated;
                }
            }
        }
    }
}

pub fn build_prompt(body: &str, received_date: &str) -> String {
    format!(
        r#"Analyze this email and return ONLY a JSON object with no additional text or formatting.
Email received on: {received_date}

Rules:
1. Return EXACTLY this format if not job related:
{{"job_related": false}}

2. Return EXACTLY this format if job related:
{{
    "job_related": true,
    "company": "<company name>",
    "position": "<job title>",
    "application_date": "{received_date}",
    "stage": "<one of: {stages}>",
    "description": "<brief summary>"
}}

Email text:
{body}"#,
        stages = STAGES.join(", "),
    )
}

#[derive(Deserialize)]
struct ModelOutput {
    job_related: bool,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    application_date: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Best-effort parse of a possibly chatty model response.
pub fn parse_extraction(response: &str) -> ExtractedUpdate {
    let Some(candidate) = first_json_object(response) else {
        return ExtractedUpdate::NotJobRelated;
    };
    let output: ModelOutput = match serde_json::from_str(candidate) {
        Ok(output) => output,
        Err(err) => {
            debug!(error = %err, "model output was not a usable JSON object");
            return ExtractedUpdate::NotJobRelated;
        }
    };
    if !output.job_related {
        return ExtractedUpdate::NotJobRelated;
    }

    ExtractedUpdate::JobUpdate(JobUpdateFields {
        company: non_blank(output.company),
        position: non_blank(output.position),
        application_date: non_blank(output.application_date),
        stage: non_blank(output.stage),
        description: non_blank(output.description),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First balanced `{...}` span, skipping braces inside string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
