use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::NaiveDate;
use futures_util::stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    error::{AppError, AppResult},
    pipeline::{ExtractionPipeline, PipelineEvent},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ExtractEmailsRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Runs the inbox pipeline and streams its events as NDJSON.
///
/// Dropping the response body (client disconnect) cancels the run.
pub async fn extract_emails(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(request): Json<ExtractEmailsRequest>,
) -> AppResult<Response> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::unauthorized());
    };
    if request.start_date > request.end_date {
        return Err(AppError::bad_request("start_date must not be after end_date"));
    }

    let pipeline = ExtractionPipeline::new(
        state.mailbox.connect(bearer.token()),
        state.ledger.clone(),
        state.applications.clone(),
        state.inference.clone(),
        &state.config.pipeline,
    );
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        info!(
            start_date = %request.start_date,
            end_date = %request.end_date,
            "extract-emails run started"
        );
        let last = match pipeline
            .run(request.start_date, request.end_date, &run_cancel, Some(&tx))
            .await
        {
            Ok(summary) => PipelineEvent::Summary(summary),
            Err(err) => {
                error!(error = %err, "extract-emails run failed");
                PipelineEvent::Error {
                    message: err.to_string(),
                }
            }
        };
        let _ = tx.send(last);
    });

    let guard = cancel.drop_guard();
    let lines = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        let json = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","message":"failed to encode event"}"#.to_string()
        });
        Some((Ok::<_, Infallible>(format!("{json}\n")), (rx, guard)))
    });

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
