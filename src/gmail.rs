use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mailbox rejected the access token")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("mailbox request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Full message as returned by the Gmail `format=full` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: String,
    #[serde(default)]
    pub internal_date: Option<String>,
    pub payload: MessagePart,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    /// base64url-encoded content, absent for containers and attachments.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl RawMessage {
    /// Receipt time from `internalDate` (epoch millis), `None` when missing or garbled.
    pub fn received_at(&self) -> Option<NaiveDateTime> {
        let millis: i64 = self.internal_date.as_deref()?.parse().ok()?;
        DateTime::from_timestamp_millis(millis).map(|ts| ts.naive_utc())
    }
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage, SourceError>;

    async fn get_message(&self, id: &str) -> Result<RawMessage, SourceError>;
}

/// Builds a message source bound to one user's access token.
pub trait MailboxConnector: Send + Sync + 'static {
    fn connect(&self, access_token: &str) -> Arc<dyn MessageSource>;
}

/// Gmail search covering `start..=end`; `before:` is exclusive so it is pushed one day out.
pub fn search_query(start: NaiveDate, end: NaiveDate) -> String {
    let before = end.checked_add_days(Days::new(1)).unwrap_or(end);
    format!(
        "after:{} before:{}",
        start.format("%Y/%m/%d"),
        before.format("%Y/%m/%d")
    )
}

pub struct GmailClient {
    client: Client,
    api_base: String,
    access_token: String,
    page_size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

impl GmailClient {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/users/me/messages", self.api_base)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SourceError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| SourceError::Request(err.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized),
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(response.url().path().to_string())),
            status => Err(SourceError::Request(format!(
                "gmail responded with status {status}"
            ))),
        }
    }
}

#[async_trait]
impl MessageSource for GmailClient {
    async fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage, SourceError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response = self
            .send(self.client.get(self.messages_url()).query(&params))
            .await?;
        let listing: ListResponse = response
            .json()
            .await
            .map_err(|err| SourceError::Request(format!("invalid listing payload: {err}")))?;

        Ok(MessagePage {
            ids: listing.messages.into_iter().map(|m| m.id).collect(),
            next_page_token: listing.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage, SourceError> {
        let url = format!("{}/{}", self.messages_url(), id);
        let response = self
            .send(self.client.get(url).query(&[("format", "full")]))
            .await?;

        response
            .json()
            .await
            .map_err(|err| SourceError::Request(format!("invalid message payload: {err}")))
    }
}

/// Hands out [`GmailClient`]s sharing one HTTP connection pool.
pub struct GmailConnector {
    client: Client,
    api_base: String,
    page_size: u32,
}

impl GmailConnector {
    pub fn new(api_base: impl Into<String>, page_size: u32) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            page_size,
        })
    }
}

impl MailboxConnector for GmailConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn MessageSource> {
        Arc::new(GmailClient::new(
            self.client.clone(),
            self.api_base.clone(),
            access_token,
            self.page_size,
        ))
    }
}
