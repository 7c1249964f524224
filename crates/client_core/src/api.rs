//! HTTP access to the voice agent backend.

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use shared::{
    domain::{CallOutcome, ConversationDetail, ConversationId},
    error::ErrorPayload,
    protocol::{
        decode_call_outcome, decode_conversation_detail, decode_json_body, decode_summaries,
        CallRequest, SummaryList, SummarySource,
    },
};
use tracing::debug;
use url::Url;

use crate::error::{ApiSetupError, RequestError};

/// Which backend route serves transcript summaries.
///
/// Deployments expose one or both; neither is treated as authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryEndpoint {
    #[default]
    Conversations,
    LatestTranscriptSummary,
}

impl SummaryEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Conversations => "conversations",
            Self::LatestTranscriptSummary => "latest_transcript_summary",
        }
    }

    pub fn source(self) -> SummarySource {
        match self {
            Self::Conversations => SummarySource::Listing,
            Self::LatestTranscriptSummary => SummarySource::Latest,
        }
    }
}

impl fmt::Display for SummaryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for SummaryEndpoint {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().trim_start_matches('/') {
            "conversations" => Ok(Self::Conversations),
            "latest_transcript_summary" => Ok(Self::LatestTranscriptSummary),
            other => Err(format!(
                "unknown summary endpoint '{other}' (expected conversations or latest_transcript_summary)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub base_url: String,
    /// `None` leaves requests unbounded, so a hung backend keeps the caller pending.
    pub request_timeout: Option<Duration>,
}

impl ApiOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

#[async_trait]
pub trait VoiceAgentApi: Send + Sync {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallOutcome, RequestError>;
    async fn fetch_summaries(&self, endpoint: SummaryEndpoint)
        -> Result<SummaryList, RequestError>;
    async fn fetch_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationDetail, RequestError>;
}

pub struct HttpVoiceAgentApi {
    http: Client,
    base_url: Url,
}

impl HttpVoiceAgentApi {
    pub fn new(options: &ApiOptions) -> Result<Self, ApiSetupError> {
        let raw = options.base_url.trim();
        let base_url = Url::parse(raw).map_err(|err| ApiSetupError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiSetupError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: "expected an http or https url".to_string(),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl VoiceAgentApi for HttpVoiceAgentApi {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallOutcome, RequestError> {
        let url = self.endpoint(&["call"]);
        debug!(%url, phone_number = %request.phone_number, "posting call request");
        let response = self.http.post(url).json(request).send().await?;
        let body = read_body(response).await?;
        Ok(decode_call_outcome(body)?)
    }

    async fn fetch_summaries(
        &self,
        endpoint: SummaryEndpoint,
    ) -> Result<SummaryList, RequestError> {
        let url = self.endpoint(&[endpoint.path()]);
        debug!(%url, "fetching conversation summaries");
        let response = self.http.get(url).send().await?;
        let body = read_body(response).await?;
        Ok(decode_summaries(body, endpoint.source())?)
    }

    async fn fetch_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationDetail, RequestError> {
        let url = self.endpoint(&["conversation", conversation_id.as_str()]);
        debug!(%url, "fetching conversation detail");
        let response = self.http.get(url).send().await?;
        let body = read_body(response).await?;
        Ok(decode_conversation_detail(body)?)
    }
}

/// Splits a response into a decoded success body or a classified rejection.
///
/// A body that is not JSON counts as a transport failure whatever the status.
async fn read_body(response: Response) -> Result<Value, RequestError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let body = decode_json_body(&bytes)?;
    if status.is_success() {
        return Ok(body);
    }

    match ErrorPayload::from_value(&body).message() {
        Some(message) => Err(RequestError::RemoteRejection {
            status: status.as_u16(),
            message: message.to_string(),
        }),
        None => Err(RequestError::RemoteRejectionUnstructured {
            status: status.as_u16(),
        }),
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
