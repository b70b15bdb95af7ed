//! HTTP client for the knowledge-retrieval backend.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use url::Url;

use super::shared::{
    AnswerTransport, FragmentStream, TransportError, TransportErrorKind, TransportResult,
    USER_AGENT, classify_reqwest_error,
};
use super::sse::FragmentParser;
use crate::answer::{Answer, AnswerMetadata};
use crate::config::BackendConfig;

/// Resolved endpoint URLs.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub stream: Url,
    pub ask: Url,
    pub sources: Option<Url>,
}

impl Endpoints {
    /// Builds endpoint URLs from config.
    ///
    /// # Errors
    /// Returns an error if the base URL or any path does not form a valid URL.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let base = config.resolved_base_url()?;
        let join = |path: &str| -> Result<Url> {
            let full = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
            Url::parse(&full).with_context(|| format!("Invalid endpoint URL: {full}"))
        };

        Ok(Self {
            stream: join(&config.stream_path)?,
            ask: join(&config.ask_path)?,
            sources: if config.sources_enabled() {
                Some(join(&config.sources_path)?)
            } else {
                None
            },
        })
    }
}

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
}

/// Backend client: streaming answers, companion source lookup, non-streaming ask.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoints: Endpoints,
    http: reqwest::Client,
    lookup_timeout: Duration,
}

impl HttpBackend {
    /// Creates a client from backend config.
    ///
    /// # Errors
    /// Returns an error if the endpoints are invalid or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let endpoints = Endpoints::from_config(config)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            endpoints,
            http,
            lookup_timeout: config.lookup_timeout(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Asks a question without streaming and returns the full answer.
    ///
    /// # Errors
    /// Returns a transport error on connection failure, non-success status, or invalid JSON.
    pub async fn ask(&self, query: &str, conversation_id: Option<&str>) -> TransportResult<Answer> {
        let response = self
            .http
            .post(self.endpoints.ask.clone())
            .header("accept", "application/json")
            .json(&AskRequest {
                query,
                conversation_id,
            })
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let response = ensure_success(response).await?;
        let mut answer: Answer = response.json().await.map_err(|e| {
            TransportError::new(
                TransportErrorKind::Stream,
                format!("Failed to parse answer: {e}"),
            )
        })?;
        if answer.query.is_empty() {
            answer.query = query.to_string();
        }
        Ok(answer)
    }
}

impl AnswerTransport for HttpBackend {
    async fn open(
        &self,
        query: &str,
        conversation_id: Option<&str>,
    ) -> TransportResult<FragmentStream> {
        let url = with_query(&self.endpoints.stream, query, conversation_id);
        tracing::debug!(url = %url, "opening answer stream");

        let response = self
            .http
            .get(url)
            .header("accept", "text/event-stream")
            .header("cache-control", "no-cache")
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let response = ensure_success(response).await?;
        Ok(Box::pin(FragmentParser::new(response.bytes_stream())))
    }

    async fn lookup_sources(
        &self,
        query: &str,
        conversation_id: Option<&str>,
    ) -> TransportResult<Option<AnswerMetadata>> {
        let Some(endpoint) = &self.endpoints.sources else {
            return Ok(None);
        };
        let url = with_query(endpoint, query, conversation_id);

        let response = self
            .http
            .get(url)
            .header("accept", "application/json")
            .timeout(self.lookup_timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let response = ensure_success(response).await?;
        let metadata = response.json::<AnswerMetadata>().await.map_err(|e| {
            TransportError::new(
                TransportErrorKind::Stream,
                format!("Failed to parse source lookup: {e}"),
            )
        })?;
        Ok(Some(metadata))
    }
}

/// Appends `query` and the optional `conversation_id` as URL-encoded parameters.
fn with_query(endpoint: &Url, query: &str, conversation_id: Option<&str>) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("query", query);
        if let Some(id) = conversation_id.filter(|id| !id.trim().is_empty()) {
            pairs.append_pair("conversation_id", id);
        }
    }
    url
}

async fn ensure_success(response: reqwest::Response) -> TransportResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::http_status(status.as_u16(), &body))
}
