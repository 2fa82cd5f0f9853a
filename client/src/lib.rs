//! Client for the Litera scoring service.
//!
//! # Architecture
//!
//! - [`ScoringService`] - the seam the sync engine talks to
//! - [`HttpScoringService`] - the HTTP/JSON implementation
//!
//! # Endpoints
//!
//! | Endpoint | Request | Success body |
//! |----------|---------|--------------|
//! | `POST /api/start` | `{ session_id }` | progress snapshot |
//! | `POST /api/choice` | `{ session_id, module, action_type, payload }` | progress snapshot + `outcome?` |
//!
//! # Error Handling
//!
//! A non-2xx JSON answer to `/api/choice` is a normal [`ChoiceReply::Rejected`],
//! because the service uses it to explain why a decision was refused. Everything
//! else that prevents a usable snapshot (connection failure, timeout, non-2xx
//! on `/api/start`, any body that is not JSON, including a non-2xx HTML page
//! from a proxy) is a [`TransportError`].
//!
//! Requests are never retried here; retry is a learner decision.

mod wire;

pub use wire::ChoiceSubmission;

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use uuid::Uuid;

use litera_config::BackendUrl;
use litera_types::{NonEmptyString, ProgressState, SessionId};

use crate::wire::{ChoiceResponse, StartRequest, error_detail};

pub const START_PATH: &str = "/api/start";
pub const CHOICE_PATH: &str = "/api/choice";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach scoring service: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("request to scoring service timed out")]
    TimedOut,
    #[error("scoring service returned HTTP {status}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("malformed response from scoring service: {0}")]
    MalformedBody(#[source] serde_json::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut
        } else if err.is_connect() {
            Self::Unreachable(err)
        } else {
            Self::Request(err)
        }
    }

    /// True when the service could not be reached at all (as opposed to
    /// answering with something unusable).
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::TimedOut)
    }
}

/// Outcome of a choice submission the service actually answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceReply {
    /// 2xx: the new authoritative snapshot and the optional outcome message.
    Applied {
        progress: ProgressState,
        message: Option<NonEmptyString>,
    },
    /// Non-2xx: the service refused the decision.
    Rejected {
        status: u16,
        detail: Option<NonEmptyString>,
    },
}

/// The authoritative scorer, as seen by the sync engine.
pub trait ScoringService: Send + Sync + 'static {
    fn start_session(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<ProgressState, TransportError>> + Send;

    fn submit_choice(
        &self,
        submission: &ChoiceSubmission,
    ) -> impl Future<Output = Result<ChoiceReply, TransportError>> + Send;
}

fn base_client_builder() -> reqwest::ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .user_agent(concat!("litera/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

async fn read_json<T>(response: reqwest::Response) -> Result<T, TransportError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = response
        .bytes()
        .await
        .map_err(TransportError::from_reqwest)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(%e, body_bytes = bytes.len(), "Scoring service body is not a progress snapshot");
        TransportError::MalformedBody(e)
    })
}

/// [`ScoringService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpScoringService {
    client: reqwest::Client,
    base_url: BackendUrl,
}

impl HttpScoringService {
    pub fn new(base_url: BackendUrl, request_timeout: Duration) -> Result<Self, TransportError> {
        let client =
            http_client_with_timeout(request_timeout).map_err(TransportError::Request)?;
        Ok(Self { client, base_url })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, TransportError> {
        let url = self.base_url.endpoint(path);
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(%url, %request_id, "Sending scoring request");

        let response = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, &request_id)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, %request_id, error = %e, "Scoring request failed");
                TransportError::from_reqwest(e)
            })?;

        tracing::debug!(%url, %request_id, status = %response.status(), "Scoring response received");
        Ok(response)
    }
}

impl ScoringService for HttpScoringService {
    async fn start_session(&self, session: &SessionId) -> Result<ProgressState, TransportError> {
        let response = self
            .post(START_PATH, &StartRequest {
                session_id: session,
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            tracing::warn!(%status, session = %session, "Session start rejected");
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        read_json(response).await
    }

    async fn submit_choice(
        &self,
        submission: &ChoiceSubmission,
    ) -> Result<ChoiceReply, TransportError> {
        let response = self.post(CHOICE_PATH, submission).await?;

        let status = response.status();
        if status.is_success() {
            let body: ChoiceResponse = read_json(response).await?;
            let message = body.message();
            return Ok(ChoiceReply::Applied {
                progress: body.progress,
                message,
            });
        }

        let body = read_capped_error_body(response).await;
        let detail = error_detail(&body).map_err(|e| {
            tracing::warn!(%status, %e, "Choice error body is not JSON");
            TransportError::MalformedBody(e)
        })?;
        tracing::warn!(
            %status,
            module = %submission.action.module,
            action_type = %submission.action.action_type,
            detail = detail.as_deref().unwrap_or(""),
            "Choice rejected by scoring service"
        );
        Ok(ChoiceReply::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}
