//! Request and response bodies exchanged with the scoring service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use litera_types::{ActionRequest, NonEmptyString, ProgressState, SessionId};

#[derive(Debug, Serialize)]
pub(crate) struct StartRequest<'a> {
    pub(crate) session_id: &'a SessionId,
}

/// Body of `POST /api/choice`: the held session id alongside one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceSubmission {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub action: ActionRequest,
}

impl ChoiceSubmission {
    #[must_use]
    pub fn new(session_id: SessionId, action: ActionRequest) -> Self {
        Self { session_id, action }
    }
}

/// Successful `/api/choice` body: a full progress snapshot plus an optional outcome.
#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceResponse {
    #[serde(flatten)]
    pub(crate) progress: ProgressState,
    #[serde(default)]
    outcome: Option<Value>,
}

impl ChoiceResponse {
    /// `outcome.message`, if it is a non-blank string.
    pub(crate) fn message(&self) -> Option<NonEmptyString> {
        self.outcome
            .as_ref()
            .and_then(|outcome| outcome.get("message"))
            .and_then(Value::as_str)
            .and_then(|message| NonEmptyString::new(message).ok())
    }
}

/// Extract the human-readable `detail` of an error body.
///
/// String details are returned verbatim; structured ones (validation error
/// lists) are rendered as compact JSON. A JSON body without a usable `detail`
/// yields `Ok(None)`; a body that is not JSON at all is an error.
pub(crate) fn error_detail(body: &str) -> Result<Option<NonEmptyString>, serde_json::Error> {
    let parsed: Value = serde_json::from_str(body)?;
    let text = match parsed.get("detail") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    Ok(NonEmptyString::new(text).ok())
}
