//! Session and scoring sync engine.
//!
//! [`SyncEngine`] owns everything the presentation layer shows: the session
//! identifier, the mirrored [`ProgressState`], the current [`StatusMessage`],
//! and a busy flag. It never computes scores. Every successful response
//! replaces the progress snapshot wholesale; every failure leaves it exactly
//! as it was.
//!
//! # Driving the engine
//!
//! Event-loop callers use the non-blocking pair:
//!
//! 1. [`SyncEngine::issue_start`] / [`SyncEngine::issue_action`] spawn the
//!    request on the current tokio runtime and return immediately.
//! 2. [`SyncEngine::poll`] applies the response once it has arrived.
//!
//! Sequential callers use [`SyncEngine::start_session`] and
//! [`SyncEngine::submit_action`], which issue and then wait for the result.
//!
//! Only one call may be in flight. Issuing another while busy is refused with
//! [`Refusal::Busy`], so responses can never be applied out of order.

mod operation;

pub use operation::{CallKind, OperationTag, RequestSeq};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use litera_client::{ChoiceReply, ChoiceSubmission, ScoringService, TransportError};
use litera_types::{
    ActionRequest, ProgressState, SessionIdentity, StartFailure, StatusMessage,
};

use crate::operation::{Completion, InFlightCall, OperationState};

pub use litera_client;
pub use litera_types;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A call refused before any network traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("no session identifier; start a session first")]
    NoSession,
    #[error("a {in_flight} call is still in flight")]
    Busy { in_flight: CallKind },
}

/// How a call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The authoritative snapshot was applied.
    Applied { kind: CallKind },
    /// The service refused the choice; progress untouched.
    Rejected { status: u16 },
    /// No usable answer; progress untouched.
    TransportFailed { kind: CallKind, error: String },
    /// Refused locally; nothing was sent.
    Refused(Refusal),
}

impl CallOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Copy)]
pub struct EngineView<'a> {
    pub identifier: &'a str,
    pub progress: &'a ProgressState,
    pub status: Option<&'a StatusMessage>,
    pub busy: bool,
}

pub struct SyncEngine<S> {
    service: Arc<S>,
    identity: SessionIdentity,
    progress: ProgressState,
    status: Option<StatusMessage>,
    operation: OperationState,
    last_seq: RequestSeq,
    request_timeout: Duration,
}

impl<S> std::fmt::Debug for SyncEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("identity", &self.identity)
            .field("progress", &self.progress)
            .field("status", &self.status)
            .field("operation", &self.operation.tag())
            .field("last_seq", &self.last_seq)
            .finish_non_exhaustive()
    }
}

impl<S: ScoringService> SyncEngine<S> {
    /// Create an engine with the default progress view and no status.
    #[must_use]
    pub fn new(service: S, identity: SessionIdentity) -> Self {
        Self {
            service: Arc::new(service),
            identity,
            progress: ProgressState::default(),
            status: None,
            operation: OperationState::Idle,
            last_seq: RequestSeq::zero(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Upper bound on a single call, after which it counts as a transport failure.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn view(&self) -> EngineView<'_> {
        EngineView {
            identifier: self.identity.current_raw(),
            progress: &self.progress,
            status: self.status.as_ref(),
            busy: self.is_busy(),
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        self.identity.current_raw()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    #[must_use]
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.operation.tag() == OperationTag::InFlight
    }

    /// Replace the held identifier verbatim. Does not touch progress.
    pub fn set_identifier(&mut self, value: impl Into<String>) {
        self.identity.set(value);
    }

    /// Issue `POST /api/start` without waiting for the answer.
    ///
    /// `identifier`, when given, replaces the held one first. A blank
    /// identifier is replaced with a freshly generated one.
    pub fn issue_start(&mut self, identifier: Option<String>) -> Result<RequestSeq, Refusal> {
        self.ensure_idle()?;

        if let Some(identifier) = identifier {
            self.identity.set(identifier);
        }
        let session = self.identity.ensure();
        self.status = Some(StatusMessage::Connecting);

        let service = Arc::clone(&self.service);
        let seq = self.dispatch(CallKind::StartSession, async move {
            Completion::Start(service.start_session(&session).await)
        });
        tracing::info!(%seq, session = %self.identity.current_raw(), "Session start issued");
        Ok(seq)
    }

    /// Issue `POST /api/choice` without waiting for the answer.
    ///
    /// Refused with status `Start a session first` when no identifier is held.
    pub fn issue_action(&mut self, action: ActionRequest) -> Result<RequestSeq, Refusal> {
        self.ensure_idle()?;

        let Some(session) = self.identity.current() else {
            tracing::debug!(module = %action.module, "Refusing action without a session");
            self.status = Some(StatusMessage::StartSessionFirst);
            return Err(Refusal::NoSession);
        };
        self.status = Some(StatusMessage::Submitting);

        let module = action.module.clone();
        let action_type = action.action_type.clone();
        let submission = ChoiceSubmission::new(session, action);
        let service = Arc::clone(&self.service);
        let seq = self.dispatch(CallKind::SubmitAction, async move {
            Completion::Choice(service.submit_choice(&submission).await)
        });
        tracing::info!(%seq, %module, %action_type, "Action submitted");
        Ok(seq)
    }

    /// Apply the in-flight call's result if it has arrived.
    pub fn poll(&mut self) -> Option<CallOutcome> {
        let received = match &mut self.operation {
            OperationState::Idle => return None,
            OperationState::InFlight(call) => call.rx.try_recv(),
        };
        match received {
            Err(TryRecvError::Empty) => None,
            Ok(completion) => {
                let call = self.operation.finish()?;
                Some(self.apply(&call, completion))
            }
            Err(TryRecvError::Closed) => {
                let call = self.operation.finish()?;
                Some(self.task_lost(&call))
            }
        }
    }

    /// Wait for the in-flight call (bounded by the request timeout) and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn settle(&mut self) -> Option<CallOutcome> {
        let received = match &mut self.operation {
            OperationState::Idle => return None,
            OperationState::InFlight(call) => (&mut call.rx).await,
        };
        let call = self.operation.finish()?;
        Some(match received {
            Ok(completion) => self.apply(&call, completion),
            Err(_) => self.task_lost(&call),
        })
    }

    /// Start (or resume) a session and wait for the service's answer.
    pub async fn start_session(&mut self, identifier: Option<String>) -> CallOutcome {
        match self.issue_start(identifier) {
            Ok(_) => self.settled(CallKind::StartSession).await,
            Err(refusal) => CallOutcome::Refused(refusal),
        }
    }

    /// Submit one learner decision and wait for the service's answer.
    pub async fn submit_action(&mut self, action: ActionRequest) -> CallOutcome {
        match self.issue_action(action) {
            Ok(_) => self.settled(CallKind::SubmitAction).await,
            Err(refusal) => CallOutcome::Refused(refusal),
        }
    }

    async fn settled(&mut self, kind: CallKind) -> CallOutcome {
        self.settle()
            .await
            .unwrap_or_else(|| CallOutcome::TransportFailed {
                kind,
                error: "call vanished before settling".to_string(),
            })
    }

    fn ensure_idle(&mut self) -> Result<(), Refusal> {
        // A finished-but-unpolled call should not block the next one.
        if let Some(outcome) = self.poll() {
            tracing::debug!(?outcome, "Applied pending completion before issuing");
        }
        match self.operation.in_flight_kind() {
            None => Ok(()),
            Some(in_flight) => {
                tracing::debug!(%in_flight, "Refusing overlapping call");
                Err(Refusal::Busy { in_flight })
            }
        }
    }

    fn dispatch<F>(&mut self, kind: CallKind, request: F) -> RequestSeq
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let seq = self.last_seq.next();
        self.last_seq = seq;

        let (tx, rx) = oneshot::channel();
        let timeout = self.request_timeout;
        let task = tokio::spawn(async move {
            let completion = match tokio::time::timeout(timeout, request).await {
                Ok(completion) => completion,
                Err(_) => {
                    tracing::warn!(%seq, %kind, timeout_ms = millis(timeout), "Call timed out");
                    Completion::timed_out(kind)
                }
            };
            let _ = tx.send(completion);
        });

        self.operation = OperationState::InFlight(InFlightCall::new(seq, kind, rx, task));
        seq
    }

    fn apply(&mut self, call: &InFlightCall, completion: Completion) -> CallOutcome {
        let elapsed_ms = millis(call.started.elapsed());
        let seq = call.seq;

        match completion {
            Completion::Start(Ok(progress)) => {
                tracing::info!(%seq, elapsed_ms, "Session ready");
                self.progress = progress;
                self.status = Some(StatusMessage::Ready);
                CallOutcome::Applied {
                    kind: CallKind::StartSession,
                }
            }
            Completion::Start(Err(err)) => {
                tracing::warn!(%seq, elapsed_ms, error = %err, "Session start failed");
                let failure = if err.is_unreachable() {
                    StartFailure::Unreachable
                } else {
                    StartFailure::UnexpectedResponse
                };
                self.status = Some(StatusMessage::StartFailed(failure));
                CallOutcome::TransportFailed {
                    kind: CallKind::StartSession,
                    error: err.to_string(),
                }
            }
            Completion::Choice(Ok(ChoiceReply::Applied { progress, message })) => {
                tracing::info!(%seq, elapsed_ms, "Choice applied");
                self.progress = progress;
                self.status = Some(message.map_or(StatusMessage::Updated, StatusMessage::Outcome));
                CallOutcome::Applied {
                    kind: CallKind::SubmitAction,
                }
            }
            Completion::Choice(Ok(ChoiceReply::Rejected { status, detail })) => {
                tracing::info!(%seq, elapsed_ms, status, "Choice rejected");
                self.status = Some(detail.map_or(StatusMessage::Error, StatusMessage::Rejected));
                CallOutcome::Rejected { status }
            }
            Completion::Choice(Err(err)) => {
                tracing::warn!(%seq, elapsed_ms, error = %err, "Choice submission failed");
                self.status = Some(if matches!(err, TransportError::TimedOut) {
                    StatusMessage::TimedOut
                } else {
                    StatusMessage::NetworkError
                });
                CallOutcome::TransportFailed {
                    kind: CallKind::SubmitAction,
                    error: err.to_string(),
                }
            }
        }
    }

    fn task_lost(&mut self, call: &InFlightCall) -> CallOutcome {
        tracing::error!(seq = %call.seq, kind = %call.kind, "Call task ended without a result");
        self.status = Some(match call.kind {
            CallKind::StartSession => StatusMessage::StartFailed(StartFailure::UnexpectedResponse),
            CallKind::SubmitAction => StatusMessage::NetworkError,
        });
        CallOutcome::TransportFailed {
            kind: call.kind,
            error: "request task ended without a result".to_string(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
