//! Per-call operation state.
//!
//! The engine is either `Idle` or has exactly one call `InFlight`. A call moves
//! `Idle -> InFlight -> {Applied | Rejected | TransportFailed}` and back to
//! `Idle`; a second call is refused while one is in flight, so completions are
//! applied in issue order.

use std::fmt;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use litera_client::{ChoiceReply, TransportError};
use litera_types::ProgressState;

/// Monotonic number assigned to each issued call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSeq(u64);

impl RequestSeq {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub(crate) const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    StartSession,
    SubmitAction,
}

impl CallKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartSession => "start_session",
            Self::SubmitAction => "submit_action",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the service task produced.
#[derive(Debug)]
pub(crate) enum Completion {
    Start(Result<ProgressState, TransportError>),
    Choice(Result<ChoiceReply, TransportError>),
}

impl Completion {
    pub(crate) fn timed_out(kind: CallKind) -> Self {
        match kind {
            CallKind::StartSession => Self::Start(Err(TransportError::TimedOut)),
            CallKind::SubmitAction => Self::Choice(Err(TransportError::TimedOut)),
        }
    }
}

/// A call on the wire. Dropping it aborts the service task.
#[derive(Debug)]
pub(crate) struct InFlightCall {
    pub(crate) seq: RequestSeq,
    pub(crate) kind: CallKind,
    pub(crate) started: Instant,
    pub(crate) rx: oneshot::Receiver<Completion>,
    task: JoinHandle<()>,
}

impl InFlightCall {
    pub(crate) fn new(
        seq: RequestSeq,
        kind: CallKind,
        rx: oneshot::Receiver<Completion>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            seq,
            kind,
            started: Instant::now(),
            rx,
            task,
        }
    }
}

impl Drop for InFlightCall {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationTag {
    Idle,
    InFlight,
}

#[derive(Debug, Default)]
pub(crate) enum OperationState {
    #[default]
    Idle,
    InFlight(InFlightCall),
}

impl OperationState {
    pub(crate) const fn tag(&self) -> OperationTag {
        match self {
            Self::Idle => OperationTag::Idle,
            Self::InFlight(_) => OperationTag::InFlight,
        }
    }

    pub(crate) fn in_flight_kind(&self) -> Option<CallKind> {
        match self {
            Self::Idle => None,
            Self::InFlight(call) => Some(call.kind),
        }
    }

    /// Leave `InFlight`, handing back the call that was on the wire.
    pub(crate) fn finish(&mut self) -> Option<InFlightCall> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::InFlight(call) => Some(call),
        }
    }
}
