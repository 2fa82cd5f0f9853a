//! Human-readable outcome of the most recent engine operation.

use std::fmt;

use crate::NonEmptyString;

/// Why a session start failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    /// Connection refused, DNS failure, or timeout.
    Unreachable,
    /// The service answered, but not with a usable progress snapshot.
    UnexpectedResponse,
}

/// Closed set of status lines shown to the learner.
///
/// Overwritten by every operation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Connecting,
    Ready,
    StartFailed(StartFailure),
    Submitting,
    /// Choice applied, service gave no outcome message.
    Updated,
    /// Choice applied with the service's outcome message.
    Outcome(NonEmptyString),
    /// Choice rejected with the service's detail text.
    Rejected(NonEmptyString),
    /// Choice rejected without a usable detail.
    Error,
    NetworkError,
    TimedOut,
    StartSessionFirst,
}

impl StatusMessage {
    /// True while a request is on the wire.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Connecting | Self::Submitting)
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::StartFailed(_)
                | Self::Rejected(_)
                | Self::Error
                | Self::NetworkError
                | Self::TimedOut
                | Self::StartSessionFirst
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Ready => "Session ready",
            Self::StartFailed(StartFailure::Unreachable) => "Failed to start. Check backend URL.",
            Self::StartFailed(StartFailure::UnexpectedResponse) => {
                "Failed to start. The scoring service sent an unexpected response."
            }
            Self::Submitting => "Submitting...",
            Self::Updated => "Updated",
            Self::Outcome(message) | Self::Rejected(message) => message.as_str(),
            Self::Error => "Error",
            Self::NetworkError => "Network error",
            Self::TimedOut => "Network error (request timed out)",
            Self::StartSessionFirst => "Start a session first",
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
