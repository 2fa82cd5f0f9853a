//! Session identity: generation, holding, and validation of session identifiers.

use std::fmt::{self, Write};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{EmptyStringError, NonEmptyString};

const ID_PREFIX: &str = "sess_";
const RANDOM_CHARS: usize = 6;
const TIME_DIGITS_MODULUS: i64 = 10_000;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An opaque, non-empty session identifier.
///
/// The scoring service keys learner progress by this value. It is never
/// normalized: whatever the learner typed is what gets sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(NonEmptyString);

impl SessionId {
    pub fn parse(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        NonEmptyString::new(value).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produce a fresh identifier: `sess_` + 6 random base-36 characters + the
/// last 4 digits of the current millisecond clock.
#[must_use]
pub fn generate_identifier() -> SessionId {
    let mut random = rand::random::<u64>();
    let mut id = String::with_capacity(ID_PREFIX.len() + RANDOM_CHARS + 4);
    id.push_str(ID_PREFIX);
    for _ in 0..RANDOM_CHARS {
        id.push(char::from(BASE36[(random % 36) as usize]));
        random /= 36;
    }
    let millis = Utc::now().timestamp_millis().rem_euclid(TIME_DIGITS_MODULUS);
    let _ = write!(id, "{millis:04}");
    SessionId(NonEmptyString(id))
}

/// Holds the learner's current (possibly user-edited) session identifier.
///
/// The raw text is kept verbatim so a half-typed identifier survives between
/// edits; [`SessionIdentity::current`] is the validated view used before any
/// network call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdentity {
    raw: String,
}

impl SessionIdentity {
    /// An identity holding nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An identity pre-filled with a freshly generated identifier.
    #[must_use]
    pub fn generated() -> Self {
        Self {
            raw: generate_identifier().as_str().to_string(),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<SessionId> {
        SessionId::parse(self.raw.as_str()).ok()
    }

    #[must_use]
    pub fn current_raw(&self) -> &str {
        &self.raw
    }

    /// Replace the held identifier verbatim (used to resume a known session).
    pub fn set(&mut self, value: impl Into<String>) {
        self.raw = value.into();
    }

    /// Return the held identifier, generating and storing one if it is empty.
    pub fn ensure(&mut self) -> SessionId {
        if let Some(id) = self.current() {
            return id;
        }
        let id = generate_identifier();
        self.raw = id.as_str().to_string();
        id
    }
}
