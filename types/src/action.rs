use std::fmt;

use serde::{Deserialize, Serialize};

/// The three instructional modules the game ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Prebunking,
    Ethical,
    Professional,
}

impl ModuleId {
    /// Wire identifier sent to the scoring service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prebunking => "prebunking",
            Self::Ethical => "ethical",
            Self::Professional => "professional",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Prebunking => "Prebunking: Spot the Manipulation",
            Self::Ethical => "Ethical Dilemma: Cyberbullying",
            Self::Professional => "Professional Communication",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One learner decision, built fresh for each submission.
///
/// `module` and `action_type` are plain strings: the scoring service owns the
/// vocabulary and rejects what it does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub module: String,
    pub action_type: String,
    pub payload: serde_json::Value,
}

impl ActionRequest {
    #[must_use]
    pub fn new(
        module: impl Into<String>,
        action_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            module: module.into(),
            action_type: action_type.into(),
            payload,
        }
    }

    #[must_use]
    pub fn for_module(
        module: ModuleId,
        action_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::new(module.as_str(), action_type, payload)
    }
}
