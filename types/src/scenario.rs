//! Static scenario content for the three modules.
//!
//! Scenarios are data. The only thing they compute is the payload of the
//! [`ActionRequest`] a choice produces; ground-truth labels ride along in that
//! payload for the scoring service and are never scored locally.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ActionRequest, ModuleId};

/// Credibility label a learner can attach to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostLabel {
    Verified,
    Misleading,
    Hoax,
}

impl PostLabel {
    pub const ALL: [PostLabel; 3] = [Self::Verified, Self::Misleading, Self::Hoax];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Misleading => "misleading",
            Self::Hoax => "hoax",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for PostLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A social post the learner must label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrebunkPost {
    pub id: &'static str,
    pub content: &'static str,
    pub source: &'static str,
    pub technique: &'static str,
    pub truth: PostLabel,
}

impl PrebunkPost {
    pub const ACTION_TYPE: &'static str = "label_post";

    #[must_use]
    pub fn label_action(&self, label: PostLabel) -> ActionRequest {
        ActionRequest::for_module(
            ModuleId::Prebunking,
            Self::ACTION_TYPE,
            json!({
                "post_id": self.id,
                "label": label,
                "truth": self.truth,
            }),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DilemmaOption {
    pub key: &'static str,
    pub label: &'static str,
}

/// A group-chat situation with a fixed set of responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthicalDilemma {
    pub id: &'static str,
    pub context: &'static str,
    pub options: &'static [DilemmaOption],
}

impl EthicalDilemma {
    pub const ACTION_TYPE: &'static str = "chat_decision";

    /// Build the decision for option `key`, or `None` if the key is not offered.
    #[must_use]
    pub fn decision_action(&self, key: &str) -> Option<ActionRequest> {
        let option = self.options.iter().find(|option| option.key == key)?;
        Some(ActionRequest::for_module(
            ModuleId::Ethical,
            Self::ACTION_TYPE,
            json!({ "choice": option.key }),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAttempt {
    pub key: &'static str,
    pub label: &'static str,
    pub success: bool,
}

/// A workplace situation where each attempt is known to succeed or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfessionalTask {
    pub id: &'static str,
    pub context: &'static str,
    pub attempts: &'static [TaskAttempt],
}

impl ProfessionalTask {
    pub const ACTION_TYPE: &'static str = "task_attempt";

    /// Build the attempt at zero-based `index`.
    #[must_use]
    pub fn attempt_action(&self, index: usize) -> Option<ActionRequest> {
        let attempt = self.attempts.get(index)?;
        Some(ActionRequest::for_module(
            ModuleId::Professional,
            Self::ACTION_TYPE,
            json!({ "task": attempt.key, "success": attempt.success }),
        ))
    }
}

pub const PREBUNK_POST: PrebunkPost = PrebunkPost {
    id: "p1",
    content: "BREAKING: Famous doctor says chocolate cures all diseases! Share NOW before it gets deleted! 🍫",
    source: "health-tips-now.biz",
    technique: "emotion/urgency",
    truth: PostLabel::Hoax,
};

pub const ETHICAL_DILEMMA: EthicalDilemma = EthicalDilemma {
    id: "e1",
    context: "Class group chat: A few classmates start making jokes about Alex's accent during a voice note.",
    options: &[
        DilemmaOption {
            key: "intervene",
            label: "Step in and call it out respectfully",
        },
        DilemmaOption {
            key: "report",
            label: "Privately report to the teacher/moderator",
        },
        DilemmaOption {
            key: "stay_silent",
            label: "Stay silent and hope it stops",
        },
        DilemmaOption {
            key: "participate",
            label: "Join in with a joke",
        },
    ],
};

pub const PROFESSIONAL_MEETING: ProfessionalTask = ProfessionalTask {
    id: "pro1",
    context: "Virtual meeting is going off-track. Two teammates are arguing. You need a decision in 5 minutes.",
    attempts: &[
        TaskAttempt {
            key: "meeting",
            label: "Refocus with an agenda + action items (Success)",
            success: true,
        },
        TaskAttempt {
            key: "meeting",
            label: "Ignore conflict and end meeting (Fail)",
            success: false,
        },
    ],
};
