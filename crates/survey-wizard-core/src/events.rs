use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::onboarding::Page;
use crate::survey::ChatRole;

/// Every effective state change in the wizard produces an Event.
/// No-op transitions (gated advance, repeated submission) produce none.
/// The presentation layer drains them to decide what to re-render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PageChanged {
        from: Page,
        to: Page,
        at: DateTime<Utc>,
    },
    QuestionsLoaded {
        count: usize,
        at: DateTime<Utc>,
    },
    IdentityAssigned {
        usercode: String,
        returning: bool,
        at: DateTime<Utc>,
    },
    AnswerChanged {
        step: usize,
        value: u8,
        /// True when the edit revoked an earlier submission.
        reopened: bool,
        at: DateTime<Utc>,
    },
    AnswerSubmitted {
        step: usize,
        value: u8,
        at: DateTime<Utc>,
    },
    StepChanged {
        from: usize,
        to: usize,
        at: DateTime<Utc>,
    },
    ChatAppended {
        step: usize,
        role: ChatRole,
        at: DateTime<Utc>,
    },
    DistributionLoaded {
        step: usize,
        total: usize,
        at: DateTime<Utc>,
    },
    /// A late reply was dropped because its step moved on.
    StaleReplyDiscarded {
        step: usize,
        at: DateTime<Utc>,
    },
    SurveySubmitted {
        usercode: String,
        answered: usize,
        /// False when the backend call failed; completion happens anyway.
        acknowledged: bool,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
}
