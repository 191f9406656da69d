use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 6;

/// Labels for 1..=6, in order.
pub const LIKERT_LABELS: [&str; 6] = [
    "Strongly Disagree",
    "Disagree",
    "Weakly Disagree",
    "Weakly Agree",
    "Agree",
    "Strongly Agree",
];

/// A Likert-scale answer, always within `LIKERT_MIN..=LIKERT_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Answer(u8);

impl Answer {
    /// Lower midpoint of the scale.
    pub const MIDPOINT: Answer = Answer((LIKERT_MIN + LIKERT_MAX) / 2);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (LIKERT_MIN as i64..=LIKERT_MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::AnswerOutOfRange {
                value,
                min: LIKERT_MIN,
                max: LIKERT_MAX,
            })
        }
    }

    /// Clamp an arbitrary value into the scale.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(LIKERT_MIN as i64, LIKERT_MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        LIKERT_LABELS[(self.0 - LIKERT_MIN) as usize]
    }

    /// Every value on the scale, ascending.
    pub fn all() -> impl Iterator<Item = Answer> {
        (LIKERT_MIN..=LIKERT_MAX).map(Answer)
    }
}

impl Default for Answer {
    fn default() -> Self {
        Self::MIDPOINT
    }
}

impl TryFrom<i64> for Answer {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Answer::new(value)
    }
}

impl From<Answer> for u8 {
    fn from(answer: Answer) -> Self {
        answer.0
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
