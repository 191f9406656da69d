//! Peer answer distributions returned by `GET /question_answers/{id}`.
//!
//! The endpoint has served both a bare `int[]` and a list of response rows
//! (`[{ "answer": 4, ... }]`). Anything that is not one of those shapes is
//! coerced to an empty distribution so the "no data yet" view is shown
//! instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::answer::{Answer, LIKERT_MAX, LIKERT_MIN};

/// All recorded answers for one question, across users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    answers: Vec<Answer>,
}

impl Distribution {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self { answers }
    }

    /// Coerce an arbitrary JSON payload. Entries without a usable in-range
    /// answer are dropped.
    pub fn from_value(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            return Self::default();
        };
        let answers = items
            .iter()
            .filter_map(|item| match item {
                Value::Object(row) => row.get("answer").and_then(Value::as_i64),
                other => other.as_i64(),
            })
            .filter_map(|v| Answer::new(v).ok())
            .collect();
        Self { answers }
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn total(&self) -> usize {
        self.answers.len()
    }

    /// Count per scale value; index 0 is `LIKERT_MIN`.
    pub fn counts(&self) -> [usize; (LIKERT_MAX - LIKERT_MIN + 1) as usize] {
        let mut counts = [0; (LIKERT_MAX - LIKERT_MIN + 1) as usize];
        for a in &self.answers {
            counts[(a.value() - LIKERT_MIN) as usize] += 1;
        }
        counts
    }

    /// Render-ready comparison against the user's own answer.
    pub fn view(&self, user_answer: Answer) -> DistributionView {
        if self.is_empty() {
            return DistributionView::NoDataYet {
                your_answer: user_answer,
            };
        }
        let counts = self.counts();
        let total = self.total();
        let your_count = counts[(user_answer.value() - LIKERT_MIN) as usize];
        let your_percentage = ((your_count as f64 / total as f64) * 100.0).round() as u32;
        DistributionView::Summary {
            total,
            counts,
            your_answer: user_answer,
            your_count,
            your_percentage,
        }
    }
}

/// What the presentation layer renders for a step's comparison panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionView {
    /// The request has not been issued (step not submitted yet).
    NotRequested,
    /// Request in flight.
    Loading,
    /// Nobody has answered yet, or the payload was unusable.
    NoDataYet { your_answer: Answer },
    Summary {
        total: usize,
        counts: [usize; (LIKERT_MAX - LIKERT_MIN + 1) as usize],
        your_answer: Answer,
        your_count: usize,
        your_percentage: u32,
    },
}

/// Per-step distribution state held by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum DistributionSlot {
    #[default]
    NotRequested,
    Loading,
    Loaded(Distribution),
}

impl DistributionSlot {
    pub fn view(&self, user_answer: Answer) -> DistributionView {
        match self {
            DistributionSlot::NotRequested => DistributionView::NotRequested,
            DistributionSlot::Loading => DistributionView::Loading,
            DistributionSlot::Loaded(d) => d.view(user_answer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn a(v: i64) -> Answer {
        Answer::new(v).unwrap()
    }

    #[test]
    fn accepts_bare_integer_arrays() {
        let d = Distribution::from_value(&json!([1, 4, 4, 6]));
        assert_eq!(d.total(), 4);
        assert_eq!(d.counts(), [1, 0, 0, 2, 0, 1]);
    }

    #[test]
    fn accepts_response_rows() {
        let d = Distribution::from_value(&json!([
            {"id": 1, "question_id": 3, "answer": 2, "session_no": 1},
            {"id": 2, "question_id": 3, "answer": 5, "session_no": 1},
        ]));
        assert_eq!(d.answers(), &[a(2), a(5)]);
    }

    #[test]
    fn malformed_payloads_become_empty() {
        assert!(Distribution::from_value(&json!({"detail": "boom"})).is_empty());
        assert!(Distribution::from_value(&json!("nope")).is_empty());
        assert!(Distribution::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn out_of_range_and_non_numeric_entries_are_dropped() {
        let d = Distribution::from_value(&json!([0, 3, 11, "x", {"answer": "4"}, {"other": 1}, 6]));
        assert_eq!(d.answers(), &[a(3), a(6)]);
    }

    #[test]
    fn empty_distribution_renders_no_data_yet() {
        let view = Distribution::default().view(a(4));
        assert_eq!(view, DistributionView::NoDataYet { your_answer: a(4) });
    }

    #[test]
    fn summary_reports_share_of_users_answer() {
        let d = Distribution::new(vec![a(4), a(4), a(1)]);
        match d.view(a(4)) {
            DistributionView::Summary {
                total,
                your_count,
                your_percentage,
                ..
            } => {
                assert_eq!(total, 3);
                assert_eq!(your_count, 2);
                assert_eq!(your_percentage, 67);
            }
            other => panic!("Expected Summary, got {other:?}"),
        }
    }

    #[test]
    fn slot_views_track_request_state() {
        assert_eq!(DistributionSlot::NotRequested.view(a(3)), DistributionView::NotRequested);
        assert_eq!(DistributionSlot::Loading.view(a(3)), DistributionView::Loading);
    }
}
