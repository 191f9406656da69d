//! Request and response bodies exchanged with the survey backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::survey::{ChatMessage, Question};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ValidateRequest<'a> {
    pub usercode: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UsercodeReply {
    pub usercode: String,
}

/// Reply of `POST /users/{usercode}/session/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStart {
    pub usercode: String,
    /// Kept verbatim: the backend emits naive timestamps without an offset.
    #[serde(default)]
    pub session_start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.wire_name().to_string(),
            content: message.text.clone(),
        }
    }
}

/// Body of `POST /v1/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub usercode: Option<String>,
    pub messages: Vec<WireMessage>,
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// Body of `POST /v1/survey/answer_feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerFeedbackRequest {
    pub usercode: String,
    pub survey_id: String,
    pub question_id: Value,
    pub question_text: String,
    pub answer: u8,
    pub max_new_tokens: u32,
    pub temperature: f64,
}

/// One entry of `all_answers` in the final feedback request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: Value,
    pub question_text: String,
    pub answer: u8,
}

impl AnswerRecord {
    pub fn new(question: &Question, answer: u8) -> Self {
        Self {
            question_id: question_id_value(&question.id),
            question_text: question.text.clone(),
            answer,
        }
    }
}

/// Body of `POST /v1/survey/final_feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalFeedbackRequest {
    pub usercode: String,
    pub survey_id: String,
    pub all_answers: Vec<AnswerRecord>,
    pub summary_of_user: Option<String>,
    pub max_new_tokens: u32,
    pub temperature: f64,
}

/// Reply of the `/v1/chat` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TextReply {
    pub text: String,
}

/// Reply of both feedback endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReply {
    pub text: String,
    #[serde(default)]
    pub feedback_id: Option<i64>,
    #[serde(default)]
    pub session_no: Option<i64>,
}

/// The backend keys questions by integer; send numeric ids as numbers.
pub fn question_id_value(id: &str) -> Value {
    id.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_question_ids_go_out_as_numbers() {
        assert_eq!(question_id_value("12"), json!(12));
        assert_eq!(question_id_value("q-12"), json!("q-12"));
    }

    #[test]
    fn chat_roles_map_to_wire_names() {
        let ai: WireMessage = (&ChatMessage::ai("hi")).into();
        let user: WireMessage = (&ChatMessage::user("hello")).into();
        assert_eq!(ai.role, "assistant");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn feedback_reply_tolerates_missing_ids() {
        let reply: FeedbackReply = serde_json::from_str(r#"{"text": "Nice"}"#).unwrap();
        assert_eq!(reply.feedback_id, None);
        assert_eq!(reply.text, "Nice");
    }
}
