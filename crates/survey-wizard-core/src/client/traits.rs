use async_trait::async_trait;

use super::wire::{
    AnswerFeedbackRequest, ChatRequest, FeedbackReply, FinalFeedbackRequest, SessionStart,
};
use crate::error::ApiError;
use crate::survey::{Demographics, Distribution, Question};
use crate::wizard::SurveySubmission;

/// The survey service as seen by the wizard controller.
///
/// Every method is one independent request/response; implementations hold no
/// session state. [`super::RemoteSurveyClient`] talks HTTP, tests substitute
/// an in-memory backend.
#[async_trait]
pub trait SurveyBackend: Send + Sync {
    /// `GET /questions`
    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError>;

    /// `POST /validate_usercode`
    async fn validate_user_code(&self, usercode: &str) -> Result<bool, ApiError>;

    /// `POST /register_user`, returns the issued usercode.
    async fn register_user(&self, demographics: &Demographics) -> Result<String, ApiError>;

    /// `POST /users/{usercode}/session/start`
    async fn start_session(&self, usercode: &str) -> Result<SessionStart, ApiError>;

    /// `GET /question_answers/{id}`. An empty distribution is a normal reply.
    async fn fetch_answer_distribution(&self, question_id: &str) -> Result<Distribution, ApiError>;

    /// `POST /submit_survey`
    async fn submit_survey(&self, submission: &SurveySubmission) -> Result<(), ApiError>;

    /// `POST /v1/chat`, returns the assistant's text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;

    /// `POST /v1/survey/answer_feedback`
    async fn answer_feedback(&self, request: &AnswerFeedbackRequest) -> Result<FeedbackReply, ApiError>;

    /// `POST /v1/survey/final_feedback`
    async fn final_feedback(&self, request: &FinalFeedbackRequest) -> Result<FeedbackReply, ApiError>;
}
