//! Network boundary: the [`SurveyBackend`] seam and its HTTP implementation.

mod http;
mod traits;
pub mod wire;

pub use http::{ClientOptions, RemoteSurveyClient, RetryPolicy};
pub use traits::SurveyBackend;
pub use wire::{
    AnswerFeedbackRequest, AnswerRecord, ChatRequest, FeedbackReply, FinalFeedbackRequest,
    SessionStart, WireMessage,
};
