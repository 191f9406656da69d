use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    #[serde(rename = "AI")]
    Ai,
    User,
}

impl ChatRole {
    /// Role name used by the `/v1/chat` endpoint.
    pub fn wire_name(self) -> &'static str {
        match self {
            ChatRole::Ai => "assistant",
            ChatRole::User => "user",
        }
    }
}

/// One entry of a per-question chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }
}
