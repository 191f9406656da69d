use serde::{Deserialize, Deserializer, Serialize};

/// A survey question as served by `GET /questions`.
///
/// The backend emits integer ids; they are normalised to strings so the rest
/// of the crate never cares which one it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "id_from_str_or_int")]
    pub id: String,
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// The AI prompt that seeds this question's chat transcript.
    pub fn chat_prompt(&self) -> String {
        format!("Any questions about {}?", self.text.to_lowercase())
    }
}

/// One question's position in the wizard sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub question_index: usize,
    pub question_id: String,
    pub question_text: String,
}

impl Step {
    /// Derive the ordered step list. Chat is folded into the question's step.
    pub fn derive(questions: &[Question]) -> Vec<Step> {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| Step {
                question_index: i,
                question_id: q.id.clone(),
                question_text: q.text.clone(),
            })
            .collect()
    }
}

fn id_from_str_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}
