//! Survey domain types: questions, Likert answers, demographics, chat
//! transcripts and peer answer distributions.

mod answer;
mod chat;
mod demographics;
mod distribution;
mod question;

pub use answer::{Answer, LIKERT_LABELS, LIKERT_MAX, LIKERT_MIN};
pub use chat::{ChatMessage, ChatRole};
pub use demographics::Demographics;
pub use distribution::{Distribution, DistributionSlot, DistributionView};
pub use question::{Question, Step};
