//! Wizard state: the single source of truth for survey progress.
//!
//! Pure data plus transition functions, no I/O. Transitions that change
//! something return an [`Event`]; gated or repeated ones return `None`.
//!
//! ## Sequencing
//!
//! ```text
//! set_answer(i) --> mark_submitted(i) --> advance() --> step i+1
//!      ^                  |
//!      \---- edit --------/   (revokes the submission)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, ValidationError};
use crate::events::Event;
use crate::onboarding::{OnboardingFlow, Page};
use crate::survey::{
    Answer, ChatMessage, Distribution, DistributionSlot, DistributionView, Question, Step,
};

/// Identifies the state a spawned remote call was issued against, so a late
/// reply can be checked for staleness when it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket {
    /// Bumped by every full reset; replies from an earlier session are dropped.
    pub epoch: u64,
    pub step: usize,
    pub question_id: String,
    /// Per-step counter bumped by every edit and every submission event.
    pub revision: u64,
}

/// Body of `POST /submit_survey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub usercode: String,
    pub answers: BTreeMap<String, u8>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardState {
    flow: OnboardingFlow,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    submitted: BTreeSet<usize>,
    chats: Vec<Vec<ChatMessage>>,
    distributions: Vec<DistributionSlot>,
    revisions: Vec<u64>,
    usercode: Option<String>,
    loading: bool,
    step: usize,
    epoch: u64,
    default_answer: Answer,
    final_feedback: Option<String>,
}

impl WizardState {
    /// Empty state on the Front page, questions not loaded yet.
    pub fn new(default_answer: Answer) -> Self {
        Self {
            flow: OnboardingFlow::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            submitted: BTreeSet::new(),
            chats: Vec::new(),
            distributions: Vec::new(),
            revisions: Vec::new(),
            usercode: None,
            loading: true,
            step: 0,
            epoch: 0,
            default_answer,
            final_feedback: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn page(&self) -> Page {
        self.flow.page()
    }

    pub fn flow(&self) -> &OnboardingFlow {
        &self.flow
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn steps(&self) -> Vec<Step> {
        Step::derive(&self.questions)
    }

    pub fn step_count(&self) -> usize {
        self.questions.len()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.step)
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 >= self.questions.len()
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn answer(&self, step: usize) -> Option<Answer> {
        self.answers.get(step).copied()
    }

    pub fn submitted(&self) -> &BTreeSet<usize> {
        &self.submitted
    }

    pub fn is_submitted(&self, step: usize) -> bool {
        self.submitted.contains(&step)
    }

    pub fn chat(&self, step: usize) -> &[ChatMessage] {
        self.chats.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn distribution_view(&self, step: usize) -> DistributionView {
        match (self.distributions.get(step), self.answer(step)) {
            (Some(slot), Some(answer)) => slot.view(answer),
            _ => DistributionView::NotRequested,
        }
    }

    pub fn usercode(&self) -> Option<&str> {
        self.usercode.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Loaded, but the backend had nothing (or failed): "No questions available".
    pub fn has_no_questions(&self) -> bool {
        !self.loading && self.questions.is_empty()
    }

    pub fn final_feedback(&self) -> Option<&str> {
        self.final_feedback.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ── Question set ─────────────────────────────────────────────────

    /// Install the fetched, already length-capped question list.
    pub fn initialize(&mut self, questions: Vec<Question>) -> Event {
        self.questions = questions;
        self.reset_progress();
        self.loading = false;
        Event::QuestionsLoaded {
            count: self.questions.len(),
            at: Utc::now(),
        }
    }

    // ── Answers ──────────────────────────────────────────────────────

    /// Change an answer. Any edit revokes a prior submission of that step.
    pub fn set_answer(&mut self, step: usize, value: i64) -> Result<Event, ValidationError> {
        self.check_step(step)?;
        let answer = Answer::new(value)?;
        self.answers[step] = answer;
        self.revisions[step] += 1;
        let reopened = self.submitted.remove(&step);
        if reopened {
            self.distributions[step] = DistributionSlot::NotRequested;
        }
        Ok(Event::AnswerChanged {
            step,
            value: answer.value(),
            reopened,
            at: Utc::now(),
        })
    }

    /// Commit the step's answer. Re-submitting without an intervening edit
    /// changes nothing and returns `None`.
    pub fn mark_submitted(&mut self, step: usize) -> Result<Option<Event>, ValidationError> {
        self.check_step(step)?;
        if !self.submitted.insert(step) {
            return Ok(None);
        }
        self.revisions[step] += 1;
        let answer = self.answers[step];
        self.chats[step].push(ChatMessage::ai(format!(
            "You answered {} ({}). Thanks for submitting!",
            answer.value(),
            answer.label()
        )));
        Ok(Some(Event::AnswerSubmitted {
            step,
            value: answer.value(),
            at: Utc::now(),
        }))
    }

    // ── Chat ─────────────────────────────────────────────────────────

    pub fn append_chat(&mut self, step: usize, message: ChatMessage) -> Result<Event, ValidationError> {
        self.check_step(step)?;
        let role = message.role;
        self.chats[step].push(message);
        Ok(Event::ChatAppended {
            step,
            role,
            at: Utc::now(),
        })
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Move to the next step. No-op unless the current step is submitted.
    pub fn advance(&mut self) -> Option<Event> {
        if !self.is_submitted(self.step) || self.is_last_step() {
            return None;
        }
        self.move_to(self.step + 1)
    }

    pub fn retreat(&mut self) -> Option<Event> {
        if self.step == 0 {
            return None;
        }
        self.move_to(self.step - 1)
    }

    /// Run an onboarding transition and report the page change.
    pub fn navigate<E>(
        &mut self,
        transition: impl FnOnce(&mut OnboardingFlow) -> Result<Page, E>,
    ) -> Result<Event, E> {
        let from = self.flow.page();
        let to = transition(&mut self.flow)?;
        Ok(Event::PageChanged {
            from,
            to,
            at: Utc::now(),
        })
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// Attach the session's identity and enter the survey. Only valid from
    /// ReturnCode or Instructions; the usercode is set at most once.
    pub fn enter_wizard(&mut self, usercode: &str, returning: bool) -> Result<Vec<Event>, FlowError> {
        if self.usercode.is_some() {
            return Err(FlowError::IdentityAlreadySet);
        }
        if !matches!(self.page(), Page::ReturnCode | Page::Instructions) {
            return Err(FlowError::InvalidTransition {
                from: self.page(),
                action: "enter the survey",
            });
        }
        self.usercode = Some(usercode.to_string());
        let page_changed = self.navigate(OnboardingFlow::enter_wizard)?;
        tracing::info!(usercode, returning, "identity assigned");
        Ok(vec![
            Event::IdentityAssigned {
                usercode: usercode.to_string(),
                returning,
                at: Utc::now(),
            },
            page_changed,
        ])
    }

    // ── Completion ───────────────────────────────────────────────────

    /// Build the `{question_id: answer}` mapping for every question,
    /// submitted or not.
    pub fn finalize(&self) -> Result<SurveySubmission, FlowError> {
        let usercode = self.usercode.clone().ok_or(FlowError::IdentityMissing)?;
        let answers = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| (q.id.clone(), a.value()))
            .collect();
        Ok(SurveySubmission {
            usercode,
            answers,
            completed_at: Utc::now(),
        })
    }

    pub fn complete(&mut self) -> Result<Event, FlowError> {
        self.navigate(OnboardingFlow::complete)
    }

    pub fn set_final_feedback(&mut self, text: String) {
        self.final_feedback = Some(text);
    }

    /// Home action. From Completion this is the only way to drop the
    /// usercode and all survey progress; inside the survey it is rejected.
    pub fn return_home(&mut self) -> Result<Vec<Event>, FlowError> {
        let was_completed = self.page() == Page::Completion;
        let page_changed = self.navigate(OnboardingFlow::home)?;
        if !was_completed {
            return Ok(vec![page_changed]);
        }
        self.usercode = None;
        self.final_feedback = None;
        self.epoch += 1;
        self.reset_progress();
        Ok(vec![page_changed, Event::SessionReset { at: Utc::now() }])
    }

    // ── Remote replies ───────────────────────────────────────────────

    /// Snapshot for a call issued now against `step`.
    pub fn ticket(&self, step: usize) -> Option<RequestTicket> {
        let question = self.questions.get(step)?;
        Some(RequestTicket {
            epoch: self.epoch,
            step,
            question_id: question.id.clone(),
            revision: self.revisions[step],
        })
    }

    /// The ticket's question is still in place in the same session.
    pub fn holds_question(&self, ticket: &RequestTicket) -> bool {
        ticket.epoch == self.epoch
            && self
                .questions
                .get(ticket.step)
                .is_some_and(|q| q.id == ticket.question_id)
    }

    /// Same question and no edit or resubmission since the ticket was issued.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.holds_question(ticket) && self.revisions[ticket.step] == ticket.revision
    }

    pub fn mark_distribution_loading(&mut self, step: usize) {
        if let Some(slot) = self.distributions.get_mut(step) {
            *slot = DistributionSlot::Loading;
        }
    }

    /// Merge a distribution reply; stale replies are discarded.
    pub fn apply_distribution(&mut self, ticket: &RequestTicket, distribution: Distribution) -> Event {
        if !self.is_current(ticket) {
            tracing::debug!(step = ticket.step, "discarding stale distribution reply");
            return Event::StaleReplyDiscarded {
                step: ticket.step,
                at: Utc::now(),
            };
        }
        let total = distribution.total();
        self.distributions[ticket.step] = DistributionSlot::Loaded(distribution);
        Event::DistributionLoaded {
            step: ticket.step,
            total,
            at: Utc::now(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reset_progress(&mut self) {
        let n = self.questions.len();
        self.answers = vec![self.default_answer; n];
        self.chats = self
            .questions
            .iter()
            .map(|q| vec![ChatMessage::ai(q.chat_prompt())])
            .collect();
        self.distributions = vec![DistributionSlot::NotRequested; n];
        self.revisions = vec![0; n];
        self.submitted.clear();
        self.step = 0;
    }

    fn move_to(&mut self, to: usize) -> Option<Event> {
        let from = self.step;
        self.step = to.min(self.questions.len().saturating_sub(1));
        if self.step == from {
            return None;
        }
        Some(Event::StepChanged {
            from,
            to: self.step,
            at: Utc::now(),
        })
    }

    fn check_step(&self, step: usize) -> Result<(), ValidationError> {
        if self.questions.is_empty() {
            return Err(ValidationError::QuestionsNotLoaded);
        }
        if step >= self.questions.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "steps",
                index: step,
                len: self.questions.len(),
            });
        }
        Ok(())
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(Answer::default())
    }
}
