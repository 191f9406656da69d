//! Step flow controller.
//!
//! Translates user intents into [`WizardState`] transitions and backend
//! calls. Advisory calls (distribution, answer feedback, chat) run as
//! spawned tasks; each captures a [`RequestTicket`] and reports back on a
//! channel. Results are merged by [`StepFlowController::poll_completions`]
//! or [`StepFlowController::settle`], never by the task itself.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use super::state::{RequestTicket, WizardState};
use crate::client::{
    AnswerFeedbackRequest, AnswerRecord, ChatRequest, FeedbackReply, FinalFeedbackRequest,
    SurveyBackend, WireMessage,
};
use crate::client::wire::question_id_value;
use crate::error::{ApiError, CoreError, FlowError, Result, ValidationError};
use crate::events::Event;
use crate::onboarding::{OnboardingFlow, Page};
use crate::storage::{Config, LlmConfig};
use crate::survey::{Answer, ChatMessage, Demographics, Distribution};

/// Reply shown when the chat backend fails.
pub const CHAT_FALLBACK: &str = "Server error. Try again.";
/// Reply used when LLM calls are disabled.
pub const CHAT_PLACEHOLDER: &str = "Placeholder LLM response.";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub survey_id: String,
    pub max_questions: usize,
    pub default_answer: Answer,
    pub llm: LlmConfig,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            survey_id: config.survey.survey_id.clone(),
            max_questions: config.survey.max_questions,
            default_answer: config.default_answer(),
            llm: config.llm.clone(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        (&Config::default()).into()
    }
}

/// Result of a spawned call, tagged with the state it was issued against.
#[derive(Debug)]
enum Completion {
    Distribution {
        ticket: RequestTicket,
        result: Result<Distribution, ApiError>,
    },
    AnswerFeedback {
        ticket: RequestTicket,
        result: Result<FeedbackReply, ApiError>,
    },
    ChatReply {
        ticket: RequestTicket,
        result: Result<String, ApiError>,
    },
}

pub struct StepFlowController {
    backend: Arc<dyn SurveyBackend>,
    settings: ControllerSettings,
    state: WizardState,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    pending: usize,
    events: Vec<Event>,
}

impl StepFlowController {
    pub fn new(backend: Arc<dyn SurveyBackend>, settings: ControllerSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: WizardState::new(settings.default_answer),
            backend,
            settings,
            tx,
            rx,
            pending: 0,
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Spawned calls whose results have not been merged yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Questions ────────────────────────────────────────────────────

    /// Fetch the question set once. A failed fetch installs an empty set,
    /// which the presentation layer shows as "No questions available".
    pub async fn load_questions(&mut self) {
        if !self.state.is_loading() {
            return;
        }
        let questions = match self.backend.fetch_questions().await {
            Ok(mut questions) => {
                questions.truncate(self.settings.max_questions);
                questions
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load questions");
                Vec::new()
            }
        };
        let event = self.state.initialize(questions);
        self.events.push(event);
    }

    // ── Onboarding ───────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::start)
    }

    pub fn accept_consent(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::accept_consent)
    }

    pub fn decline_consent(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::decline_consent)
    }

    pub fn first_visit(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::first_visit)
    }

    pub fn returning_visit(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::returning_visit)
    }

    pub fn back(&mut self) -> Result<()> {
        self.navigate(OnboardingFlow::back)
    }

    pub fn submit_demographics(&mut self, form: Demographics) -> Result<()> {
        self.navigate(|flow| flow.submit_demographics(form))
    }

    pub fn home(&mut self) -> Result<()> {
        let events = self.state.return_home()?;
        self.events.extend(events);
        Ok(())
    }

    /// Check a return code with the backend and enter the survey with it.
    /// A rejected code leaves page and identity untouched.
    pub async fn submit_return_code(&mut self, code: &str) -> Result<()> {
        self.require_page(Page::ReturnCode, "submit a return code")?;
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyUserCode.into());
        }
        if !self.backend.validate_user_code(code).await? {
            tracing::debug!("return code rejected");
            return Err(FlowError::InvalidUserCode.into());
        }
        let events = self.state.enter_wizard(code, true)?;
        self.events.extend(events);
        self.start_session(code).await;
        Ok(())
    }

    /// Register the pending demographics and enter the survey with the
    /// issued usercode. On failure the user stays on Instructions.
    pub async fn accept_instructions(&mut self) -> Result<()> {
        self.require_page(Page::Instructions, "accept the instructions")?;
        let form = self
            .state
            .flow()
            .pending_demographics()
            .cloned()
            .ok_or(FlowError::NoPendingDemographics)?;
        let usercode = self.backend.register_user(&form).await?;
        let events = self.state.enter_wizard(&usercode, false)?;
        self.events.extend(events);
        self.start_session(&usercode).await;
        Ok(())
    }

    async fn start_session(&self, usercode: &str) {
        match self.backend.start_session(usercode).await {
            Ok(session) => tracing::debug!(
                usercode,
                started = session.session_start_time.as_deref().unwrap_or("-"),
                "session started"
            ),
            Err(e) => tracing::warn!(usercode, error = %e, "failed to start session"),
        }
    }

    // ── Survey steps ─────────────────────────────────────────────────

    pub fn on_answer_change(&mut self, value: i64) -> Result<()> {
        self.require_page(Page::Wizard, "change an answer")?;
        let event = self.state.set_answer(self.state.step(), value)?;
        self.events.push(event);
        Ok(())
    }

    /// Commit the current answer and request the peer distribution plus,
    /// when enabled, per-answer feedback. A repeat without an edit in
    /// between issues nothing.
    pub fn on_submit_answer(&mut self) -> Result<()> {
        self.require_page(Page::Wizard, "submit an answer")?;
        let step = self.state.step();
        let Some(event) = self.state.mark_submitted(step)? else {
            return Ok(());
        };
        self.events.push(event);
        let Some(ticket) = self.state.ticket(step) else {
            return Ok(());
        };

        self.state.mark_distribution_loading(step);
        let backend = Arc::clone(&self.backend);
        let issued = ticket.clone();
        let question_id = ticket.question_id.clone();
        self.spawn(
            "/question_answers",
            async move { backend.fetch_answer_distribution(&question_id).await },
            move |result| Completion::Distribution {
                ticket: issued,
                result,
            },
        );

        if self.settings.llm.enabled && self.settings.llm.answer_feedback {
            if let Some(request) = self.answer_feedback_request(step) {
                let backend = Arc::clone(&self.backend);
                self.spawn(
                    "/v1/survey/answer_feedback",
                    async move { backend.answer_feedback(&request).await },
                    move |result| Completion::AnswerFeedback { ticket, result },
                );
            }
        }
        Ok(())
    }

    /// Append the user's message and ask the assistant. The reply lands in
    /// the transcript of the step it was asked on.
    pub fn on_send_chat(&mut self, text: &str) -> Result<()> {
        self.require_page(Page::Wizard, "send a message")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let step = self.state.step();
        let event = self.state.append_chat(step, ChatMessage::user(text))?;
        self.events.push(event);

        if !self.settings.llm.enabled {
            let event = self.state.append_chat(step, ChatMessage::ai(CHAT_PLACEHOLDER))?;
            self.events.push(event);
            return Ok(());
        }

        let Some(ticket) = self.state.ticket(step) else {
            return Ok(());
        };
        let request = self.chat_request(step);
        let backend = Arc::clone(&self.backend);
        self.spawn(
            "/v1/chat",
            async move { backend.chat(&request).await },
            move |result| Completion::ChatReply { ticket, result },
        );
        Ok(())
    }

    pub fn on_next(&mut self) -> Result<()> {
        self.require_page(Page::Wizard, "go to the next question")?;
        self.events.extend(self.state.advance());
        Ok(())
    }

    pub fn on_back(&mut self) -> Result<()> {
        self.require_page(Page::Wizard, "go to the previous question")?;
        self.events.extend(self.state.retreat());
        Ok(())
    }

    /// Submit every answer and enter Completion. The page changes even if
    /// the backend rejects the submission; the return value reports whether
    /// it was acknowledged. Finishing without questions is rejected before
    /// anything is sent.
    pub async fn finish(&mut self) -> Result<bool> {
        self.require_page(Page::Wizard, "finish the survey")?;
        if self.state.questions().is_empty() {
            return Err(ValidationError::QuestionsNotLoaded.into());
        }
        let submission = self.state.finalize()?;
        let acknowledged = match self.backend.submit_survey(&submission).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(usercode = %submission.usercode, error = %e, "survey submission failed");
                false
            }
        };

        if self.settings.llm.enabled && self.settings.llm.final_feedback {
            let request = self.final_feedback_request(&submission.usercode);
            match self.backend.final_feedback(&request).await {
                Ok(reply) => self.state.set_final_feedback(reply.text),
                Err(e) => tracing::warn!(error = %e, "final feedback unavailable"),
            }
        }

        let page_changed = self.state.complete()?;
        self.events.push(page_changed);
        tracing::info!(
            usercode = %submission.usercode,
            answered = submission.answers.len(),
            acknowledged,
            "survey finished"
        );
        self.events.push(Event::SurveySubmitted {
            usercode: submission.usercode,
            answered: submission.answers.len(),
            acknowledged,
            at: Utc::now(),
        });
        Ok(acknowledged)
    }

    // ── Merging spawned results ──────────────────────────────────────

    /// Merge every result that has already arrived. Returns how many.
    pub fn poll_completions(&mut self) -> usize {
        let mut merged = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.apply(completion);
            merged += 1;
        }
        merged
    }

    /// Wait for every outstanding call and merge its result.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            let Some(completion) = self.rx.recv().await else {
                break;
            };
            self.pending -= 1;
            self.apply(completion);
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Distribution { ticket, result } => {
                let distribution = result.unwrap_or_else(|e| {
                    tracing::warn!(question = %ticket.question_id, error = %e, "distribution unavailable");
                    Distribution::default()
                });
                let event = self.state.apply_distribution(&ticket, distribution);
                self.events.push(event);
            }
            Completion::AnswerFeedback { ticket, result } => match result {
                Ok(reply) if self.state.is_current(&ticket) => {
                    self.append_reply(ticket.step, reply.text);
                }
                Ok(_) => self.discard(&ticket),
                Err(e) => {
                    tracing::warn!(question = %ticket.question_id, error = %e, "answer feedback unavailable");
                }
            },
            Completion::ChatReply { ticket, result } => {
                if !self.state.holds_question(&ticket) {
                    self.discard(&ticket);
                    return;
                }
                let text = result.unwrap_or_else(|e| {
                    tracing::warn!(question = %ticket.question_id, error = %e, "chat reply failed");
                    CHAT_FALLBACK.to_string()
                });
                self.append_reply(ticket.step, text);
            }
        }
    }

    fn append_reply(&mut self, step: usize, text: String) {
        match self.state.append_chat(step, ChatMessage::ai(text)) {
            Ok(event) => self.events.push(event),
            Err(e) => tracing::warn!(step, error = %e, "dropping reply"),
        }
    }

    fn discard(&mut self, ticket: &RequestTicket) {
        tracing::debug!(step = ticket.step, "discarding stale reply");
        self.events.push(Event::StaleReplyDiscarded {
            step: ticket.step,
            at: Utc::now(),
        });
    }

    // ── Request builders ─────────────────────────────────────────────

    fn chat_request(&self, step: usize) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.state.chat(step).len() + 1);
        if let (Some(question), Some(answer)) = (self.state.questions().get(step), self.state.answer(step)) {
            messages.push(WireMessage::system(format!(
                "You are helping a participant with a survey question: \"{}\". \
                 Their current answer is {} ({}) on a scale from 1 (Strongly Disagree) \
                 to 6 (Strongly Agree). Answer briefly and do not pick an answer for them.",
                question.text,
                answer.value(),
                answer.label()
            )));
        }
        messages.extend(self.state.chat(step).iter().map(WireMessage::from));
        ChatRequest {
            usercode: self.state.usercode().map(str::to_string),
            messages,
            max_new_tokens: self.settings.llm.max_new_tokens,
            temperature: self.settings.llm.temperature,
            top_p: self.settings.llm.top_p,
        }
    }

    fn answer_feedback_request(&self, step: usize) -> Option<AnswerFeedbackRequest> {
        let question = self.state.questions().get(step)?;
        Some(AnswerFeedbackRequest {
            usercode: self.state.usercode()?.to_string(),
            survey_id: self.settings.survey_id.clone(),
            question_id: question_id_value(&question.id),
            question_text: question.text.clone(),
            answer: self.state.answer(step)?.value(),
            max_new_tokens: self.settings.llm.feedback_max_new_tokens,
            temperature: self.settings.llm.temperature,
        })
    }

    fn final_feedback_request(&self, usercode: &str) -> FinalFeedbackRequest {
        FinalFeedbackRequest {
            usercode: usercode.to_string(),
            survey_id: self.settings.survey_id.clone(),
            all_answers: self
                .state
                .questions()
                .iter()
                .zip(self.state.answers())
                .map(|(q, a)| AnswerRecord::new(q, a.value()))
                .collect(),
            summary_of_user: None,
            max_new_tokens: self.settings.llm.final_max_new_tokens,
            temperature: self.settings.llm.temperature,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn navigate<E: Into<CoreError>>(
        &mut self,
        transition: impl FnOnce(&mut OnboardingFlow) -> std::result::Result<Page, E>,
    ) -> Result<()> {
        let event = self.state.navigate(transition).map_err(Into::into)?;
        self.events.push(event);
        Ok(())
    }

    fn require_page(&self, page: Page, action: &'static str) -> Result<(), FlowError> {
        if self.state.page() == page {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                from: self.state.page(),
                action,
            })
        }
    }

    /// Run `call` on its own task. A call that panics or is cancelled still
    /// reports back, as an `ApiError::Aborted`, so `pending` always drains.
    fn spawn<T, F, W>(&mut self, endpoint: &'static str, call: F, wrap: W)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
        W: FnOnce(Result<T, ApiError>) -> Completion + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        let call = tokio::spawn(call);
        tokio::spawn(async move {
            let result = call.await.unwrap_or_else(|e| {
                Err(ApiError::Aborted {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })
            });
            // The receiver lives as long as the controller.
            let _ = tx.send(wrap(result));
        });
    }
}
