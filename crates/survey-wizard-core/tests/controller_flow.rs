//! End-to-end controller scenarios against an in-memory backend.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use survey_wizard_core::client::{
    AnswerFeedbackRequest, ChatRequest, FeedbackReply, FinalFeedbackRequest, SessionStart,
};
use survey_wizard_core::error::{CoreError, FlowError, ValidationError};
use survey_wizard_core::{
    Answer, ApiError, ChatRole, ControllerSettings, Demographics, Distribution, DistributionView,
    Event, Page, Question, StepFlowController, SurveyBackend, SurveySubmission,
};

// ============================================================================
// Fake backend
// ============================================================================

#[derive(Default)]
struct FakeBackend {
    questions: Option<Vec<Question>>,
    valid_codes: Vec<String>,
    reject_submission: bool,
    /// Replies for successive distribution calls: (delay, answers).
    distributions: Mutex<VecDeque<(Duration, Vec<u8>)>>,
    distribution_calls: Mutex<Vec<String>>,
    submissions: Mutex<Vec<SurveySubmission>>,
    registrations: Mutex<Vec<Demographics>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    chat_delay: Duration,
}

impl FakeBackend {
    fn with_questions(n: usize) -> Self {
        Self {
            questions: Some(
                (1..=n)
                    .map(|i| Question::new(i.to_string(), format!("Statement {i}")))
                    .collect(),
            ),
            valid_codes: vec!["ABCD1234".to_string()],
            ..Self::default()
        }
    }

    fn unavailable(endpoint: &str) -> ApiError {
        ApiError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
            body: String::new(),
        }
    }
}

#[async_trait]
impl SurveyBackend for FakeBackend {
    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError> {
        self.questions
            .clone()
            .ok_or_else(|| Self::unavailable("/questions"))
    }

    async fn validate_user_code(&self, usercode: &str) -> Result<bool, ApiError> {
        Ok(self.valid_codes.iter().any(|c| c == usercode))
    }

    async fn register_user(&self, demographics: &Demographics) -> Result<String, ApiError> {
        self.registrations.lock().unwrap().push(demographics.clone());
        Ok("NEW00001".to_string())
    }

    async fn start_session(&self, usercode: &str) -> Result<SessionStart, ApiError> {
        Ok(SessionStart {
            usercode: usercode.to_string(),
            session_start_time: None,
        })
    }

    async fn fetch_answer_distribution(&self, question_id: &str) -> Result<Distribution, ApiError> {
        self.distribution_calls
            .lock()
            .unwrap()
            .push(question_id.to_string());
        let next = self.distributions.lock().unwrap().pop_front();
        let (delay, values) = next.unwrap_or_default();
        tokio::time::sleep(delay).await;
        Ok(Distribution::new(
            values.into_iter().map(|v| Answer::clamped(v as i64)).collect(),
        ))
    }

    async fn submit_survey(&self, submission: &SurveySubmission) -> Result<(), ApiError> {
        self.submissions.lock().unwrap().push(submission.clone());
        if self.reject_submission {
            Err(Self::unavailable("/submit_survey"))
        } else {
            Ok(())
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.chat_delay).await;
        Ok("It measures how much you agree.".to_string())
    }

    async fn answer_feedback(&self, request: &AnswerFeedbackRequest) -> Result<FeedbackReply, ApiError> {
        Ok(FeedbackReply {
            text: format!("Noted your {} on this one.", request.answer),
            feedback_id: Some(1),
            session_no: Some(1),
        })
    }

    async fn final_feedback(&self, request: &FinalFeedbackRequest) -> Result<FeedbackReply, ApiError> {
        Ok(FeedbackReply {
            text: format!("You answered {} questions.", request.all_answers.len()),
            feedback_id: Some(2),
            session_no: Some(1),
        })
    }
}

fn without_llm() -> ControllerSettings {
    let mut settings = ControllerSettings::default();
    settings.llm.enabled = false;
    settings
}

async fn returning_user(backend: Arc<FakeBackend>, settings: ControllerSettings) -> StepFlowController {
    let mut c = StepFlowController::new(backend, settings);
    c.load_questions().await;
    c.start().unwrap();
    c.accept_consent().unwrap();
    c.returning_visit().unwrap();
    c.submit_return_code("ABCD1234").await.unwrap();
    c
}

// ============================================================================
// Onboarding
// ============================================================================

/// Test: an unknown return code leaves page and identity unchanged.
#[tokio::test]
async fn test_unknown_return_code_is_rejected_inline() {
    let mut c = StepFlowController::new(Arc::new(FakeBackend::with_questions(3)), without_llm());
    c.load_questions().await;
    c.start().unwrap();
    c.accept_consent().unwrap();
    c.returning_visit().unwrap();

    let err = c.submit_return_code("WRONG").await.unwrap_err();
    assert!(matches!(err, CoreError::Flow(FlowError::InvalidUserCode)));
    assert_eq!(err.to_string(), "Flow error: Invalid code. Please try again.");
    assert_eq!(c.state().page(), Page::ReturnCode);
    assert_eq!(c.state().usercode(), None);

    // Retryable with the right code.
    c.submit_return_code("ABCD1234").await.unwrap();
    assert_eq!(c.state().page(), Page::Wizard);
}

/// Test: first-time users register when leaving Instructions, not before.
#[tokio::test]
async fn test_first_visit_registers_on_instructions() {
    let backend = Arc::new(FakeBackend::with_questions(3));
    let mut c = StepFlowController::new(backend.clone(), without_llm());
    c.start().unwrap();
    c.accept_consent().unwrap();
    c.first_visit().unwrap();
    c.submit_demographics(Demographics {
        age: " 22 ".into(),
        gender: "male".into(),
        country: "Kenya".into(),
        education: "Bachelor".into(),
        field: "Economics".into(),
        years_of_study: "3".into(),
    })
    .unwrap();
    assert!(backend.registrations.lock().unwrap().is_empty());

    c.accept_instructions().await.unwrap();
    assert_eq!(c.state().page(), Page::Wizard);
    assert_eq!(c.state().usercode(), Some("NEW00001"));
    let registrations = backend.registrations.lock().unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].age, "22");

    let events = c.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::IdentityAssigned { returning: false, .. })));
}

/// Test: a failed question fetch degrades to an empty set.
#[tokio::test]
async fn test_question_fetch_failure_degrades() {
    let mut c = StepFlowController::new(Arc::new(FakeBackend::default()), without_llm());
    assert!(c.state().is_loading());
    c.load_questions().await;
    assert!(c.state().has_no_questions());
}

// ============================================================================
// Survey steps
// ============================================================================

/// Test: answer, submit, advance, then editing the earlier answer reopens it.
#[tokio::test]
async fn test_edit_after_submit_reopens_step() {
    let backend = Arc::new(FakeBackend::with_questions(10));
    let mut c = returning_user(backend, without_llm()).await;

    c.on_answer_change(4).unwrap();
    c.on_submit_answer().unwrap();
    assert_eq!(c.state().submitted(), &BTreeSet::from([0]));

    c.on_next().unwrap();
    assert_eq!(c.state().step(), 1);

    c.on_back().unwrap();
    c.on_answer_change(5).unwrap();
    assert!(c.state().submitted().is_empty());
    c.settle().await;
}

/// Test: next is gated on submission.
#[tokio::test]
async fn test_next_requires_submission() {
    let mut c = returning_user(Arc::new(FakeBackend::with_questions(3)), without_llm()).await;
    c.on_next().unwrap();
    assert_eq!(c.state().step(), 0);
    assert!(c.drain_events().iter().all(|e| !matches!(e, Event::StepChanged { .. })));
}

/// Test: submitting twice issues one request and one confirmation message.
#[tokio::test]
async fn test_double_submit_is_idempotent() {
    let backend = Arc::new(FakeBackend::with_questions(3));
    let mut c = returning_user(backend.clone(), without_llm()).await;
    c.on_submit_answer().unwrap();
    c.on_submit_answer().unwrap();
    c.settle().await;

    assert_eq!(backend.distribution_calls.lock().unwrap().len(), 1);
    assert_eq!(c.state().chat(0).len(), 2);
    assert_eq!(c.state().submitted(), &BTreeSet::from([0]));
}

/// Test: a distribution reply for a superseded submission is discarded.
#[tokio::test]
async fn test_out_of_order_distribution_replies() {
    let backend = Arc::new(FakeBackend::with_questions(3));
    backend.distributions.lock().unwrap().extend([
        (Duration::from_millis(50), vec![1, 1, 1]),
        (Duration::ZERO, vec![6]),
    ]);
    let mut c = returning_user(backend, without_llm()).await;

    c.on_submit_answer().unwrap();
    c.on_answer_change(6).unwrap();
    c.on_submit_answer().unwrap();
    c.settle().await;

    match c.state().distribution_view(0) {
        DistributionView::Summary {
            total, your_count, ..
        } => {
            assert_eq!(total, 1);
            assert_eq!(your_count, 1);
        }
        other => panic!("unexpected view: {other:?}"),
    }
    assert!(c
        .drain_events()
        .iter()
        .any(|e| matches!(e, Event::StaleReplyDiscarded { step: 0, .. })));
}

/// Test: an empty distribution renders the "no data yet" view.
#[tokio::test]
async fn test_empty_distribution_has_no_data_yet() {
    let mut c = returning_user(Arc::new(FakeBackend::with_questions(2)), without_llm()).await;
    c.on_submit_answer().unwrap();
    assert_eq!(c.state().distribution_view(0), DistributionView::Loading);
    c.settle().await;
    assert!(matches!(
        c.state().distribution_view(0),
        DistributionView::NoDataYet { .. }
    ));
}

/// Test: answer feedback is appended after the confirmation message.
#[tokio::test]
async fn test_answer_feedback_appended() {
    let mut c = returning_user(
        Arc::new(FakeBackend::with_questions(2)),
        ControllerSettings::default(),
    )
    .await;
    c.on_answer_change(5).unwrap();
    c.on_submit_answer().unwrap();
    c.settle().await;
    let chat = c.state().chat(0);
    assert_eq!(chat.len(), 3);
    assert_eq!(chat[2].text, "Noted your 5 on this one.");
}

// ============================================================================
// Chat
// ============================================================================

/// Test: the chat request carries question context and the transcript.
#[tokio::test]
async fn test_chat_request_context() {
    let backend = Arc::new(FakeBackend::with_questions(2));
    let mut c = returning_user(backend.clone(), ControllerSettings::default()).await;
    c.on_send_chat("  What is meant here? ").unwrap();
    c.settle().await;

    let requests = backend.chat_requests.lock().unwrap();
    let messages = &requests[0].messages;
    assert_eq!(messages[0].role, "system");
    assert!(messages[0].content.contains("Statement 1"));
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(messages.last().unwrap().content, "What is meant here?");
    assert_eq!(requests[0].usercode.as_deref(), Some("ABCD1234"));

    let chat = c.state().chat(0);
    assert_eq!(chat.last().unwrap().role, ChatRole::Ai);
    assert_eq!(chat.last().unwrap().text, "It measures how much you agree.");
}

/// Test: a reply lands on the step it was asked on, even after navigating.
#[tokio::test]
async fn test_chat_reply_follows_originating_step() {
    let backend = Arc::new(FakeBackend {
        chat_delay: Duration::from_millis(30),
        ..FakeBackend::with_questions(3)
    });
    let mut settings = ControllerSettings::default();
    settings.llm.answer_feedback = false;
    let mut c = returning_user(backend, settings).await;

    c.on_submit_answer().unwrap();
    c.on_send_chat("Quick question").unwrap();
    c.on_next().unwrap();
    c.settle().await;

    assert_eq!(c.state().step(), 1);
    assert_eq!(c.state().chat(0).len(), 4);
    assert_eq!(c.state().chat(1).len(), 1);
}

// ============================================================================
// Completion
// ============================================================================

/// Test: every question is submitted, defaults included.
#[tokio::test]
async fn test_finish_submits_all_answers() {
    let backend = Arc::new(FakeBackend::with_questions(3));
    let mut c = returning_user(backend.clone(), ControllerSettings::default()).await;
    c.on_answer_change(2).unwrap();
    c.on_submit_answer().unwrap();
    c.settle().await;

    assert!(c.finish().await.unwrap());
    assert_eq!(c.state().page(), Page::Completion);
    assert_eq!(c.state().final_feedback(), Some("You answered 3 questions."));

    let submissions = backend.submissions.lock().unwrap();
    let answers = &submissions[0].answers;
    assert_eq!(answers.len(), 3);
    assert_eq!(answers.get("1"), Some(&2));
    assert_eq!(answers.get("3"), Some(&3));
}

/// Test: a rejected submission still reaches Completion with the usercode.
#[tokio::test]
async fn test_rejected_submission_completes() {
    let backend = Arc::new(FakeBackend {
        reject_submission: true,
        ..FakeBackend::with_questions(2)
    });
    let mut c = returning_user(backend, without_llm()).await;
    assert!(!c.finish().await.unwrap());
    assert_eq!(c.state().page(), Page::Completion);
    assert_eq!(c.state().usercode(), Some("ABCD1234"));
}

/// Test: finishing with no questions loaded sends nothing and stays put.
#[tokio::test]
async fn test_finish_without_questions_is_rejected() {
    let backend = Arc::new(FakeBackend {
        valid_codes: vec!["ABCD1234".to_string()],
        ..FakeBackend::default()
    });
    let mut c = returning_user(backend.clone(), ControllerSettings::default()).await;
    assert!(c.state().has_no_questions());
    assert_eq!(c.state().page(), Page::Wizard);

    let err = c.finish().await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::QuestionsNotLoaded)));
    assert!(backend.submissions.lock().unwrap().is_empty());
    assert_eq!(c.state().page(), Page::Wizard);
    assert!(!c
        .drain_events()
        .iter()
        .any(|e| matches!(e, Event::SurveySubmitted { .. })));
}

/// Test: home from Completion resets; replies from the old session are dropped.
#[tokio::test]
async fn test_home_after_completion_discards_late_replies() {
    let backend = Arc::new(FakeBackend::with_questions(2));
    backend
        .distributions
        .lock()
        .unwrap()
        .push_back((Duration::from_millis(30), vec![4]));
    let mut c = returning_user(backend, without_llm()).await;

    c.on_submit_answer().unwrap();
    c.finish().await.unwrap();
    c.home().unwrap();
    c.settle().await;

    assert_eq!(c.state().page(), Page::Front);
    assert_eq!(c.state().usercode(), None);
    assert_eq!(c.state().distribution_view(0), DistributionView::NotRequested);
    assert!(c.state().submitted().is_empty());
}

/// Test: home is rejected inside the survey.
#[tokio::test]
async fn test_home_disabled_in_wizard() {
    let mut c = returning_user(Arc::new(FakeBackend::with_questions(2)), without_llm()).await;
    assert!(matches!(c.home(), Err(CoreError::Flow(FlowError::HomeDisabled))));
    assert_eq!(c.state().page(), Page::Wizard);
}
