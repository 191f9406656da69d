//! # Survey Wizard Core Library
//!
//! Core logic for a guided Likert survey: consent and intake pages, a
//! question-by-question wizard with per-question chat and peer comparison,
//! and a final submission. Presentation layers (the bundled CLI, or any
//! other frontend) drive [`StepFlowController`] and render [`WizardState`].
//!
//! ## Architecture
//!
//! - **Onboarding**: explicit page graph with guarded transitions
//! - **Wizard**: pure state plus a controller that spawns backend calls and
//!   merges their results through request tickets
//! - **Client**: [`SurveyBackend`] trait and its HTTP implementation
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`WizardState`]: survey progress, single source of truth
//! - [`StepFlowController`]: intents in, events out
//! - [`RemoteSurveyClient`]: JSON/HTTP backend client
//! - [`Config`]: application configuration management

pub mod client;
pub mod error;
pub mod events;
pub mod onboarding;
pub mod storage;
pub mod survey;
pub mod wizard;

pub use client::{ClientOptions, RemoteSurveyClient, RetryPolicy, SurveyBackend};
pub use error::{ApiError, ConfigError, CoreError, FlowError, ValidationError};
pub use events::Event;
pub use onboarding::{OnboardingFlow, Page};
pub use storage::Config;
pub use survey::{
    Answer, ChatMessage, ChatRole, Demographics, Distribution, DistributionView, Question, Step,
};
pub use wizard::{ControllerSettings, RequestTicket, StepFlowController, SurveySubmission, WizardState};
