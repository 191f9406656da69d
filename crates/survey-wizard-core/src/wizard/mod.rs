//! Survey progress and the controller that drives it.

mod controller;
mod state;

pub use controller::{ControllerSettings, StepFlowController, CHAT_FALLBACK, CHAT_PLACEHOLDER};
pub use state::{RequestTicket, SurveySubmission, WizardState};
