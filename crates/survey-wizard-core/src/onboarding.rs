//! Onboarding page graph.
//!
//! ```text
//! Front -> Description -> UserCheck -> Demographics -> Instructions -> Wizard -> Completion
//!              |                   \-> ReturnCode ----------------------/
//!              \-- decline --> Front
//! ```
//!
//! Every transition is an explicit method guarded by the current page. Home
//! returns to `Front` from anywhere except `Wizard`; the identity reset that
//! goes with leaving `Completion` lives in [`crate::wizard::WizardState`].

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::survey::Demographics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Front,
    /// About page with the consent prompt.
    Description,
    /// "Is it your first time here?"
    UserCheck,
    ReturnCode,
    Demographics,
    Instructions,
    Wizard,
    Completion,
}

impl Page {
    /// Pages reachable in one transition, excluding Home.
    pub fn successors(self) -> &'static [Page] {
        match self {
            Page::Front => &[Page::Description],
            Page::Description => &[Page::UserCheck, Page::Front],
            Page::UserCheck => &[Page::Demographics, Page::ReturnCode, Page::Description],
            Page::ReturnCode => &[Page::Wizard, Page::UserCheck],
            Page::Demographics => &[Page::Instructions, Page::UserCheck],
            Page::Instructions => &[Page::Wizard, Page::Demographics],
            Page::Wizard => &[Page::Completion],
            Page::Completion => &[Page::Front],
        }
    }

    pub fn home_enabled(self) -> bool {
        self != Page::Wizard
    }
}

/// Pre-survey navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingFlow {
    page: Page,
    /// Validated but not yet registered intake form. Registration happens
    /// when leaving Instructions, so abandoning there leaves no orphan user.
    pending_demographics: Option<Demographics>,
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            page: Page::Front,
            pending_demographics: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn pending_demographics(&self) -> Option<&Demographics> {
        self.pending_demographics.as_ref()
    }

    pub fn can_go_to(&self, target: Page) -> bool {
        self.page.successors().contains(&target) || (target == Page::Front && self.page.home_enabled())
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Front -> Description.
    pub fn start(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::Front, "start")?;
        self.go(Page::Description)
    }

    /// Description -> UserCheck, only on explicit acceptance.
    pub fn accept_consent(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::Description, "accept consent")?;
        self.go(Page::UserCheck)
    }

    /// Declining consent always lands on Front.
    pub fn decline_consent(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::Description, "decline consent")?;
        self.go(Page::Front)
    }

    /// UserCheck -> Demographics.
    pub fn first_visit(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::UserCheck, "choose first visit")?;
        self.go(Page::Demographics)
    }

    /// UserCheck -> ReturnCode.
    pub fn returning_visit(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::UserCheck, "choose returning visit")?;
        self.go(Page::ReturnCode)
    }

    /// Demographics -> Instructions, carrying the validated form as pending.
    pub fn submit_demographics(&mut self, form: Demographics) -> Result<Page, crate::error::CoreError> {
        self.expect(Page::Demographics, "submit demographics")?;
        let form = form.trimmed();
        form.validate()?;
        self.pending_demographics = Some(form);
        Ok(self.go(Page::Instructions)?)
    }

    /// ReturnCode|Instructions -> Wizard. The caller is responsible for
    /// having obtained a server-issued or server-validated identity.
    pub fn enter_wizard(&mut self) -> Result<Page, FlowError> {
        match self.page {
            Page::ReturnCode | Page::Instructions => {
                self.pending_demographics = None;
                self.go(Page::Wizard)
            }
            from => Err(FlowError::InvalidTransition {
                from,
                action: "enter the survey",
            }),
        }
    }

    /// Wizard -> Completion.
    pub fn complete(&mut self) -> Result<Page, FlowError> {
        self.expect(Page::Wizard, "complete the survey")?;
        self.go(Page::Completion)
    }

    /// Follow the back edge of the current page.
    pub fn back(&mut self) -> Result<Page, FlowError> {
        let target = match self.page {
            Page::Description => Page::Front,
            Page::UserCheck => Page::Description,
            Page::ReturnCode | Page::Demographics => Page::UserCheck,
            Page::Instructions => Page::Demographics,
            from => {
                return Err(FlowError::InvalidTransition {
                    from,
                    action: "go back",
                })
            }
        };
        self.go(target)
    }

    /// Return to Front from any page except Wizard. Drops pending demographics.
    pub fn home(&mut self) -> Result<Page, FlowError> {
        if !self.page.home_enabled() {
            return Err(FlowError::HomeDisabled);
        }
        self.pending_demographics = None;
        self.go(Page::Front)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn expect(&self, page: Page, action: &'static str) -> Result<(), FlowError> {
        if self.page == page {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                from: self.page,
                action,
            })
        }
    }

    fn go(&mut self, target: Page) -> Result<Page, FlowError> {
        tracing::debug!(from = ?self.page, to = ?target, "page transition");
        self.page = target;
        Ok(target)
    }
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}
