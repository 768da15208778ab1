//! Route guard for protected views.

use serde::{Deserialize, Serialize};

use crate::session::AuthPhase;

/// What a protected view should do given the current auth phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Phase not settled yet, render a spinner and do nothing.
    Wait,
    RedirectToLogin,
    Allow,
}

pub fn for_phase(phase: &AuthPhase) -> GuardDecision {
    match phase {
        AuthPhase::Unknown | AuthPhase::Loading => GuardDecision::Wait,
        AuthPhase::Anonymous => GuardDecision::RedirectToLogin,
        AuthPhase::Authenticated { .. } => GuardDecision::Allow,
    }
}
