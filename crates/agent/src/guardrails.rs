use alma_core::cognitive::{CommandRiskLevel, TurnResult};

use crate::tools::{ActionKind, ActionRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason_code, .. } | Self::Degrade { reason_code, .. } => {
                Some(*reason_code)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub confirm_destructive: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { confirm_destructive: true }
    }
}

impl GuardrailPolicy {
    /// Decides whether `request` may reach an executor after `turn`. A halted turn
    /// denies every action kind; nothing side-effecting runs on that turn.
    pub fn evaluate(&self, turn: &TurnResult, request: &ActionRequest) -> GuardrailDecision {
        if let TurnResult::Halted { override_tag, .. } = turn {
            return GuardrailDecision::Deny {
                reason_code: "safety_override_active",
                user_message: format!(
                    "I've stopped here ({override_tag}). `{}` will not run on this turn; \
                     step-up authentication is required before it can be retried.",
                    request.intent
                ),
                fallback_path: "step_up_authentication",
            };
        }

        if request.kind == ActionKind::Destroy && request.resource_id.is_none() {
            return GuardrailDecision::Degrade {
                reason_code: "destructive_target_missing",
                user_message: format!(
                    "`{}` needs a target. Select the resource to remove and send it again.",
                    request.intent
                ),
                fallback_path: "select_resource",
            };
        }

        let risk = turn.risk_profile().command_risk_level();
        let unconfirmed_destroy = request.kind == ActionKind::Destroy && !request.confirmed;
        if self.confirm_destructive && unconfirmed_destroy && risk >= CommandRiskLevel::High {
            return GuardrailDecision::Degrade {
                reason_code: "destructive_action_unconfirmed",
                user_message: format!(
                    "`{}` is destructive. Confirm explicitly{} to continue.",
                    request.intent,
                    request
                        .resource_id
                        .as_deref()
                        .map(|resource| format!(" for `{resource}`"))
                        .unwrap_or_default()
                ),
                fallback_path: "explicit_confirmation",
            };
        }

        GuardrailDecision::Allow
    }
}
