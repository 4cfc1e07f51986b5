use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::cognitive::context::{detect_context_shift, FocusContext};
use crate::cognitive::persona::{select_persona, PersonaTag, SystemHealth};
use crate::cognitive::risk::{assess_risk, RiskProfile};

/// Sentinel returned when a turn must not reach any executor.
pub const SAFETY_OVERRIDE: &str = "ACTION_BLOCKED_CRITICAL_RISK";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Start,
    ContextUpdated,
    RiskAssessed,
    Halted,
    PersonaSelected,
}

impl TurnStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Halted | Self::PersonaSelected)
    }
}

/// Outcome of one conversation turn. Callers must branch on this variant, not on
/// the risk level, before running anything with side effects.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnResult {
    Halted {
        #[serde(rename = "override")]
        override_tag: &'static str,
        risk_profile: RiskProfile,
    },
    Proceed {
        focus_context: FocusContext,
        risk_profile: RiskProfile,
        persona: PersonaTag,
    },
}

impl TurnResult {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }

    pub fn override_tag(&self) -> Option<&'static str> {
        match self {
            Self::Halted { override_tag, .. } => Some(*override_tag),
            Self::Proceed { .. } => None,
        }
    }

    pub fn risk_profile(&self) -> &RiskProfile {
        match self {
            Self::Halted { risk_profile, .. } | Self::Proceed { risk_profile, .. } => risk_profile,
        }
    }

    pub fn persona(&self) -> Option<PersonaTag> {
        match self {
            Self::Halted { .. } => None,
            Self::Proceed { persona, .. } => Some(*persona),
        }
    }

    pub fn terminal_stage(&self) -> TurnStage {
        match self {
            Self::Halted { .. } => TurnStage::Halted,
            Self::Proceed { .. } => TurnStage::PersonaSelected,
        }
    }
}

/// Per-conversation gate state. Turns are sequential: `process_turn` takes
/// `&mut self`, and each conversation owns its own gate.
#[derive(Clone, Debug, PartialEq)]
pub struct CognitiveGate {
    focus: FocusContext,
    frustration_level: f64,
    system_health: SystemHealth,
    turns_processed: u64,
    turns_halted: u64,
}

impl Default for CognitiveGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CognitiveGate {
    pub fn new() -> Self {
        Self {
            focus: FocusContext::default(),
            frustration_level: 0.0,
            system_health: SystemHealth::Optimal,
            turns_processed: 0,
            turns_halted: 0,
        }
    }

    pub fn with_focus(mut self, focus: FocusContext) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_frustration_level(mut self, frustration_level: f64) -> Self {
        self.frustration_level = frustration_level;
        self
    }

    pub fn with_system_health(mut self, system_health: SystemHealth) -> Self {
        self.system_health = system_health;
        self
    }

    pub fn focus(&self) -> &FocusContext {
        &self.focus
    }

    pub fn frustration_level(&self) -> f64 {
        self.frustration_level
    }

    pub fn system_health(&self) -> SystemHealth {
        self.system_health
    }

    pub fn turns_processed(&self) -> u64 {
        self.turns_processed
    }

    pub fn turns_halted(&self) -> u64 {
        self.turns_halted
    }

    /// Upstream signal; the gate never derives frustration on its own.
    pub fn set_frustration_level(&mut self, frustration_level: f64) {
        self.frustration_level = frustration_level;
    }

    pub fn set_system_health(&mut self, system_health: SystemHealth) {
        self.system_health = system_health;
    }

    /// Pins a resource in the current topic, e.g. after the operator selects a VM.
    pub fn focus_resource(&mut self, resource_id: impl Into<String>) {
        self.focus = FocusContext {
            active_resource_id: Some(resource_id.into()),
            ..self.focus.clone()
        };
    }

    pub fn process_turn(&mut self, user_input: &str, intent: &str) -> TurnResult {
        debug!(event_name = "cognitive.gate.stage", stage = ?TurnStage::Start, intent);
        self.turns_processed += 1;

        self.focus = detect_context_shift(user_input, &self.focus);
        debug!(
            event_name = "cognitive.gate.stage",
            stage = ?TurnStage::ContextUpdated,
            topic = %self.focus.current_topic
        );

        let risk_profile = assess_risk(intent, self.frustration_level);
        debug!(
            event_name = "cognitive.gate.stage",
            stage = ?TurnStage::RiskAssessed,
            risk = %risk_profile.command_risk_level()
        );

        if risk_profile.is_critical() {
            self.turns_halted += 1;
            error!(
                event_name = "cognitive.gate.safety_override",
                intent,
                risk = %risk_profile.command_risk_level(),
                stability = %risk_profile.user_emotional_stability(),
                "safety override triggered, halting turn"
            );
            return TurnResult::Halted { override_tag: SAFETY_OVERRIDE, risk_profile };
        }

        let persona = select_persona(intent, self.system_health);
        info!(
            event_name = "cognitive.gate.turn_completed",
            intent,
            risk = %risk_profile.command_risk_level(),
            persona = %persona,
            "cognitive analysis complete"
        );

        TurnResult::Proceed { focus_context: self.focus.clone(), risk_profile, persona }
    }

    pub fn process_turn_with_audit<S>(
        &mut self,
        user_input: &str,
        intent: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> TurnResult
    where
        S: AuditSink + ?Sized,
    {
        let result = self.process_turn(user_input, intent);
        let risk = result.risk_profile();
        let event = match &result {
            TurnResult::Halted { override_tag, .. } => AuditEvent::from_context(
                audit,
                "gate.turn_halted",
                AuditCategory::Gate,
                AuditOutcome::Rejected,
            )
            .with_metadata("override", *override_tag),
            TurnResult::Proceed { persona, .. } => AuditEvent::from_context(
                audit,
                "gate.turn_proceeded",
                AuditCategory::Gate,
                AuditOutcome::Success,
            )
            .with_metadata("persona", persona.as_str()),
        };
        sink.emit(
            event
                .with_metadata("intent", intent)
                .with_metadata("risk", risk.command_risk_level().as_str())
                .with_metadata("stability", risk.user_emotional_stability().as_str())
                .with_metadata("step_up_auth", risk.requires_step_up_auth().to_string())
                .with_metadata("topic", self.focus.current_topic.clone()),
        );
        result
    }
}
