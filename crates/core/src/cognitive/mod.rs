//! Cognitive gating engine: conversational focus, risk scoring, persona
//! selection, and the per-conversation gate that decides whether a turn may
//! reach an executor at all.

pub mod context;
pub mod gate;
pub mod input;
pub mod persona;
pub mod risk;

pub use context::{detect_context_shift, FocusContext, KEYWORD_MATCH_CONFIDENCE, TOPIC_KEYWORDS};
pub use gate::{CognitiveGate, TurnResult, TurnStage, SAFETY_OVERRIDE};
pub use input::{validate_frustration, validate_intent, TurnInput};
pub use persona::{select_persona, PersonaTag, SystemHealth};
pub use risk::{
    assess_risk, classify_command, CommandRiskLevel, RiskProfile, UserEmotionalStability,
};
