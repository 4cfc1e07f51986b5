pub mod audit;
pub mod cognitive;
pub mod config;
pub mod errors;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use cognitive::{
    assess_risk, detect_context_shift, select_persona, CognitiveGate, CommandRiskLevel,
    FocusContext, PersonaTag, RiskProfile, SystemHealth, TurnInput, TurnResult, TurnStage,
    UserEmotionalStability, SAFETY_OVERRIDE,
};
pub use errors::{ApplicationError, DomainError, ErrorClass, InterfaceError};
