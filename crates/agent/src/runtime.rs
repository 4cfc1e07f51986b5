use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alma_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use alma_core::cognitive::{
    CognitiveGate, FocusContext, PersonaTag, SystemHealth, TurnInput, TurnResult,
};
use alma_core::config::AppConfig;
use alma_core::errors::ApplicationError;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::FrustrationEstimator;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::tools::{ActionExecutor, ActionKind, ActionRequest, DryRunExecutor, ExecutorRegistry};

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeSettings {
    pub initial_system_health: SystemHealth,
    pub frustration_enabled: bool,
    pub frustration_smoothing: f64,
    pub dry_run: bool,
    pub max_sessions: usize,
    pub confirm_destructive: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            initial_system_health: config.gate.initial_system_health,
            frustration_enabled: config.frustration.enabled,
            frustration_smoothing: config.frustration.smoothing,
            dry_run: config.execution.dry_run,
            max_sessions: config.execution.max_sessions,
            confirm_destructive: config.execution.confirm_destructive,
        }
    }
}

/// One operator message with its upstream classification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub user_input: String,
    pub intent: String,
    /// Overrides the estimated frustration for this turn.
    pub frustration: Option<f64>,
    pub system_health: Option<SystemHealth>,
    /// Resource the operator selected before sending this message.
    pub resource_id: Option<String>,
    pub confirmed: bool,
    pub correlation_id: Option<String>,
}

impl TurnRequest {
    pub fn new(
        conversation_id: impl Into<String>,
        user_input: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_input: user_input.into(),
            intent: intent.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Read-only intent; nothing to execute.
    NotRequired,
    Executed { action: ActionKind, executor: &'static str, output: Value },
    Blocked {
        action: ActionKind,
        reason_code: &'static str,
        user_message: String,
        fallback_path: &'static str,
    },
    Deferred {
        action: ActionKind,
        reason_code: &'static str,
        user_message: String,
        fallback_path: &'static str,
    },
    Unavailable { action: ActionKind },
    Failed { action: ActionKind, executor: &'static str, error: String },
}

impl DispatchOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReport {
    pub conversation_id: String,
    pub correlation_id: String,
    pub turn: TurnResult,
    pub frustration_level: f64,
    pub focus: FocusContext,
    pub dispatch: DispatchOutcome,
}

impl TurnReport {
    pub fn halted(&self) -> bool {
        self.turn.is_halted()
    }

    pub fn persona(&self) -> Option<PersonaTag> {
        self.turn.persona()
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<CognitiveGate>>;

/// Owns one gate per conversation. Turns of the same conversation are serialized
/// on that conversation's lock, held until dispatch completes; different
/// conversations never contend.
pub struct AgentRuntime {
    settings: RuntimeSettings,
    guardrails: GuardrailPolicy,
    estimator: Option<FrustrationEstimator>,
    executors: ExecutorRegistry,
    dry_run_executor: Option<DryRunExecutor>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    audit: Arc<dyn AuditSink>,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(RuntimeSettings::default())
    }
}

impl AgentRuntime {
    pub fn new(settings: RuntimeSettings) -> Self {
        let guardrails = GuardrailPolicy { confirm_destructive: settings.confirm_destructive };
        let estimator = settings
            .frustration_enabled
            .then(|| FrustrationEstimator::new(settings.frustration_smoothing));

        let mut executors = ExecutorRegistry::default();
        let dry_run_executor = settings.dry_run.then(DryRunExecutor::default);
        if let Some(dry_run) = &dry_run_executor {
            for kind in [ActionKind::Deploy, ActionKind::Destroy, ActionKind::Reconfigure] {
                executors.register(kind, dry_run.clone());
            }
        }

        Self {
            settings,
            guardrails,
            estimator,
            executors,
            dry_run_executor,
            sessions: Mutex::new(HashMap::new()),
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(RuntimeSettings::from_config(config))
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn register_executor<T>(&mut self, kind: ActionKind, executor: T)
    where
        T: ActionExecutor + 'static,
    {
        self.executors.register(kind, executor);
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn dry_run_log(&self) -> Vec<ActionRequest> {
        self.dry_run_executor.as_ref().map(DryRunExecutor::executed).unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Drops the conversation's gate. Returns whether it existed.
    pub fn end_conversation(&self, conversation_id: &str) -> bool {
        self.lock_sessions().remove(conversation_id).is_some()
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnReport, ApplicationError> {
        let mut input = TurnInput::new(request.user_input.clone(), request.intent.clone());
        if let Some(frustration) = request.frustration {
            input = input.with_frustration(frustration);
        }
        input.validate()?;

        let correlation_id =
            request.correlation_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let audit = AuditContext::new(
            Some(request.conversation_id.clone()),
            correlation_id.clone(),
            "agent-runtime",
        );

        let session = self.session(&request.conversation_id)?;
        let mut gate = session.lock().await;

        if let Some(health) = request.system_health {
            gate.set_system_health(health);
        }
        let frustration = match (request.frustration, &self.estimator) {
            (Some(frustration), _) => frustration,
            (None, Some(estimator)) => {
                estimator.update(gate.frustration_level(), &request.user_input)
            }
            (None, None) => gate.frustration_level(),
        };
        gate.set_frustration_level(frustration);

        let mut turn = gate.process_turn_with_audit(
            &request.user_input,
            &request.intent,
            self.audit.as_ref(),
            &audit,
        );
        // A resource selected with this message belongs to the post-shift focus.
        if let Some(resource_id) = &request.resource_id {
            gate.focus_resource(resource_id.clone());
            if let TurnResult::Proceed { focus_context, .. } = &mut turn {
                *focus_context = gate.focus().clone();
            }
        }
        let focus = gate.focus().clone();
        let dispatch = self.dispatch(&request, &turn, &focus, &audit).await;
        drop(gate);

        Ok(TurnReport {
            conversation_id: request.conversation_id,
            correlation_id,
            turn,
            frustration_level: frustration,
            focus,
            dispatch,
        })
    }

    async fn dispatch(
        &self,
        request: &TurnRequest,
        turn: &TurnResult,
        focus: &FocusContext,
        audit: &AuditContext,
    ) -> DispatchOutcome {
        let Some(kind) = ActionKind::from_intent(&request.intent) else {
            let outcome = DispatchOutcome::NotRequired;
            self.audit.emit(dispatch_event(audit, None, &outcome));
            return outcome;
        };

        let action = ActionRequest {
            conversation_id: request.conversation_id.clone(),
            kind,
            intent: request.intent.clone(),
            resource_id: focus.active_resource_id.clone(),
            confirmed: request.confirmed,
        };

        let outcome = match self.guardrails.evaluate(turn, &action) {
            GuardrailDecision::Deny { reason_code, user_message, fallback_path } => {
                warn!(
                    event_name = "agent.dispatch.blocked",
                    conversation_id = %action.conversation_id,
                    action = kind.action_key(),
                    reason_code,
                    "dispatch blocked by guardrail"
                );
                DispatchOutcome::Blocked { action: kind, reason_code, user_message, fallback_path }
            }
            GuardrailDecision::Degrade { reason_code, user_message, fallback_path } => {
                info!(
                    event_name = "agent.dispatch.deferred",
                    conversation_id = %action.conversation_id,
                    action = kind.action_key(),
                    reason_code,
                    "dispatch deferred pending confirmation"
                );
                DispatchOutcome::Deferred { action: kind, reason_code, user_message, fallback_path }
            }
            GuardrailDecision::Allow => match self.executors.get(kind) {
                None => {
                    warn!(
                        event_name = "agent.dispatch.unavailable",
                        action = kind.action_key(),
                        "no executor registered for action"
                    );
                    DispatchOutcome::Unavailable { action: kind }
                }
                Some(executor) => match executor.execute(&action).await {
                    Ok(output) => {
                        info!(
                            event_name = "agent.dispatch.executed",
                            conversation_id = %action.conversation_id,
                            action = kind.action_key(),
                            executor = executor.name(),
                            "action dispatched"
                        );
                        DispatchOutcome::Executed {
                            action: kind,
                            executor: executor.name(),
                            output,
                        }
                    }
                    Err(error) => {
                        warn!(
                            event_name = "agent.dispatch.failed",
                            action = kind.action_key(),
                            executor = executor.name(),
                            error = %error,
                            "executor failed"
                        );
                        DispatchOutcome::Failed {
                            action: kind,
                            executor: executor.name(),
                            error: error.to_string(),
                        }
                    }
                },
            },
        };

        self.audit.emit(dispatch_event(audit, Some(kind), &outcome));
        outcome
    }

    fn session(&self, conversation_id: &str) -> Result<SessionHandle, ApplicationError> {
        let mut sessions = self.lock_sessions();
        if let Some(session) = sessions.get(conversation_id) {
            return Ok(Arc::clone(session));
        }
        if sessions.len() >= self.settings.max_sessions {
            return Err(ApplicationError::Capacity(format!(
                "cannot open conversation `{conversation_id}`: {} sessions already active",
                sessions.len()
            )));
        }

        let gate = CognitiveGate::new().with_system_health(self.settings.initial_system_health);
        let session = Arc::new(tokio::sync::Mutex::new(gate));
        sessions.insert(conversation_id.to_string(), Arc::clone(&session));
        Ok(session)
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionHandle>> {
        match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn dispatch_event(
    audit: &AuditContext,
    kind: Option<ActionKind>,
    outcome: &DispatchOutcome,
) -> AuditEvent {
    let (event_type, audit_outcome) = match outcome {
        DispatchOutcome::NotRequired => ("dispatch.not_required", AuditOutcome::Success),
        DispatchOutcome::Executed { .. } => ("dispatch.executed", AuditOutcome::Success),
        DispatchOutcome::Blocked { .. } => ("dispatch.blocked", AuditOutcome::Rejected),
        DispatchOutcome::Deferred { .. } => ("dispatch.deferred", AuditOutcome::Rejected),
        DispatchOutcome::Unavailable { .. } => ("dispatch.unavailable", AuditOutcome::Failed),
        DispatchOutcome::Failed { .. } => ("dispatch.failed", AuditOutcome::Failed),
    };
    AuditEvent::from_context(audit, event_type, AuditCategory::Dispatch, audit_outcome)
        .with_metadata("action", kind.map_or("none", |kind| kind.action_key()))
}
