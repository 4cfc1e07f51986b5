use crate::errors::DomainError;

const MAX_INTENT_LEN: usize = 128;

/// Checks a turn's inputs before they reach the gate. The gate itself accepts
/// anything; this is where callers reject malformed classifier output.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnInput {
    pub user_input: String,
    pub intent: String,
    pub frustration: Option<f64>,
}

impl TurnInput {
    pub fn new(user_input: impl Into<String>, intent: impl Into<String>) -> Self {
        Self { user_input: user_input.into(), intent: intent.into(), frustration: None }
    }

    pub fn with_frustration(mut self, frustration: f64) -> Self {
        self.frustration = Some(frustration);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_intent(&self.intent)?;
        if let Some(frustration) = self.frustration {
            validate_frustration(frustration)?;
        }
        Ok(())
    }
}

pub fn validate_intent(intent: &str) -> Result<(), DomainError> {
    if intent.is_empty() {
        return Err(DomainError::InvalidTurnInput("intent must not be empty".to_string()));
    }
    if intent.len() > MAX_INTENT_LEN {
        return Err(DomainError::InvalidTurnInput(format!(
            "intent must be at most {MAX_INTENT_LEN} characters"
        )));
    }
    let well_formed = intent
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.');
    if !well_formed {
        return Err(DomainError::InvalidTurnInput(format!(
            "intent `{intent}` must contain only ascii letters, digits, `_`, `-` or `.`"
        )));
    }
    Ok(())
}

pub fn validate_frustration(frustration: f64) -> Result<(), DomainError> {
    if !frustration.is_finite() || !(0.0..=1.0).contains(&frustration) {
        return Err(DomainError::InvalidTurnInput(format!(
            "frustration must be a finite value in 0.0..=1.0, got {frustration}"
        )));
    }
    Ok(())
}
