use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid turn input: {0}")]
    InvalidTurnInput(String),
    #[error("unknown system health `{0}` (expected optimal|degraded|critical)")]
    UnknownSystemHealth(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("execution failure: {0}")]
    Execution(String),
    #[error("session capacity exhausted: {0}")]
    Capacity(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Coarse class a caller branches on; the CLI maps it onto exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    InputValidation,
    ServiceUnavailable,
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "input_validation",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::InputValidation => {
                "The turn was rejected. Check the intent and frustration values."
            }
            Self::ServiceUnavailable => "The gate cannot take this turn right now. Retry shortly.",
            Self::Internal => "The gate hit an unexpected internal error.",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{class}: {message} (correlation_id={correlation_id})")]
pub struct InterfaceError {
    pub class: ErrorClass,
    pub message: String,
    pub correlation_id: String,
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        self.class.user_message()
    }
}

impl ApplicationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Domain(_) => ErrorClass::InputValidation,
            Self::Execution(_) | Self::Capacity(_) => ErrorClass::ServiceUnavailable,
            Self::Configuration(_) => ErrorClass::Internal,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let class = self.class();
        let message = match self {
            Self::Domain(error) => error.to_string(),
            Self::Execution(message) | Self::Capacity(message) | Self::Configuration(message) => {
                message
            }
        };
        InterfaceError { class, message, correlation_id: correlation_id.into() }
    }
}
