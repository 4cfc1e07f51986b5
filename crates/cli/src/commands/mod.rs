pub mod config;
pub mod replay;
pub mod turn;

use alma_core::errors::{ApplicationError, ErrorClass};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_VALIDATION: u8 = 2;
pub const EXIT_HALTED: u8 = 3;
pub const EXIT_UNAVAILABLE: u8 = 4;
pub const EXIT_INTERNAL: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details: None,
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    /// Envelope carrying a structured body, e.g. one or more turn reports.
    pub fn report(
        command: &str,
        status: &str,
        message: impl Into<String>,
        details: Value,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class: None,
            message: message.into(),
            details: Some(details),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let interface = error.into_interface(correlation_id);
        let exit_code = match interface.class {
            ErrorClass::InputValidation => EXIT_VALIDATION,
            ErrorClass::ServiceUnavailable => EXIT_UNAVAILABLE,
            ErrorClass::Internal => EXIT_INTERNAL,
        };
        Self::failure(command, interface.class.as_str(), interface.message, exit_code)
    }
}

pub(crate) fn async_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_INTERNAL,
        )
    })
}

pub(crate) fn config_failure(command: &str, error: impl std::fmt::Display) -> CommandResult {
    CommandResult::failure(
        command,
        "config_validation",
        format!("configuration issue: {error}"),
        EXIT_VALIDATION,
    )
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
