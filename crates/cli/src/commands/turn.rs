use alma_agent::runtime::{AgentRuntime, TurnReport, TurnRequest};
use alma_core::cognitive::SystemHealth;
use alma_core::config::{AppConfig, LoadOptions};
use serde_json::Value;
use uuid::Uuid;

use crate::commands::{async_runtime, config_failure, CommandResult, EXIT_HALTED, EXIT_OK};

const COMMAND: &str = "turn";

#[derive(Clone, Debug, Default)]
pub struct TurnArgs {
    pub text: String,
    pub intent: String,
    pub frustration: Option<f64>,
    pub health: Option<SystemHealth>,
    pub resource: Option<String>,
    pub confirm: bool,
}

pub fn run(options: LoadOptions, args: TurnArgs) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };
    let runtime = match async_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let agent = AgentRuntime::from_config(&config);
    let correlation_id = Uuid::new_v4().to_string();
    let request = TurnRequest {
        conversation_id: format!("cli-{correlation_id}"),
        user_input: args.text,
        intent: args.intent,
        frustration: args.frustration,
        system_health: args.health,
        resource_id: args.resource,
        confirmed: args.confirm,
        correlation_id: Some(correlation_id.clone()),
    };

    match runtime.block_on(agent.handle_turn(request)) {
        Ok(report) => render_report(COMMAND, &report),
        Err(error) => CommandResult::from_application_error(COMMAND, error, &correlation_id),
    }
}

pub(crate) fn summarize(report: &TurnReport) -> String {
    match (report.turn.override_tag(), report.persona()) {
        (Some(tag), _) => format!("turn halted: {tag}"),
        (None, Some(persona)) => format!(
            "turn proceeded as {} at {} risk",
            persona.as_str(),
            report.turn.risk_profile().command_risk_level()
        ),
        (None, None) => "turn proceeded".to_string(),
    }
}

fn render_report(command: &str, report: &TurnReport) -> CommandResult {
    let (status, exit_code) =
        if report.halted() { ("halted", EXIT_HALTED) } else { ("ok", EXIT_OK) };
    let details = serde_json::to_value(report).unwrap_or(Value::Null);
    CommandResult::report(command, status, summarize(report), details, exit_code)
}
