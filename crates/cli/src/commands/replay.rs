use std::fs;
use std::path::Path;

use alma_agent::runtime::{AgentRuntime, TurnRequest};
use alma_core::cognitive::SystemHealth;
use alma_core::config::{AppConfig, LoadOptions};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::commands::turn::summarize;
use crate::commands::{
    async_runtime, config_failure, CommandResult, EXIT_HALTED, EXIT_OK, EXIT_VALIDATION,
};

const COMMAND: &str = "replay";

/// One scripted operator message. Blank lines and `#` comments are skipped.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayLine {
    pub input: String,
    pub intent: String,
    #[serde(default)]
    pub frustration: Option<f64>,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

pub fn parse_script(raw: &str) -> Result<Vec<(usize, ReplayLine)>, String> {
    let mut lines = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed = serde_json::from_str::<ReplayLine>(trimmed)
            .map_err(|error| format!("line {}: {error}", index + 1))?;
        lines.push((index + 1, parsed));
    }
    Ok(lines)
}

pub fn run(options: LoadOptions, script: &Path) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };

    let raw = match fs::read_to_string(script) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "input_read",
                format!("could not read `{}`: {error}", script.display()),
                EXIT_VALIDATION,
            );
        }
    };
    let lines = match parse_script(&raw) {
        Ok(lines) => lines,
        Err(message) => {
            return CommandResult::failure(COMMAND, "input_validation", message, EXIT_VALIDATION);
        }
    };

    let runtime = match async_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let agent = AgentRuntime::from_config(&config);
    let conversation_id = format!("replay-{}", Uuid::new_v4());

    let mut turns = Vec::with_capacity(lines.len());
    let mut halted_turns = 0usize;
    for (line_number, line) in lines {
        let health = match line.health.as_deref().map(str::parse::<SystemHealth>).transpose() {
            Ok(health) => health,
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "input_validation",
                    format!("line {line_number}: {error}"),
                    EXIT_VALIDATION,
                );
            }
        };

        let correlation_id = format!("{conversation_id}-{line_number}");
        let request = TurnRequest {
            conversation_id: conversation_id.clone(),
            user_input: line.input,
            intent: line.intent,
            frustration: line.frustration,
            system_health: health,
            resource_id: line.resource,
            confirmed: line.confirm,
            correlation_id: Some(correlation_id.clone()),
        };

        let report = match runtime.block_on(agent.handle_turn(request)) {
            Ok(report) => report,
            Err(error) => {
                return CommandResult::from_application_error(COMMAND, error, &correlation_id);
            }
        };
        if report.halted() {
            halted_turns += 1;
        }
        turns.push(json!({
            "line": line_number,
            "summary": summarize(&report),
            "report": serde_json::to_value(&report).unwrap_or(Value::Null),
        }));
    }

    let total = turns.len();
    let details = json!({
        "conversation_id": conversation_id,
        "halted_turns": halted_turns,
        "turns": turns,
    });
    let message = format!("replayed {total} turn(s), {halted_turns} halted");
    if halted_turns > 0 {
        CommandResult::report(COMMAND, "halted", message, details, EXIT_HALTED)
    } else {
        CommandResult::report(COMMAND, "ok", message, details, EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_script;

    #[test]
    fn script_skips_blank_and_comment_lines() {
        let raw = r#"
# warm up
{"input": "check the firewall", "intent": "get_rules"}

{"input": "delete it now", "intent": "delete_rule", "frustration": 0.9, "confirm": true}
"#;
        let lines = parse_script(raw).expect("script should parse");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, 3);
        assert_eq!(lines[1].0, 5);
        assert_eq!(lines[1].1.frustration, Some(0.9));
        assert!(lines[1].1.confirm);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let raw = "{\"input\": \"hi\", \"intent\": \"get_status\"}\n{\"input\": \"oops\"}\n";
        let error = parse_script(raw).expect_err("missing intent must fail");
        assert!(error.starts_with("line 2:"), "{error}");
    }
}
