use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use alma_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use toml::Value;

use crate::commands::{config_failure, CommandResult};

const COMMAND: &str = "config";

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    overridden: fn(&ConfigOverrides) -> bool,
    render: fn(&AppConfig) -> String,
}

const FIELDS: &[Field] = &[
    Field {
        key_path: "gate.initial_system_health",
        env_keys: &["ALMA_GATE_INITIAL_SYSTEM_HEALTH"],
        overridden: |overrides| overrides.initial_system_health.is_some(),
        render: |config| config.gate.initial_system_health.to_string(),
    },
    Field {
        key_path: "frustration.enabled",
        env_keys: &["ALMA_FRUSTRATION_ENABLED"],
        overridden: |overrides| overrides.frustration_enabled.is_some(),
        render: |config| config.frustration.enabled.to_string(),
    },
    Field {
        key_path: "frustration.smoothing",
        env_keys: &["ALMA_FRUSTRATION_SMOOTHING"],
        overridden: |_| false,
        render: |config| config.frustration.smoothing.to_string(),
    },
    Field {
        key_path: "execution.dry_run",
        env_keys: &["ALMA_EXECUTION_DRY_RUN"],
        overridden: |overrides| overrides.dry_run.is_some(),
        render: |config| config.execution.dry_run.to_string(),
    },
    Field {
        key_path: "execution.max_sessions",
        env_keys: &["ALMA_EXECUTION_MAX_SESSIONS"],
        overridden: |_| false,
        render: |config| config.execution.max_sessions.to_string(),
    },
    Field {
        key_path: "execution.confirm_destructive",
        env_keys: &["ALMA_EXECUTION_CONFIRM_DESTRUCTIVE"],
        overridden: |_| false,
        render: |config| config.execution.confirm_destructive.to_string(),
    },
    Field {
        key_path: "logging.level",
        env_keys: &["ALMA_LOGGING_LEVEL", "ALMA_LOG_LEVEL"],
        overridden: |overrides| overrides.log_level.is_some(),
        render: |config| config.logging.level.clone(),
    },
    Field {
        key_path: "logging.format",
        env_keys: &["ALMA_LOGGING_FORMAT", "ALMA_LOG_FORMAT"],
        overridden: |overrides| overrides.log_format.is_some(),
        render: |config| format!("{:?}", config.logging.format).to_ascii_lowercase(),
    },
];

pub fn run(options: LoadOptions) -> CommandResult {
    let overrides = options.overrides.clone();
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for field in FIELDS {
        let source = if (field.overridden)(&overrides) {
            "override (cli)".to_string()
        } else {
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key_path, &(field.render)(&config), source));
    }

    CommandResult::success(COMMAND, lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["alma.toml", "config/alma.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
