use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cognitive::SystemHealth;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gate: GateConfig,
    pub frustration: FrustrationConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GateConfig {
    pub initial_system_health: SystemHealth,
}

#[derive(Clone, Debug)]
pub struct FrustrationConfig {
    pub enabled: bool,
    /// Weight of the newest message when blending with the previous level.
    pub smoothing: f64,
}

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    pub dry_run: bool,
    pub max_sessions: usize,
    pub confirm_destructive: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub initial_system_health: Option<SystemHealth>,
    pub frustration_enabled: Option<bool>,
    pub dry_run: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid value for `{key}` in config file `{path}`: `{value}`")]
    InvalidFileValue { path: PathBuf, key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig { initial_system_health: SystemHealth::Optimal },
            frustration: FrustrationConfig { enabled: true, smoothing: 0.5 },
            execution: ExecutionConfig {
                dry_run: true,
                max_sessions: 1024,
                confirm_destructive: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(&path, patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("alma.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, path: &Path, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(gate) = patch.gate {
            if let Some(health) = gate.initial_system_health {
                self.gate.initial_system_health =
                    health.parse().map_err(|_| ConfigError::InvalidFileValue {
                        path: path.to_path_buf(),
                        key: "gate.initial_system_health".to_string(),
                        value: health.clone(),
                    })?;
            }
        }

        if let Some(frustration) = patch.frustration {
            if let Some(enabled) = frustration.enabled {
                self.frustration.enabled = enabled;
            }
            if let Some(smoothing) = frustration.smoothing {
                self.frustration.smoothing = smoothing;
            }
        }

        if let Some(execution) = patch.execution {
            if let Some(dry_run) = execution.dry_run {
                self.execution.dry_run = dry_run;
            }
            if let Some(max_sessions) = execution.max_sessions {
                self.execution.max_sessions = max_sessions;
            }
            if let Some(confirm_destructive) = execution.confirm_destructive {
                self.execution.confirm_destructive = confirm_destructive;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ALMA_GATE_INITIAL_SYSTEM_HEALTH") {
            self.gate.initial_system_health =
                parse_health("ALMA_GATE_INITIAL_SYSTEM_HEALTH", &value)?;
        }

        if let Some(value) = read_env("ALMA_FRUSTRATION_ENABLED") {
            self.frustration.enabled = parse_bool("ALMA_FRUSTRATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("ALMA_FRUSTRATION_SMOOTHING") {
            self.frustration.smoothing = parse_f64("ALMA_FRUSTRATION_SMOOTHING", &value)?;
        }

        if let Some(value) = read_env("ALMA_EXECUTION_DRY_RUN") {
            self.execution.dry_run = parse_bool("ALMA_EXECUTION_DRY_RUN", &value)?;
        }
        if let Some(value) = read_env("ALMA_EXECUTION_MAX_SESSIONS") {
            self.execution.max_sessions = parse_usize("ALMA_EXECUTION_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = read_env("ALMA_EXECUTION_CONFIRM_DESTRUCTIVE") {
            self.execution.confirm_destructive =
                parse_bool("ALMA_EXECUTION_CONFIRM_DESTRUCTIVE", &value)?;
        }

        let log_level = read_env("ALMA_LOGGING_LEVEL").or_else(|| read_env("ALMA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("ALMA_LOGGING_FORMAT").or_else(|| read_env("ALMA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(health) = overrides.initial_system_health {
            self.gate.initial_system_health = health;
        }
        if let Some(enabled) = overrides.frustration_enabled {
            self.frustration.enabled = enabled;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.execution.dry_run = dry_run;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_frustration(&self.frustration)?;
        validate_execution(&self.execution)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("alma.toml"), PathBuf::from("config/alma.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_frustration(frustration: &FrustrationConfig) -> Result<(), ConfigError> {
    let smoothing = frustration.smoothing;
    if !smoothing.is_finite() || !(0.0..=1.0).contains(&smoothing) {
        return Err(ConfigError::Validation(
            "frustration.smoothing must be in range 0.0..=1.0".to_string(),
        ));
    }
    Ok(())
}

fn validate_execution(execution: &ExecutionConfig) -> Result<(), ConfigError> {
    if execution.max_sessions == 0 {
        return Err(ConfigError::Validation(
            "execution.max_sessions must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_health(key: &str, value: &str) -> Result<SystemHealth, ConfigError> {
    value.parse::<SystemHealth>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gate: Option<GatePatch>,
    frustration: Option<FrustrationPatch>,
    execution: Option<ExecutionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GatePatch {
    initial_system_health: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FrustrationPatch {
    enabled: Option<bool>,
    smoothing: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutionPatch {
    dry_run: Option<bool>,
    max_sessions: Option<usize>,
    confirm_destructive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::cognitive::SystemHealth;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(
            config.gate.initial_system_health == SystemHealth::Optimal,
            "gate should start with optimal health",
        )?;
        ensure(config.execution.dry_run, "dry run should be the default")?;
        ensure(config.execution.confirm_destructive, "destructive confirmation is on by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ALMA_HEALTH", "degraded");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("alma.toml");
            fs::write(
                &path,
                r#"
[gate]
initial_system_health = "${TEST_ALMA_HEALTH}"

[frustration]
smoothing = 0.25
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.gate.initial_system_health == SystemHealth::Degraded,
                "health should be interpolated from environment",
            )?;
            ensure(config.frustration.smoothing == 0.25, "smoothing should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_ALMA_HEALTH"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ALMA_LOG_LEVEL", "warn");
        env::set_var("ALMA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ALMA_LOG_LEVEL", "ALMA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ALMA_EXECUTION_MAX_SESSIONS", "16");
        env::set_var("ALMA_EXECUTION_DRY_RUN", "false");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("alma.toml");
            fs::write(
                &path,
                r#"
[execution]
max_sessions = 8
dry_run = true

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    dry_run: Some(true),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.execution.max_sessions == 16, "env max sessions should win over file")?;
            ensure(config.execution.dry_run, "override dry run should win over env")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["ALMA_EXECUTION_MAX_SESSIONS", "ALMA_EXECUTION_DRY_RUN"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ALMA_FRUSTRATION_SMOOTHING", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("frustration.smoothing")
            );
            ensure(has_message, "validation failure should mention frustration.smoothing")
        })();

        clear_vars(&["ALMA_FRUSTRATION_SMOOTHING"]);
        result
    }

    #[test]
    fn invalid_env_health_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ALMA_GATE_INITIAL_SYSTEM_HEALTH", "sick");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid health to be rejected".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "ALMA_GATE_INITIAL_SYSTEM_HEALTH"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["ALMA_GATE_INITIAL_SYSTEM_HEALTH"]);
        result
    }

    #[test]
    fn invalid_file_health_names_the_file_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("alma.toml");
        fs::write(&path, "[gate]\ninitial_system_health = \"sick\"\n")
            .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected invalid file health to be rejected".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::InvalidFileValue { ref key, path: ref file, .. }
                if key == "gate.initial_system_health" && *file == path),
            "error should name the file key, not an environment variable",
        )
    }

    #[test]
    fn missing_required_file_is_reported() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist/alma.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(error, Err(ConfigError::MissingConfigFile(_))));
    }
}
