pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use alma_core::cognitive::SystemHealth;
use alma_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

use crate::commands::turn::TurnArgs;

#[derive(Debug, Parser)]
#[command(
    name = "alma",
    about = "ALMA cognitive gate operator CLI",
    long_about = "Evaluate operator turns through the cognitive safety gate, replay scripted \
                  conversations, and inspect effective configuration.",
    after_help = "Examples:\n  alma turn --intent deploy_vm \"please deploy a new web server\"\n  \
                  alma replay session.jsonl\n  alma config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an alma.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override logging.format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Override gate.initial_system_health for new conversations")]
    initial_health: Option<SystemHealth>,
    #[arg(long, global = true, help = "Disable text-based frustration estimation")]
    no_frustration: bool,
    #[arg(long, global = true, help = "Disable the dry-run executor (execution.dry_run = false)")]
    no_dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Evaluate one turn and print the structured report")]
    Turn {
        #[arg(long, help = "Classified intent, e.g. deploy_vm or destroy_database")]
        intent: String,
        #[arg(
            long,
            help = "Operator frustration in [0, 1]. When omitted it is estimated from the text, \
                    starting from 0.0 with smoothing 0.5 by default, so a single turn tops out \
                    near 0.5 and cannot reach the volatile band without this flag"
        )]
        frustration: Option<f64>,
        #[arg(long, help = "System health (optimal|degraded|critical)")]
        health: Option<SystemHealth>,
        #[arg(long, help = "Resource the operator has selected")]
        resource: Option<String>,
        #[arg(long, help = "Explicitly confirm a destructive action")]
        confirm: bool,
        #[arg(help = "Raw operator message")]
        text: String,
    },
    #[command(about = "Run a JSON-lines script through a single conversation")]
    Replay {
        #[arg(help = "Script with one {\"input\", \"intent\", ...} object per line")]
        script: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                initial_system_health: self.initial_health,
                frustration_enabled: self.no_frustration.then_some(false),
                dry_run: self.no_dry_run.then_some(false),
            },
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON envelope.
pub fn init_logging(config: &AppConfig) {
    use alma_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(
            event_name = "system.logging.already_initialized",
            "tracing subscriber already installed"
        );
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Turn { intent, frustration, health, resource, confirm, text } => {
            commands::turn::run(
                options,
                TurnArgs { text, intent, frustration, health, resource, confirm },
            )
        }
        Command::Replay { script } => commands::replay::run(options, &script),
        Command::Config => commands::config::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use alma_core::cognitive::SystemHealth;
    use alma_core::config::LogFormat;
    use clap::Parser;

    use super::Cli;

    #[test]
    fn global_flags_fill_config_overrides() {
        let cli = Cli::try_parse_from([
            "alma",
            "turn",
            "--intent",
            "deploy_vm",
            "--initial-health",
            "degraded",
            "--no-frustration",
            "--no-dry-run",
            "--log-format",
            "json",
            "ship it",
        ])
        .expect("arguments should parse");

        let overrides = cli.load_options().overrides;
        assert_eq!(overrides.initial_system_health, Some(SystemHealth::Degraded));
        assert_eq!(overrides.frustration_enabled, Some(false));
        assert_eq!(overrides.dry_run, Some(false));
        assert_eq!(overrides.log_format, Some(LogFormat::Json));
        assert_eq!(overrides.log_level, None);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let cli = Cli::try_parse_from(["alma", "config"]).expect("arguments should parse");
        let options = cli.load_options();

        assert!(!options.require_file);
        assert_eq!(options.overrides.initial_system_health, None);
        assert_eq!(options.overrides.frustration_enabled, None);
        assert_eq!(options.overrides.dry_run, None);
    }
}
