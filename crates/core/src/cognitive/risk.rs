use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

/// Frustration strictly above this value marks the operator as volatile.
pub const FRUSTRATION_THRESHOLD_HIGH: f64 = 0.75;
/// Frustration strictly above this value (and not volatile) is neutral.
pub const FRUSTRATION_THRESHOLD_NEUTRAL: f64 = 0.4;

const DESTRUCTIVE_KEYWORDS: &[&str] = &["destroy", "delete"];
const MUTATING_KEYWORDS: &[&str] = &["deploy", "apply", "create"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandRiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl CommandRiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for CommandRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserEmotionalStability {
    Stable,
    Neutral,
    Volatile,
}

impl UserEmotionalStability {
    pub fn from_frustration(frustration: f64) -> Self {
        if frustration > FRUSTRATION_THRESHOLD_HIGH {
            Self::Volatile
        } else if frustration > FRUSTRATION_THRESHOLD_NEUTRAL {
            Self::Neutral
        } else {
            Self::Stable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Neutral => "NEUTRAL",
            Self::Volatile => "VOLATILE",
        }
    }
}

impl fmt::Display for UserEmotionalStability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn risk assessment. Only [`assess_risk`] can build one, which keeps
/// `requires_step_up_auth` tied to the CRITICAL level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RiskProfile {
    command_risk_level: CommandRiskLevel,
    user_emotional_stability: UserEmotionalStability,
    requires_step_up_auth: bool,
}

impl RiskProfile {
    fn new(
        command_risk_level: CommandRiskLevel,
        user_emotional_stability: UserEmotionalStability,
    ) -> Self {
        Self {
            command_risk_level,
            user_emotional_stability,
            requires_step_up_auth: command_risk_level == CommandRiskLevel::Critical,
        }
    }

    pub fn command_risk_level(&self) -> CommandRiskLevel {
        self.command_risk_level
    }

    pub fn user_emotional_stability(&self) -> UserEmotionalStability {
        self.user_emotional_stability
    }

    pub fn requires_step_up_auth(&self) -> bool {
        self.requires_step_up_auth
    }

    pub fn is_critical(&self) -> bool {
        self.command_risk_level == CommandRiskLevel::Critical
    }
}

/// Classifies the intent by keyword. Destructive keywords are checked first, so
/// `undeploy_legacy` is MEDIUM while `delete_deployment` is HIGH.
pub fn classify_command(intent: &str) -> CommandRiskLevel {
    if DESTRUCTIVE_KEYWORDS.iter().any(|keyword| intent.contains(keyword)) {
        CommandRiskLevel::High
    } else if MUTATING_KEYWORDS.iter().any(|keyword| intent.contains(keyword)) {
        CommandRiskLevel::Medium
    } else {
        CommandRiskLevel::Low
    }
}

/// Total over every input: out-of-range frustration is taken as-is.
pub fn assess_risk(intent: &str, frustration: f64) -> RiskProfile {
    let stability = UserEmotionalStability::from_frustration(frustration);
    let level = match (classify_command(intent), stability) {
        (CommandRiskLevel::High, UserEmotionalStability::Volatile) => {
            error!(
                event_name = "cognitive.risk.critical_detected",
                intent,
                frustration,
                "volatile operator requested a destructive action"
            );
            CommandRiskLevel::Critical
        }
        (level, _) => level,
    };

    RiskProfile::new(level, stability)
}
