use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemHealth {
    #[default]
    Optimal,
    Degraded,
    Critical,
}

impl SystemHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL",
            Self::Degraded => "DEGRADED",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemHealth {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimal" => Ok(Self::Optimal),
            "degraded" => Ok(Self::Degraded),
            "critical" => Ok(Self::Critical),
            other => Err(DomainError::UnknownSystemHealth(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonaTag {
    Architect,
    Operator,
    Medic,
    Default,
}

impl PersonaTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "ARCHITECT",
            Self::Operator => "OPERATOR",
            Self::Medic => "MEDIC",
            Self::Default => "DEFAULT",
        }
    }
}

impl fmt::Display for PersonaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PERSONA_PREFIXES: &[(&[&str], PersonaTag)] = &[
    (&["generate_", "suggest_"], PersonaTag::Architect),
    (&["deploy_", "rollback_"], PersonaTag::Operator),
    (&["troubleshoot_", "diagnose_"], PersonaTag::Medic),
];

/// Degraded health hands the conversation to the medic whatever was asked.
pub fn select_persona(intent_type: &str, system_health: SystemHealth) -> PersonaTag {
    if system_health != SystemHealth::Optimal {
        return PersonaTag::Medic;
    }

    PERSONA_PREFIXES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|prefix| intent_type.starts_with(prefix)))
        .map(|(_, persona)| *persona)
        .unwrap_or(PersonaTag::Default)
}

#[cfg(test)]
mod tests {
    use super::{select_persona, PersonaTag, SystemHealth};
    use crate::errors::DomainError;

    #[test]
    fn intent_prefixes_map_to_personas() {
        let cases = [
            ("generate_report", PersonaTag::Architect),
            ("suggest_architecture", PersonaTag::Architect),
            ("deploy_vm", PersonaTag::Operator),
            ("rollback_deployment", PersonaTag::Operator),
            ("troubleshoot_network", PersonaTag::Medic),
            ("diagnose_latency", PersonaTag::Medic),
            ("get_status", PersonaTag::Default),
            ("redeploy_vm", PersonaTag::Default),
        ];
        for (intent, expected) in cases {
            assert_eq!(select_persona(intent, SystemHealth::Optimal), expected, "{intent}");
        }
    }

    #[test]
    fn unhealthy_system_always_selects_medic() {
        assert_eq!(select_persona("deploy_vm", SystemHealth::Optimal), PersonaTag::Operator);
        assert_eq!(select_persona("deploy_vm", SystemHealth::Degraded), PersonaTag::Medic);
        assert_eq!(select_persona("generate_report", SystemHealth::Critical), PersonaTag::Medic);
        assert_eq!(select_persona("get_status", SystemHealth::Degraded), PersonaTag::Medic);
    }

    #[test]
    fn health_parses_case_insensitively() {
        assert_eq!("Degraded".parse::<SystemHealth>(), Ok(SystemHealth::Degraded));
        assert_eq!(
            "sick".parse::<SystemHealth>(),
            Err(DomainError::UnknownSystemHealth("sick".to_string()))
        );
    }
}
