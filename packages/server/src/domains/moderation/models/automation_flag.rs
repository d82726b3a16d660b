use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::entity::Actor;
use crate::domains::moderation::errors::ModerationError;

/// Global automation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationMode {
    Auto,
    #[default]
    Manual,
}

impl AutomationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationMode::Auto => "auto",
            AutomationMode::Manual => "manual",
        }
    }
}

impl fmt::Display for AutomationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationMode {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AutomationMode::Auto),
            "manual" => Ok(AutomationMode::Manual),
            _ => Err(ModerationError::InvalidMode(s.to_string())),
        }
    }
}

/// The process-wide automation switch.
///
/// `version` increases by one on every confirmed change and is the
/// compare-and-swap key for concurrent admin sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationFlag {
    pub mode: AutomationMode,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Actor,
}

impl AutomationFlag {
    /// The flag as created on first boot.
    pub fn initial() -> Self {
        Self {
            mode: AutomationMode::Manual,
            version: 0,
            updated_at: Utc::now(),
            updated_by: Actor::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_flag_is_manual() {
        let flag = AutomationFlag::initial();
        assert_eq!(flag.mode, AutomationMode::Manual);
        assert_eq!(flag.version, 0);
        assert!(flag.updated_by.is_system());
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!("AUTO".parse::<AutomationMode>().unwrap(), AutomationMode::Auto);
        assert_eq!(" manual ".parse::<AutomationMode>().unwrap(), AutomationMode::Manual);
    }

    #[test]
    fn test_mode_parse_rejects_garbage() {
        assert!(matches!(
            "sometimes".parse::<AutomationMode>(),
            Err(ModerationError::InvalidMode(value)) if value == "sometimes"
        ));
    }
}
