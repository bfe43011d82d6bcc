//! Runtime modes and orchestrator states

use serde::{Deserialize, Serialize};

/// Configured runtime policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeMode {
    #[default]
    ClaudeOnly,
    DualReadClaudeAuthoritative,
    PiAuthoritative,
    PiDefault,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeOnly => "claude-only",
            Self::DualReadClaudeAuthoritative => "dual-read-claude-authoritative",
            Self::PiAuthoritative => "pi-authoritative",
            Self::PiDefault => "pi-default",
        }
    }

    /// Active state this mode settles into when no swap is in flight
    pub fn default_state(&self) -> RuntimeState {
        match self {
            Self::ClaudeOnly | Self::DualReadClaudeAuthoritative => RuntimeState::ActiveClaude,
            Self::PiAuthoritative | Self::PiDefault => RuntimeState::ActivePi,
        }
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "claude-only" => Ok(Self::ClaudeOnly),
            "dual-read-claude-authoritative" => Ok(Self::DualReadClaudeAuthoritative),
            "pi-authoritative" => Ok(Self::PiAuthoritative),
            "pi-default" => Ok(Self::PiDefault),
            other => anyhow::bail!("Unknown runtime mode '{}'", other),
        }
    }
}

/// Which runtime is authoritative right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeState {
    Idle,
    ActiveClaude,
    ActivePi,
    Swapping,
    FailedRollback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_round_trip_through_their_names() {
        for mode in [
            RuntimeMode::ClaudeOnly,
            RuntimeMode::DualReadClaudeAuthoritative,
            RuntimeMode::PiAuthoritative,
            RuntimeMode::PiDefault,
        ] {
            assert_eq!(mode.as_str().parse::<RuntimeMode>().unwrap(), mode);
        }
        assert!("pi-only".parse::<RuntimeMode>().is_err());
    }

    #[test]
    fn mode_names_match_serde() {
        let json = serde_json::to_string(&RuntimeMode::DualReadClaudeAuthoritative).unwrap();
        assert_eq!(json, "\"dual-read-claude-authoritative\"");
    }

    #[test]
    fn default_states() {
        assert_eq!(RuntimeMode::ClaudeOnly.default_state(), RuntimeState::ActiveClaude);
        assert_eq!(
            RuntimeMode::DualReadClaudeAuthoritative.default_state(),
            RuntimeState::ActiveClaude
        );
        assert_eq!(RuntimeMode::PiAuthoritative.default_state(), RuntimeState::ActivePi);
        assert_eq!(RuntimeMode::PiDefault.default_state(), RuntimeState::ActivePi);
    }
}
