//! Environment and server metadata records

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Environment metadata as reported by `get_env_info`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvInfo {
    /// Observation space description (JSON wire form)
    #[serde(default)]
    pub observation_space: serde_json::Value,
    /// Action space description (JSON wire form)
    #[serde(default)]
    pub action_space: serde_json::Value,
    /// (min, max) reward bounds; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_range: Option<(f64, f64)>,
    /// Free-form environment metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Render modes the environment supports
    #[serde(default)]
    pub render_modes: Vec<String>,
}

impl EnvInfo {
    /// Reward bounds, defaulting to unbounded.
    pub fn reward_bounds(&self) -> (f64, f64) {
        self.reward_range
            .unwrap_or((f64::NEG_INFINITY, f64::INFINITY))
    }
}

/// Cached metadata about one remote server
///
/// Mutated only by health checks and info refreshes, never by tool calls.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Base endpoint URL
    pub url: String,
    /// Caller-chosen display name
    pub name: Option<String>,
    /// Version the server reported
    pub version: Option<String>,
    /// Tool names the server reported
    pub tools_available: Option<Vec<String>>,
    /// When the last health check ran
    pub last_health_check: Option<Instant>,
    /// Outcome of the last health check
    pub is_healthy: bool,
}

impl ServerInfo {
    /// Fresh record for an endpoint that has never been checked.
    pub fn new(url: impl Into<String>, name: Option<String>) -> Self {
        Self {
            url: url.into(),
            name,
            version: None,
            tools_available: None,
            last_health_check: None,
            is_healthy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_info_defaults() {
        let info: EnvInfo = serde_json::from_value(json!({
            "success": true,
            "observation_space": {"type": "Discrete", "n": 2},
            "action_space": {"type": "Discrete", "n": 2}
        }))
        .unwrap();
        assert_eq!(info.reward_bounds(), (f64::NEG_INFINITY, f64::INFINITY));
        assert!(info.metadata.is_empty());
    }

    #[test]
    fn test_env_info_reward_range() {
        let info: EnvInfo = serde_json::from_value(json!({
            "reward_range": [-1.0, 1.0]
        }))
        .unwrap();
        assert_eq!(info.reward_bounds(), (-1.0, 1.0));
    }
}
