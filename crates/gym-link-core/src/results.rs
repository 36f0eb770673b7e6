//! Episode outcome record

use serde::{Deserialize, Serialize};

/// Result of running a single episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeResult {
    /// Episode ordinal (1-based)
    pub episode_num: usize,
    /// Accumulated reward over the episode
    pub total_reward: f64,
    /// Decision cycles executed
    pub num_steps: usize,
    /// Whether the episode is considered successful
    pub success: bool,
    /// Final observation, if one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<serde_json::Value>,
    /// Error that cut the episode short, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EpisodeResult {
    /// Success, discounting episodes that ended in an error.
    ///
    /// An error always voids the success flag; the runner never produces
    /// `success == true` together with a non-empty error.
    pub fn is_success(&self) -> bool {
        self.success && self.error.is_none()
    }
}
