//! Native environment trait
//!
//! The seam between the client and whatever in-process simulator backs
//! local mode. Implement this trait to expose a simulator to [`GymClient`]
//! without any wire crossing.
//!
//! [`GymClient`]: crate::client::GymClient

use async_trait::async_trait;
use std::collections::HashMap;

use gym_link_core::{Result, Space, SpaceValue};

use crate::transport::StepOutcome;

/// Keyword arguments passed through reset and construction paths
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Trait for in-process environments
#[async_trait]
pub trait NativeEnvironment: Send + Sync + 'static {
    /// Observation space of this environment
    fn observation_space(&self) -> &Space;

    /// Action space of this environment
    fn action_space(&self) -> &Space;

    /// Free-form environment metadata
    fn metadata(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }

    /// (min, max) reward bounds
    fn reward_range(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Start a new episode, returning the initial observation and info
    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<Options>,
    ) -> Result<(SpaceValue, Options)>;

    /// Apply an action and advance the environment
    async fn step(&mut self, action: SpaceValue) -> Result<StepOutcome>;

    /// Render the environment, if a render mode was configured
    async fn render(&mut self) -> Result<Option<serde_json::Value>>;

    /// Release the environment's resources
    async fn close(&mut self) -> Result<()>;
}
