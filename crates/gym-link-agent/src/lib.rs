//! Generic agent-driven episode loop over Gym-Link tools.
//!
//! Wire an [`AgentFn`] (any prompt-to-response callback, blocking or
//! async) to a set of discovered tools and the [`EpisodeRunner`] takes
//! care of the rest: resetting the environment, scanning agent replies
//! for tool calls, executing them, and folding the outcomes into
//! [`EpisodeResult`](gym_link_core::EpisodeResult) records that
//! [`EpisodeResults`] summarizes.

pub mod agent;
pub mod results;
pub mod runner;

pub use agent::AgentFn;
pub use results::EpisodeResults;
pub use runner::EpisodeRunner;
