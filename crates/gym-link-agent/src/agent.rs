//! The agent callback the episode loop drives.

use std::sync::Arc;

use futures::future::BoxFuture;
use gym_link_core::{GymLinkError, Result};

/// A policy that maps a prompt to a response.
///
/// Blocking callbacks run on the blocking thread pool so a slow model
/// call never stalls the runtime; suspending callbacks are awaited in
/// place.
#[derive(Clone)]
pub enum AgentFn {
    Blocking(Arc<dyn Fn(String) -> String + Send + Sync>),
    Suspending(Arc<dyn Fn(String) -> BoxFuture<'static, String> + Send + Sync>),
}

impl AgentFn {
    /// Wrap a synchronous callback.
    pub fn blocking(f: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        AgentFn::Blocking(Arc::new(f))
    }

    /// Wrap an async callback.
    pub fn suspending(f: impl Fn(String) -> BoxFuture<'static, String> + Send + Sync + 'static) -> Self {
        AgentFn::Suspending(Arc::new(f))
    }

    /// Produce the agent's response to a prompt.
    pub async fn respond(&self, prompt: String) -> Result<String> {
        match self {
            AgentFn::Blocking(f) => {
                let f = Arc::clone(f);
                tokio::task::spawn_blocking(move || f(prompt))
                    .await
                    .map_err(|err| {
                        GymLinkError::ApplicationFailure(format!("agent callback panicked: {err}"))
                    })
            }
            AgentFn::Suspending(f) => Ok(f(prompt).await),
        }
    }
}

impl std::fmt::Debug for AgentFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentFn::Blocking(_) => f.write_str("AgentFn::Blocking"),
            AgentFn::Suspending(_) => f.write_str("AgentFn::Suspending"),
        }
    }
}
