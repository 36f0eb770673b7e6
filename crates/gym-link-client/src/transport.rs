//! Environment transport pair
//!
//! Two implementations of one contract: [`LocalTransport`] forwards to an
//! in-process [`NativeEnvironment`]; [`RemoteTransport`] maps each
//! operation to exactly one tool call against a remote server.
//!
//! [`NativeEnvironment`]: crate::native::NativeEnvironment

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use gym_link_core::{GymLinkError, Result, SpaceValue};

use crate::native::{NativeEnvironment, Options};
use crate::service::{ServerClient, ToolTransport};

/// Outcome of a single environment step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the action
    pub observation: SpaceValue,
    /// Scalar reward
    pub reward: f64,
    /// Episode ended (goal reached or failed)
    pub terminated: bool,
    /// Episode cut short (time limit)
    pub truncated: bool,
    /// Diagnostic info
    pub info: Options,
}

/// The four environment operations, mode-agnostic
///
/// Remote implementations return observations as [`SpaceValue::Raw`] wire
/// values; the unified client decodes them through the observation space.
#[async_trait]
pub trait EnvTransport: Send {
    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<Options>,
    ) -> Result<(SpaceValue, Options)>;

    async fn step(&mut self, action: SpaceValue) -> Result<StepOutcome>;

    async fn render(&mut self) -> Result<Option<Value>>;

    /// Close the environment. Must release held resources on every exit
    /// path, success or failure.
    async fn close(&mut self) -> Result<()>;
}

/// Direct delegation to an in-process environment
pub struct LocalTransport {
    env: Box<dyn NativeEnvironment>,
}

impl LocalTransport {
    pub fn new(env: Box<dyn NativeEnvironment>) -> Self {
        Self { env }
    }

    /// The wrapped environment.
    pub fn env(&self) -> &dyn NativeEnvironment {
        self.env.as_ref()
    }
}

#[async_trait]
impl EnvTransport for LocalTransport {
    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<Options>,
    ) -> Result<(SpaceValue, Options)> {
        self.env.reset(seed, options).await
    }

    async fn step(&mut self, action: SpaceValue) -> Result<StepOutcome> {
        self.env.step(action).await
    }

    async fn render(&mut self) -> Result<Option<Value>> {
        self.env.render().await
    }

    async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }
}

/// One HTTP round-trip per operation against a remote server
pub struct RemoteTransport {
    client: ServerClient,
    render_mode: Option<String>,
}

impl RemoteTransport {
    pub fn new(client: ServerClient, render_mode: Option<String>) -> Self {
        Self {
            client,
            render_mode,
        }
    }

    /// The underlying server client.
    pub fn client(&self) -> &ServerClient {
        &self.client
    }

    /// Synchronously release the connection without the close round-trip.
    /// Used on failed construction and from drop paths.
    pub fn release(&self) {
        self.client.close();
    }

    /// Check the `success` field of a response body, mapping a falsy value
    /// to [`GymLinkError::ApplicationFailure`] carrying the reported error.
    fn check_success(operation: &str, body: &Value) -> Result<()> {
        let success = body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if success {
            return Ok(());
        }
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Err(GymLinkError::ApplicationFailure(format!(
            "{} failed: {}",
            operation, message
        )))
    }

    fn info_field(body: &Value) -> Options {
        body.get("info")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EnvTransport for RemoteTransport {
    async fn reset(
        &mut self,
        seed: Option<u64>,
        _options: Option<Options>,
    ) -> Result<(SpaceValue, Options)> {
        let mut params = Options::new();
        if let Some(seed) = seed {
            params.insert("seed".into(), serde_json::json!(seed));
        }
        let body = self.client.call_tool("reset_env", params).await?;
        Self::check_success("reset", &body)?;

        let observation = body.get("observation").cloned().unwrap_or(Value::Null);
        debug!(?observation, "remote reset");
        Ok((SpaceValue::Raw(observation), Self::info_field(&body)))
    }

    async fn step(&mut self, action: SpaceValue) -> Result<StepOutcome> {
        let mut params = Options::new();
        params.insert("action".into(), action.to_wire());
        let body = self.client.call_tool("step_env", params).await?;
        Self::check_success("step", &body)?;

        Ok(StepOutcome {
            observation: SpaceValue::Raw(body.get("observation").cloned().unwrap_or(Value::Null)),
            reward: body.get("reward").and_then(Value::as_f64).unwrap_or(0.0),
            terminated: body
                .get("terminated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            truncated: body
                .get("truncated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            info: Self::info_field(&body),
        })
    }

    async fn render(&mut self) -> Result<Option<Value>> {
        let mut params = Options::new();
        if let Some(mode) = &self.render_mode {
            params.insert("mode".into(), serde_json::json!(mode));
        }
        let body = self.client.call_tool("render_env", params).await?;
        Self::check_success("render", &body)?;

        match body.get("render") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(value.clone())),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.client.call_tool("close_env", Options::new()).await;
        // The connection is released on every exit path, even when the
        // remote call itself failed.
        self.client.close();
        result.map(|_| ())
    }
}
