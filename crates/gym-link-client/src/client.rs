//! Unified environment client
//!
//! [`GymClient`] composes the space codec with an environment transport
//! behind one mode-agnostic object. Local mode wraps an in-process
//! [`NativeEnvironment`]; remote mode talks to a gym server over HTTP,
//! decoding observations and encoding actions at the wire boundary.
//!
//! [`NativeEnvironment`]: crate::native::NativeEnvironment

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use gym_link_core::{GymLinkError, Result, Space, SpaceValue};

use crate::native::{NativeEnvironment, Options};
use crate::service::{DEFAULT_HEALTH_CHECK_INTERVAL, ServerClient, ToolTransport};
use crate::transport::{EnvTransport, LocalTransport, RemoteTransport, StepOutcome};

/// Operating mode of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Local,
    Remote,
}

impl Mode {
    /// Parse a mode string, case-insensitively.
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remote" => Ok(Mode::Remote),
            other => Err(GymLinkError::InvalidConfiguration(format!(
                "mode must be 'local' or 'remote', got '{}'",
                other
            ))),
        }
    }
}

/// Construction-time configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Environment identifier (e.g. "CartPole-v1")
    pub env_id: String,
    /// "local" or "remote", case-insensitive
    pub mode: String,
    /// Render mode, if rendering is wanted
    pub render_mode: Option<String>,
    /// Remote server base URL (required iff mode is remote)
    pub server_url: Option<String>,
    /// Bearer token attached to every remote call
    pub auth_token: Option<String>,
    /// Pass-through construction options, forwarded to the local
    /// environment only
    pub options: Options,
}

impl ClientConfig {
    /// Config for a named environment in local mode.
    pub fn new(env_id: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            mode: "local".into(),
            render_mode: None,
            server_url: None,
            auth_token: None,
            options: Options::new(),
        }
    }

    /// Switch to remote mode against the given server.
    pub fn remote(mut self, server_url: impl Into<String>) -> Self {
        self.mode = "remote".into();
        self.server_url = Some(server_url.into());
        self
    }
}

/// Builds the local environment for a config
pub type EnvProvider = Box<dyn FnOnce(&ClientConfig) -> Result<Box<dyn NativeEnvironment>> + Send>;

enum Backend {
    Local(LocalTransport),
    Remote(RemoteTransport),
}

/// Mode-agnostic environment client
pub struct GymClient {
    env_id: String,
    mode: Mode,
    observation_space: Space,
    action_space: Space,
    reward_range: (f64, f64),
    metadata: std::collections::HashMap<String, Value>,
    backend: Backend,
    closed: bool,
}

impl std::fmt::Debug for GymClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GymClient")
            .field("env_id", &self.env_id)
            .field("mode", &self.mode)
            .field("observation_space", &self.observation_space)
            .field("action_space", &self.action_space)
            .field("reward_range", &self.reward_range)
            .field("metadata", &self.metadata)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl GymClient {
    /// Construct a client, dispatching on the configured mode.
    ///
    /// The mode string is validated before any I/O; remote mode
    /// additionally requires a non-empty server URL. On a failed remote
    /// construction the opened connection is released before returning.
    pub async fn connect(config: ClientConfig, provider: Option<EnvProvider>) -> Result<Self> {
        match Mode::parse(&config.mode)? {
            Mode::Local => {
                let provider = provider.ok_or_else(|| {
                    GymLinkError::InvalidConfiguration(
                        "local mode requires an environment provider".into(),
                    )
                })?;
                let env = provider(&config)?;
                Ok(Self::from_native(config.env_id, env))
            }
            Mode::Remote => Self::connect_remote(config).await,
        }
    }

    /// Wrap an already-constructed in-process environment.
    pub fn local(env_id: impl Into<String>, env: Box<dyn NativeEnvironment>) -> Self {
        Self::from_native(env_id.into(), env)
    }

    /// Connect to a remote server, eagerly fetching environment info.
    pub async fn remote(config: ClientConfig) -> Result<Self> {
        if Mode::parse(&config.mode)? != Mode::Remote {
            return Err(GymLinkError::InvalidConfiguration(
                "remote() requires mode 'remote'".into(),
            ));
        }
        Self::connect_remote(config).await
    }

    fn from_native(env_id: String, env: Box<dyn NativeEnvironment>) -> Self {
        let observation_space = env.observation_space().clone();
        let action_space = env.action_space().clone();
        let reward_range = env.reward_range();
        let metadata = env.metadata();
        Self {
            env_id,
            mode: Mode::Local,
            observation_space,
            action_space,
            reward_range,
            metadata,
            backend: Backend::Local(LocalTransport::new(env)),
            closed: false,
        }
    }

    async fn connect_remote(config: ClientConfig) -> Result<Self> {
        let url = config
            .server_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                GymLinkError::InvalidConfiguration("server_url is required for remote mode".into())
            })?;
        let client = ServerClient::with_options(
            url,
            Some(config.env_id.clone()),
            config.auth_token.clone(),
            DEFAULT_HEALTH_CHECK_INTERVAL,
        )?;

        let setup = async {
            let env_info = client.env_info().await?;
            let observation_space = Space::from_value(&env_info.observation_space)?;
            let action_space = Space::from_value(&env_info.action_space)?;
            Ok::<_, GymLinkError>((env_info, observation_space, action_space))
        }
        .await;

        let (env_info, observation_space, action_space) = match setup {
            Ok(parts) => parts,
            Err(e) => {
                // No leaked connections on a failed constructor
                client.close();
                return Err(e);
            }
        };

        info!(env_id = %config.env_id, server = %client.server_url(), "connected to remote environment");
        Ok(Self {
            env_id: config.env_id,
            mode: Mode::Remote,
            observation_space,
            action_space,
            reward_range: env_info.reward_bounds(),
            metadata: env_info.metadata.into_iter().collect(),
            backend: Backend::Remote(RemoteTransport::new(client, config.render_mode)),
            closed: false,
        })
    }

    /// Operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Environment identifier.
    pub fn env_id(&self) -> &str {
        &self.env_id
    }

    /// Observation space.
    pub fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    /// Action space.
    pub fn action_space(&self) -> &Space {
        &self.action_space
    }

    /// (min, max) reward bounds.
    pub fn reward_range(&self) -> (f64, f64) {
        self.reward_range
    }

    /// Free-form environment metadata.
    pub fn metadata(&self) -> &std::collections::HashMap<String, Value> {
        &self.metadata
    }

    fn transport(&mut self) -> &mut dyn EnvTransport {
        match &mut self.backend {
            Backend::Local(t) => t,
            Backend::Remote(t) => t,
        }
    }

    /// Decode a transport observation through the observation space.
    /// Local values are already native and pass through untouched.
    fn decode_observation(&self, observation: SpaceValue) -> Result<SpaceValue> {
        match observation {
            SpaceValue::Raw(wire) if self.mode == Mode::Remote => {
                self.observation_space.decode_value(&wire)
            }
            other => Ok(other),
        }
    }

    /// Reset the environment to start a new episode.
    pub async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<Options>,
    ) -> Result<(SpaceValue, Options)> {
        let (observation, reset_info) = self.transport().reset(seed, options).await?;
        let observation = self.decode_observation(observation)?;
        debug!(env_id = %self.env_id, "environment reset");
        Ok((observation, reset_info))
    }

    /// Take a step in the environment.
    pub async fn step(&mut self, action: SpaceValue) -> Result<StepOutcome> {
        let mut outcome = self.transport().step(action).await?;
        outcome.observation = self.decode_observation(outcome.observation)?;
        Ok(outcome)
    }

    /// Render the environment.
    pub async fn render(&mut self) -> Result<Option<Value>> {
        self.transport().render().await
    }

    /// Close the environment and release its resources. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transport().close().await
    }

    /// Run a closure with this client, guaranteeing `close()` afterwards.
    ///
    /// The scope body's error is never masked by a close failure; a close
    /// failure after a successful body is surfaced.
    pub async fn scoped<T, F>(mut self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut GymClient) -> BoxFuture<'a, Result<T>>,
    {
        let result = f(&mut self).await;
        let close_result = self.close().await;
        match result {
            Ok(value) => close_result.map(|_| value),
            Err(e) => {
                if let Err(close_err) = close_result {
                    warn!(error = %close_err, "close failed after scope error");
                }
                Err(e)
            }
        }
    }
}

impl Drop for GymClient {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best-effort release; the close round-trip needs an async context
        if let Backend::Remote(t) = &self.backend {
            t.release();
            warn!(env_id = %self.env_id, "client dropped without close(), connection released");
        }
    }
}
