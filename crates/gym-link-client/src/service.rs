//! HTTP server client with health checks and endpoint fallback
//!
//! [`ServerClient`] is the single network-facing object in the workspace.
//! Every remote operation goes through [`ServerClient::call_tool`], which
//! speaks the MCP-shaped endpoint first and falls back to the REST-shaped
//! endpoint once, best-effort.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use gym_link_core::{EnvInfo, GymLinkError, Result, ServerInfo};

use crate::native::Options;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum interval between non-forced health checks
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Per-request timeout for health probes
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Generic call surface of one remote server
///
/// Discovery and the tool factory depend on this trait rather than on
/// [`ServerClient`] directly, so tests can substitute canned transports.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Base endpoint URL
    fn server_url(&self) -> &str;

    /// Invoke a named tool and return the raw response body.
    ///
    /// Transport-level failures are [`GymLinkError::RemoteCallFailed`]; an
    /// application-level `success: false` body is returned as-is for the
    /// caller to interpret.
    async fn call_tool(&self, name: &str, params: Options) -> Result<serde_json::Value>;

    /// Fetch the raw records from the tool-list endpoint.
    async fn list_tools(&self) -> Result<Vec<serde_json::Value>>;

    /// Fetch and parse the environment info report.
    async fn env_info(&self) -> Result<EnvInfo>;

    /// Whether the server currently looks healthy.
    async fn health_check(&self, force: bool) -> bool;

    /// Release the held connection resource. Idempotent.
    fn close(&self);
}

/// HTTP client for one remote gym server
pub struct ServerClient {
    server_url: String,
    http: reqwest::Client,
    auth_token: Option<String>,
    health_check_interval: Duration,
    info: Mutex<ServerInfo>,
    closed: AtomicBool,
}

impl ServerClient {
    /// Create a client for the given base URL. Trailing path separators
    /// are stripped.
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_options(server_url, None, None, DEFAULT_HEALTH_CHECK_INTERVAL)
    }

    /// Create a client with a display name, optional bearer token, and a
    /// custom health-check interval.
    pub fn with_options(
        server_url: &str,
        name: Option<String>,
        auth_token: Option<String>,
        health_check_interval: Duration,
    ) -> Result<Self> {
        let server_url = server_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GymLinkError::InvalidConfiguration(format!("http client: {}", e)))?;
        let info = ServerInfo::new(server_url.clone(), name);
        Ok(Self {
            server_url,
            http,
            auth_token,
            health_check_interval,
            info: Mutex::new(info),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of the cached server metadata.
    pub fn server_info(&self) -> ServerInfo {
        self.info.lock().expect("server info lock").clone()
    }

    /// Whether the server can be used right now, answered from the
    /// health cache when it is still fresh.
    pub async fn is_available(&self) -> bool {
        self.health_check(false).await
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(GymLinkError::RemoteCallFailed(format!(
                "client for {} is closed",
                self.server_url
            )));
        }
        Ok(())
    }

    async fn send_json(&self, builder: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| GymLinkError::RemoteCallFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GymLinkError::RemoteCallFailed(format!(
                "HTTP {} from {}",
                status,
                response.url()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| GymLinkError::RemoteCallFailed(format!("bad response body: {}", e)))
    }

    async fn call_mcp_tool(&self, name: &str, params: &Options) -> Result<serde_json::Value> {
        let url = format!("{}/mcp/v1/tools/{}/call", self.server_url, name);
        debug!(tool = name, url = %url, "calling tool");
        let payload = serde_json::json!({ "params": params });
        self.send_json(self.request(Method::POST, &url).json(&payload))
            .await
    }

    async fn call_rest_tool(&self, name: &str, params: &Options) -> Result<serde_json::Value> {
        // Fixed REST endpoint shape for the well-known operation set
        let endpoint = match name {
            "get_env_info" => "/info",
            "reset_env" => "/reset",
            "step_env" => "/step",
            "render_env" => "/render",
            "close_env" => "/close",
            other => {
                return Err(GymLinkError::RemoteCallFailed(format!(
                    "no REST endpoint for tool '{}'",
                    other
                )));
            }
        };
        let url = format!("{}{}", self.server_url, endpoint);
        debug!(tool = name, url = %url, "calling tool via REST fallback");
        let builder = if name == "get_env_info" {
            self.request(Method::GET, &url)
        } else {
            self.request(Method::POST, &url).json(params)
        };
        self.send_json(builder).await
    }
}

#[async_trait]
impl ToolTransport for ServerClient {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn call_tool(&self, name: &str, params: Options) -> Result<serde_json::Value> {
        self.ensure_open()?;
        match self.call_mcp_tool(name, &params).await {
            Ok(body) => Ok(body),
            // One best-effort fallback, no retries beyond it
            Err(GymLinkError::RemoteCallFailed(reason)) => {
                warn!(tool = name, %reason, "MCP endpoint failed, trying REST fallback");
                self.call_rest_tool(name, &params)
                    .await
                    .map_err(|_| GymLinkError::RemoteCallFailed(reason))
            }
            Err(other) => Err(other),
        }
    }

    async fn list_tools(&self) -> Result<Vec<serde_json::Value>> {
        self.ensure_open()?;
        let url = format!("{}/mcp/v1/tools/list", self.server_url);
        let body = self.send_json(self.request(Method::GET, &url)).await?;
        let tools = body
            .get("tools")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .ok_or_else(|| {
                GymLinkError::RemoteCallFailed(format!("malformed tool list from {}", url))
            })?;

        let names: Vec<String> = tools
            .iter()
            .filter_map(|t| t.get("name").and_then(serde_json::Value::as_str))
            .map(str::to_string)
            .collect();
        self.info.lock().expect("server info lock").tools_available = Some(names);
        Ok(tools)
    }

    async fn env_info(&self) -> Result<EnvInfo> {
        let body = self.call_tool("get_env_info", Options::new()).await?;
        if !body
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            let message = body
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error");
            return Err(GymLinkError::ApplicationFailure(format!(
                "get_env_info: {}",
                message
            )));
        }
        let info: EnvInfo = serde_json::from_value(body.clone())?;

        {
            let mut cached = self.info.lock().expect("server info lock");
            cached.version = body
                .get("version")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            cached.is_healthy = true;
            cached.last_health_check = Some(Instant::now());
        }
        Ok(info)
    }

    async fn health_check(&self, force: bool) -> bool {
        if self.is_closed() {
            return false;
        }
        {
            let cached = self.info.lock().expect("server info lock");
            if !force {
                if let Some(last) = cached.last_health_check {
                    if last.elapsed() < self.health_check_interval {
                        return cached.is_healthy;
                    }
                }
            }
        }

        let health_url = format!("{}/health", self.server_url);
        let probe = self
            .send_json(
                self.request(Method::GET, &health_url)
                    .timeout(HEALTH_PROBE_TIMEOUT),
            )
            .await;
        let is_healthy = match probe {
            Ok(body) => {
                body.get("status").and_then(serde_json::Value::as_str) == Some("healthy")
            }
            Err(_) => {
                // Older servers have no /health endpoint
                let info_url = format!("{}/info", self.server_url);
                match self
                    .send_json(
                        self.request(Method::GET, &info_url)
                            .timeout(HEALTH_PROBE_TIMEOUT),
                    )
                    .await
                {
                    Ok(body) => body
                        .get("success")
                        .and_then(serde_json::Value::as_bool)
                        .unwrap_or(false),
                    Err(_) => false,
                }
            }
        };

        let mut cached = self.info.lock().expect("server info lock");
        cached.is_healthy = is_healthy;
        cached.last_health_check = Some(Instant::now());
        is_healthy
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("server_url", &self.server_url)
            .field("closed", &self.is_closed())
            .finish()
    }
}
