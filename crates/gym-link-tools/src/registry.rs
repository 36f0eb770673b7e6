//! Aggregating tools from several servers behind one lookup surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gym_link_client::{Options, ServerClient, ToolTransport};
use gym_link_core::{GymLinkError, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::factory::{Tool, ToolFactory};

/// Registry of named servers and the tools they expose.
///
/// Servers keep their registration order. When two servers expose a
/// tool with the same name, lookups resolve to the server registered
/// first, so resolution is deterministic for a given registration
/// sequence.
#[derive(Default)]
pub struct MultiServerRegistry {
    servers: Vec<(String, ToolFactory)>,
    /// Tools per server, in registration order. Invalidated whenever
    /// membership changes.
    cache: Option<Vec<(String, Vec<Tool>)>>,
}

impl MultiServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server by URL, creating an HTTP transport for it.
    pub fn add_server(&mut self, name: &str, url: &str) -> Result<()> {
        self.add_server_with_token(name, url, None)
    }

    /// Register a server by URL with a bearer token.
    pub fn add_server_with_token(
        &mut self,
        name: &str,
        url: &str,
        auth_token: Option<String>,
    ) -> Result<()> {
        let client = ServerClient::with_options(
            url,
            Some(name.to_string()),
            auth_token,
            Duration::from_secs(30),
        )?;
        self.add_transport(name, Arc::new(client))
    }

    /// Register a server backed by an arbitrary transport.
    pub fn add_transport(&mut self, name: &str, transport: Arc<dyn ToolTransport>) -> Result<()> {
        if self.servers.iter().any(|(n, _)| n == name) {
            return Err(GymLinkError::DuplicateServer(name.to_string()));
        }
        info!(server = name, url = transport.server_url(), "registering server");
        self.servers.push((name.to_string(), ToolFactory::new(transport)));
        self.cache = None;
        Ok(())
    }

    /// Remove a server and release its connection. Unknown names are
    /// [`GymLinkError::ServerNotFound`].
    pub fn remove_server(&mut self, name: &str) -> Result<()> {
        let idx = self
            .servers
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| GymLinkError::ServerNotFound(name.to_string()))?;
        let (_, factory) = self.servers.remove(idx);
        factory.transport().close();
        self.cache = None;
        Ok(())
    }

    /// Registered server names, in registration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Every tool from every server, in registration order.
    ///
    /// Discovery runs once per server and is cached until membership
    /// changes. A server whose discovery fails outright fails the
    /// whole call.
    pub async fn all_tools(&mut self) -> Result<Vec<Tool>> {
        let grouped = self.grouped_tools().await?;
        Ok(grouped.iter().flat_map(|(_, tools)| tools.clone()).collect())
    }

    /// Tools from one named server.
    pub async fn server_tools(&mut self, name: &str) -> Result<Vec<Tool>> {
        if !self.contains(name) {
            return Err(GymLinkError::ServerNotFound(name.to_string()));
        }
        let grouped = self.grouped_tools().await?;
        Ok(grouped
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tools)| tools.clone())
            .unwrap_or_default())
    }

    /// The server that resolves a tool name, or `None` when no server
    /// offers it. First registered wins on collisions.
    pub async fn server_for_tool(&mut self, tool_name: &str) -> Result<Option<&str>> {
        self.grouped_tools().await?;
        // Re-borrow from the freshly populated cache.
        Ok(self
            .cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|(_, tools)| tools.iter().any(|t| t.name() == tool_name))
            .map(|(name, _)| name.as_str()))
    }

    /// Invoke a tool on a specific server.
    pub async fn call_tool_on_server(
        &mut self,
        server: &str,
        tool_name: &str,
        args: Options,
    ) -> Result<Value> {
        let tools = self.server_tools(server).await?;
        let tool = tools
            .iter()
            .find(|t| t.name() == tool_name)
            .ok_or_else(|| GymLinkError::ServerNotFound(format!("{server} has no tool {tool_name}")))?;
        tool.invoke(args).await
    }

    /// Probe every server's health. Always hits the network rather
    /// than trusting per-transport caches.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let mut out = HashMap::with_capacity(self.servers.len());
        for (name, factory) in &self.servers {
            let healthy = factory.transport().health_check(true).await;
            if !healthy {
                warn!(server = name, "server failed health check");
            }
            out.insert(name.clone(), healthy);
        }
        out
    }

    /// Names of servers that currently pass a health check.
    pub async fn healthy_servers(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, factory) in &self.servers {
            if factory.transport().health_check(false).await {
                out.push(name.clone());
            }
        }
        out
    }

    /// Names of servers that currently fail a health check.
    pub async fn unhealthy_servers(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, factory) in &self.servers {
            if !factory.transport().health_check(false).await {
                out.push(name.clone());
            }
        }
        out
    }

    /// Close every registered server and empty the registry.
    pub fn close_all(&mut self) {
        for (name, factory) in &self.servers {
            debug!(server = name, "closing server connection");
            factory.transport().close();
        }
        self.servers.clear();
        self.cache = None;
    }

    async fn grouped_tools(&mut self) -> Result<&[(String, Vec<Tool>)]> {
        if self.cache.is_none() {
            let mut grouped = Vec::with_capacity(self.servers.len());
            for (name, factory) in &mut self.servers {
                let tools = factory.create_tools(None).await?;
                debug!(server = %name, count = tools.len(), "discovered server tools");
                grouped.push((name.clone(), tools));
            }
            self.cache = Some(grouped);
        }
        Ok(self.cache.as_deref().unwrap_or_default())
    }
}

impl std::fmt::Debug for MultiServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiServerRegistry")
            .field("servers", &self.server_names())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
