//! Canned transports for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gym_link_client::{Options, ToolTransport};
use gym_link_core::{EnvInfo, GymLinkError, Result};
use serde_json::Value;

/// Scriptable [`ToolTransport`] that records every call it receives.
/// Tools without a canned body answer with a transport error.
pub struct MockTransport {
    url: String,
    responses: Mutex<HashMap<String, Value>>,
    listing: Mutex<Option<Vec<Value>>>,
    info: Mutex<Option<EnvInfo>>,
    healthy: bool,
    pub calls: Mutex<Vec<(String, Options)>>,
    pub list_calls: AtomicUsize,
    pub closed: AtomicUsize,
}

impl MockTransport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            responses: Mutex::new(HashMap::new()),
            listing: Mutex::new(None),
            info: Mutex::new(None),
            healthy: true,
            calls: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn respond(self, tool: &str, body: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), body);
        self
    }

    pub fn listing(self, records: Vec<Value>) -> Self {
        *self.listing.lock().unwrap() = Some(records);
        self
    }

    pub fn info(self, info: EnvInfo) -> Self {
        *self.info.lock().unwrap() = Some(info);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, Options)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    fn server_url(&self) -> &str {
        &self.url
    }

    async fn call_tool(&self, name: &str, params: Options) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), params));
        match self.responses.lock().unwrap().get(name) {
            Some(body) => Ok(body.clone()),
            None => Err(GymLinkError::RemoteCallFailed(format!(
                "no canned response for {name}"
            ))),
        }
    }

    async fn list_tools(&self) -> Result<Vec<Value>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match self.listing.lock().unwrap().clone() {
            Some(records) => Ok(records),
            None => Err(GymLinkError::RemoteCallFailed(
                "tool listing unavailable".to_string(),
            )),
        }
    }

    async fn env_info(&self) -> Result<EnvInfo> {
        match self.info.lock().unwrap().clone() {
            Some(info) => Ok(info),
            None => Err(GymLinkError::RemoteCallFailed(
                "info endpoint unavailable".to_string(),
            )),
        }
    }

    async fn health_check(&self, _force: bool) -> bool {
        self.healthy
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
