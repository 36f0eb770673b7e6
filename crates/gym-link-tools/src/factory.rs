//! Binding tool definitions to a transport as invokable tools.

use std::sync::Arc;

use gym_link_client::{Options, ToolTransport};
use gym_link_core::{GymLinkError, Result, ToolDefinition, ToolSchema};
use serde_json::Value;
use tracing::debug;

use crate::discovery::discover_tools;

/// Arguments for one tool invocation.
///
/// Positional values map onto the schema's parameter names in
/// declaration order; named values land under their own key. When
/// both supply the same parameter the positional value wins.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    positional: Vec<Value>,
    named: Options,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn pos(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a named argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Resolve to a named parameter map using the schema's declaration
    /// order. Positional values beyond the declared parameters are
    /// dropped.
    fn into_named(self, schema: &ToolSchema) -> Options {
        let mut params = self.named;
        let names = schema.property_names();
        for (i, value) in self.positional.into_iter().enumerate() {
            let Some(name) = names.get(i) else {
                break;
            };
            params.insert((*name).to_string(), value);
        }
        params
    }
}

impl From<Options> for ToolArgs {
    fn from(named: Options) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }
}

/// One remotely-callable operation: a definition bound to the
/// transport that serves it.
#[derive(Clone)]
pub struct Tool {
    definition: ToolDefinition,
    transport: Arc<dyn ToolTransport>,
}

impl Tool {
    pub fn new(definition: ToolDefinition, transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            definition,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Invoke the tool.
    ///
    /// Arguments are validated against the schema before anything goes
    /// on the wire, so [`GymLinkError::MissingParameter`] and
    /// [`GymLinkError::ParameterTypeMismatch`] surface without a
    /// network round trip. Transport and server failures are wrapped
    /// in [`GymLinkError::ToolExecutionFailed`] naming this tool.
    pub async fn invoke(&self, args: impl Into<ToolArgs>) -> Result<Value> {
        let params = args.into().into_named(&self.definition.schema);
        self.definition.schema.validate(&params)?;

        debug!(tool = %self.definition.name, server = %self.definition.server_url, "invoking tool");
        let body = self
            .transport
            .call_tool(&self.definition.name, params)
            .await
            .map_err(|err| GymLinkError::tool_failure(&self.definition.name, err))?;
        Ok(unwrap_result(body))
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition.name)
            .field("server_url", &self.definition.server_url)
            .finish()
    }
}

/// Peel the useful payload out of a response body.
///
/// Bodies shaped `{"result": ...}` yield the result; bodies shaped
/// `{"success": true, "data": ...}` yield the data; anything else is
/// returned whole.
fn unwrap_result(body: Value) -> Value {
    let Some(obj) = body.as_object() else {
        return body;
    };
    if let Some(result) = obj.get("result") {
        return result.clone();
    }
    if obj.get("success").and_then(Value::as_bool) == Some(true) {
        if let Some(data) = obj.get("data") {
            return data.clone();
        }
    }
    body
}

/// Builds [`Tool`] values for one server, memoizing discovery.
pub struct ToolFactory {
    transport: Arc<dyn ToolTransport>,
    definitions: Option<Vec<ToolDefinition>>,
}

impl ToolFactory {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            transport,
            definitions: None,
        }
    }

    pub fn transport(&self) -> &Arc<dyn ToolTransport> {
        &self.transport
    }

    /// Discovered definitions, fetched once and memoized. `refresh`
    /// forces a new round of discovery.
    pub async fn definitions(&mut self, refresh: bool) -> Result<&[ToolDefinition]> {
        if refresh || self.definitions.is_none() {
            let defs = discover_tools(self.transport.as_ref()).await?;
            self.definitions = Some(defs);
        }
        // Populated just above.
        Ok(self.definitions.as_deref().unwrap_or_default())
    }

    /// Names of every discovered tool.
    pub async fn tool_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .definitions(false)
            .await?
            .iter()
            .map(|d| d.name.clone())
            .collect())
    }

    /// Build tools for the discovered definitions.
    ///
    /// With `names`, only the named tools are built; names the server
    /// does not offer are silently omitted.
    pub async fn create_tools(&mut self, names: Option<&[&str]>) -> Result<Vec<Tool>> {
        let transport = Arc::clone(&self.transport);
        let defs = self.definitions(false).await?;
        Ok(defs
            .iter()
            .filter(|d| names.is_none_or(|wanted| wanted.contains(&d.name.as_str())))
            .map(|d| Tool::new(d.clone(), Arc::clone(&transport)))
            .collect())
    }
}
