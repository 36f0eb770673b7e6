//! Tool discovery against remote gym servers.
//!
//! Two independent strategies:
//!
//! * [`discover_tools`] asks the server's listing endpoint, and when that
//!   endpoint is missing or broken falls back to the fixed catalog every
//!   gym server implements.
//! * [`infer_tools_from_info`] never touches the listing endpoint: it
//!   synthesizes parameter schemas from the environment's own space
//!   description, so the `step_env` tool carries real action bounds.

use gym_link_client::ToolTransport;
use gym_link_core::{
    GymLinkError, Result, SpaceDescription, ToolDefinition, ToolSchema,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Discover the tools a server exposes.
///
/// Asks the listing endpoint first; records without a usable `name`
/// are skipped. If the endpoint itself is unreachable or returns an
/// error body, the fixed five-tool gym catalog is used instead, so
/// servers that predate the listing endpoint are still usable.
pub async fn discover_tools(transport: &dyn ToolTransport) -> Result<Vec<ToolDefinition>> {
    let server_url = transport.server_url().to_string();
    match listed_tools(transport).await {
        Ok(tools) => {
            debug!(server = %server_url, count = tools.len(), "discovered tools via listing");
            Ok(tools)
        }
        Err(
            err @ (GymLinkError::RemoteCallFailed(_)
            | GymLinkError::ApplicationFailure(_)
            | GymLinkError::Serialization(_)),
        ) => {
            warn!(server = %server_url, error = %err, "tool listing failed, using fixed catalog");
            fixed_catalog(&server_url).map_err(|e| GymLinkError::DiscoveryFailed {
                server_url,
                reason: e.to_string(),
            })
        }
        Err(other) => Err(other),
    }
}

/// Primary strategy: parse the records from the listing endpoint.
async fn listed_tools(transport: &dyn ToolTransport) -> Result<Vec<ToolDefinition>> {
    let records = transport.list_tools().await?;
    let server_url = transport.server_url();
    let mut tools = Vec::with_capacity(records.len());
    for record in &records {
        let Some(name) = record.get("name").and_then(Value::as_str) else {
            warn!(server = %server_url, "skipping tool record without a name");
            continue;
        };
        let description = record
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");
        let schema = match record.get("parameters").or_else(|| record.get("inputSchema")) {
            Some(params) => ToolSchema::from_value(params)?,
            None => ToolSchema::default(),
        };
        match ToolDefinition::new(name, description, schema, server_url) {
            Ok(def) => tools.push(def),
            Err(err) => warn!(server = %server_url, tool = name, error = %err, "skipping tool record"),
        }
    }
    Ok(tools)
}

/// The five operations every gym server implements, with the schemas
/// the reference server advertises.
fn fixed_catalog(server_url: &str) -> Result<Vec<ToolDefinition>> {
    let entries = [
        (
            "reset_env",
            "Reset the environment and return the initial observation",
            json!({
                "type": "object",
                "properties": {
                    "seed": {"type": ["integer", "null"], "description": "Random seed for reproducibility"}
                }
            }),
        ),
        (
            "step_env",
            "Execute one action in the environment",
            json!({
                "type": "object",
                "properties": {
                    "action": {"description": "Action to execute, in the environment's action space"}
                },
                "required": ["action"]
            }),
        ),
        (
            "get_env_info",
            "Get environment metadata including space descriptions",
            json!({"type": "object", "properties": {}}),
        ),
        (
            "render_env",
            "Render the environment's current state",
            json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "description": "Render mode"}
                }
            }),
        ),
        (
            "close_env",
            "Close the environment and release its resources",
            json!({"type": "object", "properties": {}}),
        ),
    ];

    entries
        .into_iter()
        .map(|(name, description, schema)| {
            ToolDefinition::new(name, description, ToolSchema::from_value(&schema)?, server_url)
        })
        .collect()
}

/// Synthesize tool definitions from the environment's space description.
///
/// Queries `get_env_info` instead of the listing endpoint, so the
/// resulting `step_env` schema carries the action space's actual type
/// and bounds. `render_env` is only offered when the environment
/// reports at least one render mode.
pub async fn infer_tools_from_info(transport: &dyn ToolTransport) -> Result<Vec<ToolDefinition>> {
    let server_url = transport.server_url().to_string();
    let info = transport
        .env_info()
        .await
        .map_err(|err| GymLinkError::DiscoveryFailed {
            server_url: server_url.clone(),
            reason: err.to_string(),
        })?;

    let action_schema = match SpaceDescription::from_value(&info.action_space) {
        Ok(desc) => action_property(&desc),
        Err(err) => {
            debug!(server = %server_url, error = %err, "action space unparseable, using free-form schema");
            json!({"type": "string", "description": "Action command"})
        }
    };

    let mut tools = vec![
        ToolDefinition::new(
            "reset_env",
            "Reset the environment and return the initial observation",
            ToolSchema::from_value(&json!({
                "type": "object",
                "properties": {
                    "seed": {"type": ["integer", "null"], "description": "Random seed for reproducibility"}
                }
            }))?,
            &server_url,
        )?,
        ToolDefinition::new(
            "step_env",
            "Execute one action in the environment",
            ToolSchema::from_value(&json!({
                "type": "object",
                "properties": {"action": action_schema},
                "required": ["action"]
            }))?,
            &server_url,
        )?,
        ToolDefinition::new(
            "get_env_info",
            "Get environment metadata including space descriptions",
            ToolSchema::default(),
            &server_url,
        )?,
        ToolDefinition::new(
            "close_env",
            "Close the environment and release its resources",
            ToolSchema::default(),
            &server_url,
        )?,
    ];

    if !info.render_modes.is_empty() {
        tools.push(ToolDefinition::new(
            "render_env",
            "Render the environment's current state",
            ToolSchema::from_value(&json!({
                "type": "object",
                "properties": {
                    "mode": {
                        "type": "string",
                        "description": "Render mode",
                        "enum": info.render_modes
                    }
                }
            }))?,
            &server_url,
        )?);
    }
    Ok(tools)
}

/// Property schema for `step_env`'s `action` parameter, derived from
/// the action space.
fn action_property(desc: &SpaceDescription) -> Value {
    match desc {
        SpaceDescription::Discrete { n, start } => json!({
            "type": "integer",
            "description": format!("Discrete action ({} to {})", start, start + n - 1),
            "minimum": start,
            "maximum": start + n - 1
        }),
        SpaceDescription::Box { shape, .. } => json!({
            "type": "array",
            "description": format!("Continuous action vector of shape {:?}", shape),
            "items": {"type": "number"}
        }),
        SpaceDescription::MultiBinary { n } => json!({
            "type": "array",
            "description": format!("Binary vector of {} entries, each 0 or 1", n),
            "items": {"type": "integer", "minimum": 0, "maximum": 1}
        }),
        SpaceDescription::MultiDiscrete { nvec } => json!({
            "type": "array",
            "description": format!("Integer vector with per-slot counts {:?}", nvec),
            "items": {"type": "integer", "minimum": 0}
        }),
        SpaceDescription::Tuple { .. } | SpaceDescription::Dict { .. } => json!({
            "type": "object",
            "description": "Composite action matching the environment's action space"
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use gym_link_core::{EnvInfo, ParamKind};

    #[tokio::test]
    async fn test_discovery_uses_listing() {
        let transport = MockTransport::new("http://localhost:8000").listing(vec![
            json!({
                "name": "step_env",
                "description": "Step",
                "parameters": {
                    "type": "object",
                    "properties": {"action": {"type": "integer"}},
                    "required": ["action"]
                }
            }),
            json!({"name": "reset_env"}),
        ]);
        let tools = discover_tools(&transport).await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "step_env");
        assert_eq!(tools[0].schema.required, vec!["action"]);
        assert_eq!(tools[1].description, "");
    }

    #[tokio::test]
    async fn test_nameless_records_skipped() {
        let transport = MockTransport::new("http://localhost:8000").listing(vec![
            json!({"description": "no name here"}),
            json!({"name": "close_env"}),
        ]);
        let tools = discover_tools(&transport).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "close_env");
    }

    #[tokio::test]
    async fn test_listing_failure_falls_back_to_catalog() {
        // No canned listing: the endpoint reports a transport error.
        let transport = MockTransport::new("http://localhost:8000");
        let tools = discover_tools(&transport).await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["reset_env", "step_env", "get_env_info", "render_env", "close_env"]
        );
        assert_eq!(tools[1].schema.required, vec!["action"]);
    }

    #[tokio::test]
    async fn test_inferred_discrete_action_bounds() {
        let info = EnvInfo {
            action_space: json!({"type": "Discrete", "n": 4, "start": 1}),
            ..EnvInfo::default()
        };
        let transport = MockTransport::new("http://localhost:8000").info(info);
        let tools = infer_tools_from_info(&transport).await.unwrap();
        let step = tools.iter().find(|t| t.name == "step_env").unwrap();
        let action = step.schema.property("action").unwrap();
        assert_eq!(action.kind, Some(ParamKind::Integer));
        assert_eq!(action.minimum, Some(1.0));
        assert_eq!(action.maximum, Some(4.0));
    }

    #[tokio::test]
    async fn test_inferred_render_requires_modes() {
        let bare = MockTransport::new("http://localhost:8000").info(EnvInfo::default());
        let tools = infer_tools_from_info(&bare).await.unwrap();
        assert!(tools.iter().all(|t| t.name != "render_env"));

        let info = EnvInfo {
            render_modes: vec!["human".into(), "rgb_array".into()],
            ..EnvInfo::default()
        };
        let with_modes = MockTransport::new("http://localhost:8000").info(info);
        let tools = infer_tools_from_info(&with_modes).await.unwrap();
        let render = tools.iter().find(|t| t.name == "render_env").unwrap();
        let mode = render.schema.property("mode").unwrap();
        assert_eq!(mode.allowed, vec![json!("human"), json!("rgb_array")]);
    }

    #[tokio::test]
    async fn test_inference_without_info_is_discovery_failure() {
        let transport = MockTransport::new("http://localhost:8000");
        let err = infer_tools_from_info(&transport).await.unwrap_err();
        assert!(matches!(err, GymLinkError::DiscoveryFailed { .. }));
    }
}
