//! Converters from tool definitions to agent-framework shapes.

use gym_link_core::ToolDefinition;
use serde_json::{Value, json};

/// Render a definition as an OpenAI-style function schema.
pub fn to_function_schema(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.schema.to_value()
        }
    })
}

/// Render all definitions as OpenAI-style function schemas.
pub fn to_function_schemas(defs: &[ToolDefinition]) -> Vec<Value> {
    defs.iter().map(to_function_schema).collect()
}

/// Human-readable tool listing for embedding in a prompt.
///
/// One line per tool: name, description, and parameter names with
/// required ones marked by a trailing `*`.
pub fn describe_tools(defs: &[ToolDefinition]) -> String {
    let mut out = String::new();
    for def in defs {
        out.push_str("- ");
        out.push_str(&def.name);
        if !def.description.is_empty() {
            out.push_str(": ");
            out.push_str(&def.description);
        }
        let params: Vec<String> = def
            .schema
            .properties
            .iter()
            .map(|(name, _)| {
                if def.schema.required.iter().any(|r| r == name) {
                    format!("{name}*")
                } else {
                    name.clone()
                }
            })
            .collect();
        if !params.is_empty() {
            out.push_str(&format!(" (params: {})", params.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gym_link_core::ToolSchema;

    fn defs() -> Vec<ToolDefinition> {
        let step_schema = ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "action": {"type": "integer"},
                "repeat": {"type": "integer"}
            },
            "required": ["action"]
        }))
        .unwrap();
        vec![
            ToolDefinition::new("step_env", "Execute one action", step_schema, "http://a:8000")
                .unwrap(),
            ToolDefinition::new("close_env", "", ToolSchema::default(), "http://a:8000").unwrap(),
        ]
    }

    #[test]
    fn test_function_schema_shape() {
        let schema = to_function_schema(&defs()[0]);
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "step_env");
        assert_eq!(
            schema["function"]["parameters"]["properties"]["action"]["type"],
            "integer"
        );
        assert_eq!(schema["function"]["parameters"]["required"], json!(["action"]));
    }

    #[test]
    fn test_describe_tools_marks_required() {
        let listing = describe_tools(&defs());
        assert!(listing.contains("- step_env: Execute one action (params: action*, repeat)"));
        assert!(listing.contains("- close_env\n"));
    }
}
