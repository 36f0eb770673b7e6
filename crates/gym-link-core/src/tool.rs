//! Tool definitions and parameter schemas

use serde_json::Value;

use crate::error::{GymLinkError, Result};

/// Metadata for one remote operation exposed by a server
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Tool name (e.g. "reset_env", "step_env")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter schema
    pub schema: ToolSchema,
    /// Server the tool belongs to
    pub server_url: String,
}

impl ToolDefinition {
    /// Build a definition, rejecting empty names and server URLs.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        server_url: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let server_url = server_url.into();
        if name.is_empty() {
            return Err(GymLinkError::InvalidToolDefinition(
                "tool name cannot be empty".into(),
            ));
        }
        if server_url.is_empty() {
            return Err(GymLinkError::InvalidToolDefinition(
                "server URL cannot be empty".into(),
            ));
        }
        Ok(Self {
            name,
            description: description.into(),
            schema,
            server_url,
        })
    }
}

/// JSON-schema-shaped parameter specification for a tool
///
/// Properties keep their declaration order: positional call arguments map
/// onto parameter names in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    /// Parameter name and spec, in declaration order
    pub properties: Vec<(String, PropertySpec)>,
    /// Names that must be present in every call
    pub required: Vec<String>,
}

/// Schema for one parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySpec {
    /// Declared type, if one was recognized
    pub kind: Option<ParamKind>,
    /// Human-readable description
    pub description: Option<String>,
    /// Allowed values (JSON-schema `enum`)
    pub allowed: Vec<Value>,
    /// Inclusive lower bound for numeric parameters
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numeric parameters
    pub maximum: Option<f64>,
    /// Element schema for array parameters
    pub items: Option<Box<PropertySpec>>,
}

/// Recognized JSON-schema parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ParamKind::String),
            "integer" => Some(ParamKind::Integer),
            "number" => Some(ParamKind::Number),
            "boolean" => Some(ParamKind::Boolean),
            "array" => Some(ParamKind::Array),
            "object" => Some(ParamKind::Object),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ParamKind::String => "a string",
            ParamKind::Integer => "an integer",
            ParamKind::Number => "a number",
            ParamKind::Boolean => "a boolean",
            ParamKind::Array => "an array",
            ParamKind::Object => "an object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }
}

/// Name of a JSON value's type, for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ToolSchema {
    /// Parse a JSON-schema object shape (`{"type": "object", "properties":
    /// {...}, "required": [...]}`) into a typed schema.
    ///
    /// A `type` given as an array (e.g. `["integer", "null"]`) uses its
    /// first non-null entry; unrecognized type tags leave the parameter
    /// untyped rather than failing the whole schema.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut schema = ToolSchema::default();
        let Some(obj) = value.as_object() else {
            return Ok(schema);
        };

        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (name, spec) in props {
                schema
                    .properties
                    .push((name.clone(), PropertySpec::from_value(spec)));
            }
        }
        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            schema.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        Ok(schema)
    }

    /// Render back to the JSON-schema object shape.
    pub fn to_value(&self) -> Value {
        let mut props = serde_json::Map::new();
        for (name, spec) in &self.properties {
            props.insert(name.clone(), spec.to_value());
        }
        let mut out = serde_json::Map::new();
        out.insert("type".into(), Value::String("object".into()));
        out.insert("properties".into(), Value::Object(props));
        if !self.required.is_empty() {
            out.insert(
                "required".into(),
                Value::Array(self.required.iter().map(|r| Value::String(r.clone())).collect()),
            );
        }
        Value::Object(out)
    }

    /// Parameter names in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a parameter's spec by name.
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Validate an argument map against this schema.
    ///
    /// Checks required presence first, then per-parameter type, enum
    /// membership, and numeric range. Arguments without a matching
    /// property are accepted untouched.
    pub fn validate(&self, params: &serde_json::Map<String, Value>) -> Result<()> {
        for req in &self.required {
            if !params.contains_key(req) {
                return Err(GymLinkError::MissingParameter(req.clone()));
            }
        }
        for (name, value) in params {
            if let Some(spec) = self.property(name) {
                spec.check(name, value)?;
            }
        }
        Ok(())
    }
}

impl PropertySpec {
    /// Parse one property's schema. Permissive: anything unrecognized
    /// degrades to an untyped parameter.
    pub fn from_value(value: &Value) -> Self {
        let mut spec = PropertySpec::default();
        let Some(obj) = value.as_object() else {
            return spec;
        };

        spec.kind = match obj.get("type") {
            Some(Value::String(tag)) => ParamKind::parse(tag),
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .and_then(ParamKind::parse),
            _ => None,
        };
        spec.description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(allowed) = obj.get("enum").and_then(Value::as_array) {
            spec.allowed = allowed.clone();
        }
        spec.minimum = obj.get("minimum").and_then(Value::as_f64);
        spec.maximum = obj.get("maximum").and_then(Value::as_f64);
        spec.items = obj
            .get("items")
            .map(|items| Box::new(PropertySpec::from_value(items)));
        spec
    }

    /// Render back to the JSON-schema property shape.
    pub fn to_value(&self) -> Value {
        let mut out = serde_json::Map::new();
        if let Some(kind) = self.kind {
            let tag = match kind {
                ParamKind::String => "string",
                ParamKind::Integer => "integer",
                ParamKind::Number => "number",
                ParamKind::Boolean => "boolean",
                ParamKind::Array => "array",
                ParamKind::Object => "object",
            };
            out.insert("type".into(), Value::String(tag.into()));
        }
        if let Some(desc) = &self.description {
            out.insert("description".into(), Value::String(desc.clone()));
        }
        if !self.allowed.is_empty() {
            out.insert("enum".into(), Value::Array(self.allowed.clone()));
        }
        if let Some(min) = self.minimum {
            out.insert("minimum".into(), serde_json::json!(min));
        }
        if let Some(max) = self.maximum {
            out.insert("maximum".into(), serde_json::json!(max));
        }
        if let Some(items) = &self.items {
            out.insert("items".into(), items.to_value());
        }
        Value::Object(out)
    }

    /// Check a single value against this spec.
    pub fn check(&self, name: &str, value: &Value) -> Result<()> {
        if let Some(kind) = self.kind {
            if !kind.matches(value) {
                return Err(GymLinkError::ParameterTypeMismatch {
                    name: name.to_string(),
                    expected: kind.name().to_string(),
                    actual: json_type_name(value).to_string(),
                });
            }
        }
        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            return Err(GymLinkError::ParameterTypeMismatch {
                name: name.to_string(),
                expected: format!("one of {}", Value::Array(self.allowed.clone())),
                actual: value.to_string(),
            });
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    return Err(GymLinkError::ParameterTypeMismatch {
                        name: name.to_string(),
                        expected: format!(">= {}", min),
                        actual: n.to_string(),
                    });
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    return Err(GymLinkError::ParameterTypeMismatch {
                        name: name.to_string(),
                        expected: format!("<= {}", max),
                        actual: n.to_string(),
                    });
                }
            }
        }
        if let (Some(items), Some(arr)) = (&self.items, value.as_array()) {
            for element in arr {
                items.check(name, element)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step_schema() -> ToolSchema {
        ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "description": "The action to execute"},
                "ticks": {"type": "integer", "minimum": 1}
            },
            "required": ["action"]
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(ToolDefinition::new("", "desc", ToolSchema::default(), "http://x").is_err());
    }

    #[test]
    fn test_empty_server_url_rejected() {
        assert!(ToolDefinition::new("reset_env", "desc", ToolSchema::default(), "").is_err());
    }

    #[test]
    fn test_property_order_preserved() {
        let schema = step_schema();
        assert_eq!(schema.property_names(), vec!["action", "ticks"]);
    }

    #[test]
    fn test_missing_required_parameter() {
        let schema = step_schema();
        let err = schema.validate(&serde_json::Map::new()).unwrap_err();
        match err {
            GymLinkError::MissingParameter(name) => assert_eq!(name, "action"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_type_mismatch_names_parameter() {
        let schema = step_schema();
        let mut params = serde_json::Map::new();
        params.insert("action".into(), json!(42));
        let err = schema.validate(&params).unwrap_err();
        match err {
            GymLinkError::ParameterTypeMismatch { name, expected, actual } => {
                assert_eq!(name, "action");
                assert_eq!(expected, "a string");
                assert_eq!(actual, "an integer");
            }
            other => panic!("expected ParameterTypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_membership() {
        let schema = ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "mode": {"type": "string", "enum": ["human", "rgb_array"]}
            }
        }))
        .unwrap();
        let mut ok = serde_json::Map::new();
        ok.insert("mode".into(), json!("human"));
        assert!(schema.validate(&ok).is_ok());

        let mut bad = serde_json::Map::new();
        bad.insert("mode".into(), json!("ansi"));
        assert!(schema.validate(&bad).is_err());
    }

    #[test]
    fn test_numeric_range() {
        let schema = step_schema();
        let mut params = serde_json::Map::new();
        params.insert("action".into(), json!("noop"));
        params.insert("ticks".into(), json!(0));
        assert!(schema.validate(&params).is_err());
        params.insert("ticks".into(), json!(3));
        assert!(schema.validate(&params).is_ok());
    }

    #[test]
    fn test_nullable_type_array() {
        // gym servers advertise seed as ["integer", "null"]
        let schema = ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "seed": {"type": ["integer", "null"]}
            }
        }))
        .unwrap();
        assert_eq!(schema.property("seed").unwrap().kind, Some(ParamKind::Integer));
    }

    #[test]
    fn test_array_items_checked() {
        let schema = ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "action": {"type": "array", "items": {"type": "integer", "minimum": 0, "maximum": 1}}
            }
        }))
        .unwrap();
        let mut ok = serde_json::Map::new();
        ok.insert("action".into(), json!([0, 1, 1]));
        assert!(schema.validate(&ok).is_ok());

        let mut bad = serde_json::Map::new();
        bad.insert("action".into(), json!([0, 2]));
        assert!(schema.validate(&bad).is_err());
    }

    #[test]
    fn test_schema_round_trip() {
        let schema = step_schema();
        let rendered = schema.to_value();
        let reparsed = ToolSchema::from_value(&rendered).unwrap();
        assert_eq!(schema, reparsed);
    }
}
