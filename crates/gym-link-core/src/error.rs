//! Error types for Gym-Link

use thiserror::Error;

/// Result type for Gym-Link operations
pub type Result<T> = std::result::Result<T, GymLinkError>;

/// Gym-Link error types
#[derive(Debug, Error)]
pub enum GymLinkError {
    /// Bad mode string, missing endpoint, or other construction-time problem
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Transport-level failure: non-2xx status or a network error
    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),

    /// 2xx response whose body reported `success: false`
    #[error("Server reported failure: {0}")]
    ApplicationFailure(String),

    /// Space description carried an unrecognized `type` tag
    #[error("Unsupported space type: {0}")]
    UnsupportedSpaceKind(String),

    /// Wire value does not fit the target space
    #[error("Value does not match space: {0}")]
    SpaceMismatch(String),

    /// Required tool parameter absent from the call arguments
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Supplied parameter value fails its schema check
    #[error("Parameter '{name}' must be {expected}, got {actual}")]
    ParameterTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Every discovery strategy was exhausted
    #[error("Failed to discover tools from {server_url}: {reason}")]
    DiscoveryFailed { server_url: String, reason: String },

    /// A tool invocation failed after validation passed
    #[error("Tool '{tool}' failed: {source}")]
    ToolExecutionFailed {
        tool: String,
        #[source]
        source: Box<GymLinkError>,
    },

    /// Server name already registered
    #[error("Server already registered: {0}")]
    DuplicateServer(String),

    /// Server name not registered
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// Tool definition failed construction-time validation
    #[error("Invalid tool definition: {0}")]
    InvalidToolDefinition(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GymLinkError {
    /// Wrap an error as a tool execution failure, naming the tool.
    pub fn tool_failure(tool: impl Into<String>, source: GymLinkError) -> Self {
        GymLinkError::ToolExecutionFailed {
            tool: tool.into(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for GymLinkError {
    fn from(err: serde_json::Error) -> Self {
        GymLinkError::Serialization(err.to_string())
    }
}
