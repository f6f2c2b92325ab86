use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Anything addressable by a stable name: tools, agents, calls and results.
///
/// Names are read once when a tool is registered on an agent, so an
/// implementation must return the same value for the lifetime of the object.
pub trait Nameable {
    fn name(&self) -> &str;
}

/// Describes a tool's interface for model consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "calc", "http_get")
    pub name: String,
    /// Human-readable description for the model
    pub description: String,
    /// JSON Schema describing the expected arguments
    pub input_schema: Value,
}

impl Nameable for ToolDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A model requesting execution of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Invocation id, when the model (or runtime) assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name to execute
    pub name: String,
    /// Keyword arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Nameable for ToolCall {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, Value::Object(self.arguments.clone()))
    }
}

/// Outcome of a prior tool invocation, keyed by tool name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    /// Must match the ToolCall id when one was assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Opaque payload; `None` when the tool returned nothing
    #[serde(default)]
    pub result: Option<Value>,
}

impl ToolResultEnvelope {
    pub fn new(name: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            id: None,
            name: name.into(),
            result,
        }
    }
}

impl Nameable for ToolResultEnvelope {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Context passed to tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: String,
    pub user_id: String,
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async. A successful execution
/// returns the raw payload; the runtime wraps it into a [`ToolResultEnvelope`].
#[async_trait]
pub trait Tool: Nameable + Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given keyword arguments.
    async fn execute(
        &self,
        arguments: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<Value, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// Read a required string argument.
pub(crate) fn required_str<'a>(
    arguments: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing '{key}' field")))
}

/// Simple echo tool for testing purposes.
#[cfg(any(test, feature = "test-utils"))]
pub struct EchoTool;

#[cfg(any(test, feature = "test-utils"))]
impl Nameable for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Echoes back the input message. For testing.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The message to echo back"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let message = required_str(&arguments, "message")?;
        Ok(Value::String(message.to_string()))
    }
}
