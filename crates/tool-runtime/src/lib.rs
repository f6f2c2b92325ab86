pub mod tool;
pub mod tools;
pub mod registry;
pub mod agent;
pub mod allowed;
pub mod conversation;
pub mod model;
pub mod session;
pub mod plugin;
pub mod hooks;
pub mod bridge;
pub mod event;
pub mod provider;
pub mod runtime;

pub use tool::{Nameable, Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResultEnvelope};
pub use registry::{RegistryError, ToolRegistry};
pub use agent::Agent;
pub use allowed::AllowedTools;
pub use conversation::{Conversation, Fragment, Role, Turn};
pub use model::{FinishSignal, ModelRequest, ModelResponse};
pub use session::{Session, SessionState};
pub use plugin::{CallbackContext, Plugin};
pub use hooks::{HookEvent, LoggerPlugin, ObservationHook};
pub use bridge::{classify, Classification, Decision, ToolCallNormalizer};
pub use event::AgentEvent;
pub use provider::{ModelError, ModelProvider};
pub use runtime::{AgenticLoop, AgenticLoopError};
pub use tools::{CalcTool, HttpGetTool, JsonFetcher, WeatherLookupTool};
