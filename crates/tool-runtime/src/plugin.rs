use crate::agent::Agent;
use crate::model::{ModelRequest, ModelResponse};
use crate::session::SessionState;

/// Everything a callback may look at for the turn in progress.
///
/// Built fresh for each callback invocation; `state` is the only thing a
/// plugin may mutate besides the request/response it is handed.
pub struct CallbackContext<'a> {
    pub agent: &'a Agent,
    pub session_id: &'a str,
    pub user_id: &'a str,
    pub request_id: &'a str,
    pub state: &'a mut SessionState,
}

/// Lifecycle callbacks invoked by the agentic loop.
///
/// Callbacks run synchronously inside the turn and must not block.
/// Every method defaults to a no-op.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Before the agent handles a user message.
    fn before_agent(&self, _ctx: &mut CallbackContext<'_>) {}

    /// Immediately before the model is asked to produce a turn.
    fn before_model(&self, _ctx: &mut CallbackContext<'_>, _request: &mut ModelRequest) {}

    /// Immediately after the model responded, before tool dispatch.
    fn after_model(&self, _ctx: &mut CallbackContext<'_>, _response: &mut ModelResponse) {}

    /// After the agent produced its final response.
    fn after_agent(&self, _ctx: &mut CallbackContext<'_>) {}
}
