//! Tool-call normalization bridge.
//!
//! Sits between the model and the runtime's dispatcher. Before a request it
//! turns prior tool results into text; after a response it classifies every
//! fragment so that only allowed, well-formed calls reach the dispatcher.
//! Calls spelled out as JSON text are recovered, finalize pseudo-calls become
//! the answer, and anything unusable ends the turn with a diagnostic.

mod classify;
mod rewrite;

pub use self::classify::{
    classify, is_finalize_name, summarize_tool_result, Classification, Decision,
    FINALIZE_TOOL_NAMES,
};
pub use self::rewrite::{rewrite_tool_results, RewriteOutcome};

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::agent::Agent;
use crate::allowed::AllowedTools;
use crate::conversation::Fragment;
use crate::hooks::{HookEvent, ObservationHook};
use crate::model::{FinishSignal, ModelRequest, ModelResponse};
use crate::plugin::{CallbackContext, Plugin};
use crate::tool::Nameable;

/// The bridge, as a plugin.
///
/// Holds no per-session data, so one instance can serve any number of
/// sessions; the cache lives in the [`CallbackContext`] state.
pub struct ToolCallNormalizer {
    allowed: Option<AllowedTools>,
    hook: Option<Arc<dyn ObservationHook>>,
}

impl ToolCallNormalizer {
    /// `Some` pins the allow-list; `None` derives it per call from the active agent.
    pub fn new(allowed: Option<AllowedTools>) -> Self {
        Self {
            allowed,
            hook: None,
        }
    }

    /// Static allow-list covering the whole agent tree.
    pub fn for_agent_tree(agent: &Agent) -> Self {
        Self::new(Some(AllowedTools::from_agent_tree(agent)))
    }

    pub fn dynamic() -> Self {
        Self::new(None)
    }

    pub fn with_hook(mut self, hook: Arc<dyn ObservationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The allow-list that applies while `agent` is active.
    pub fn allowed_for<'s>(&'s self, agent: &Agent) -> Cow<'s, AllowedTools> {
        match &self.allowed {
            Some(allowed) => Cow::Borrowed(allowed),
            None => Cow::Owned(AllowedTools::from_active_agent(agent)),
        }
    }

    /// Outbound: rewrite tool-result envelopes in the request into text and
    /// offer the model only tools it will be allowed to call.
    pub fn rewrite_request(&self, ctx: &mut CallbackContext<'_>, request: &mut ModelRequest) {
        let allowed = self.allowed_for(ctx.agent);
        if allowed.is_empty() {
            debug!(agent = ctx.agent.name(), "no allowed tools, request left as is");
            return;
        }

        let agent = ctx.agent.name();
        let offered = request.tools.len();
        request
            .tools
            .retain(|def| allowed.contains(&def.name) || is_finalize_name(&def.name));
        if request.tools.len() < offered {
            debug!(
                agent,
                withheld = offered - request.tools.len(),
                "tool definitions outside the allow-list withheld"
            );
        }

        for outcome in rewrite_tool_results(&mut request.turns, &allowed, ctx.state) {
            match &outcome {
                RewriteOutcome::Rewritten { tool } => {
                    self.report(&HookEvent::Rewritten { agent, tool })
                }
                RewriteOutcome::Dropped { tool } => {
                    self.report(&HookEvent::Dropped { agent, tool })
                }
            }
        }
    }

    /// Inbound: classify every response fragment and apply the decisions.
    pub fn normalize_response(&self, ctx: &mut CallbackContext<'_>, response: &mut ModelResponse) {
        let allowed = self.allowed_for(ctx.agent);
        if allowed.is_empty() {
            debug!(agent = ctx.agent.name(), "no allowed tools, response left as is");
            return;
        }

        let agent = ctx.agent.name();
        let incoming = std::mem::take(&mut response.fragments);
        let mut fragments = Vec::with_capacity(incoming.len());
        let mut force_stop = false;

        for (index, fragment) in incoming.into_iter().enumerate() {
            let classification = classify(&fragment, &allowed, ctx.state.last_tool_result());
            self.report(&HookEvent::Classified {
                agent,
                index,
                decision: &classification.decision,
                finish: classification.finish,
            });
            force_stop |= classification.finish == Some(FinishSignal::Stop);

            match classification.decision {
                Decision::PassThrough => fragments.push(fragment),
                Decision::Recovered(call) => {
                    debug!(agent, tool = %call.name, "recovered tool call from text");
                    fragments.push(Fragment::ToolCall(call));
                }
                Decision::FinalAnswer(text) | Decision::Diagnostic(text) => {
                    fragments.push(Fragment::Text(text))
                }
                Decision::ToolResultText(text) => {
                    ctx.state.remember_tool_result(text.clone());
                    fragments.push(Fragment::Text(text));
                }
                Decision::Suppressed => {}
            }
        }

        response.fragments = fragments;
        if force_stop {
            response.force_stop();
        }
    }

    fn report(&self, event: &HookEvent<'_>) {
        if let Some(hook) = &self.hook {
            hook.observe(event);
        }
    }
}

impl Plugin for ToolCallNormalizer {
    fn name(&self) -> &str {
        "tool_call_normalizer"
    }

    fn before_model(&self, ctx: &mut CallbackContext<'_>, request: &mut ModelRequest) {
        self.rewrite_request(ctx, request);
    }

    fn after_model(&self, ctx: &mut CallbackContext<'_>, response: &mut ModelResponse) {
        self.normalize_response(ctx, response);
    }
}

#[cfg(test)]
mod tests;
