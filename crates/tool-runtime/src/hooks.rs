//! Observation hooks: diagnostics that watch the bridge and the agent
//! lifecycle without ever changing what they see.

use tracing::{debug, info};

use crate::bridge::Decision;
use crate::model::{FinishSignal, ModelResponse};
use crate::plugin::{CallbackContext, Plugin};
use crate::tool::Nameable;

/// Something worth recording.
#[derive(Debug, Clone, Copy)]
pub enum HookEvent<'a> {
    AgentStart {
        agent: &'a str,
        session_id: &'a str,
        user_id: &'a str,
        request_id: &'a str,
    },
    ModelAfter {
        agent: &'a str,
        finish: FinishSignal,
        turn_complete: bool,
    },
    AgentEnd {
        agent: &'a str,
        session_id: &'a str,
        user_id: &'a str,
        request_id: &'a str,
    },
    /// One inbound fragment was classified.
    Classified {
        agent: &'a str,
        index: usize,
        decision: &'a Decision,
        finish: Option<FinishSignal>,
    },
    /// An outbound tool result was rewritten into text.
    Rewritten { agent: &'a str, tool: &'a str },
    /// A tool result for an unauthorized tool was removed.
    Dropped { agent: &'a str, tool: &'a str },
}

pub trait ObservationHook: Send + Sync {
    fn observe(&self, event: &HookEvent<'_>);
}

/// Logs lifecycle and bridge events through `tracing`.
pub struct LoggerPlugin;

impl LoggerPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationHook for LoggerPlugin {
    fn observe(&self, event: &HookEvent<'_>) {
        match *event {
            HookEvent::AgentStart {
                agent,
                session_id,
                user_id,
                request_id,
            } => info!(
                "[agent:start] {} | session_id={} user_id={} request_id={}",
                agent, session_id, user_id, request_id
            ),
            HookEvent::ModelAfter {
                agent,
                finish,
                turn_complete,
            } => info!(
                "[model:after] agent={} finish_reason={:?} turn_complete={}",
                agent, finish, turn_complete
            ),
            HookEvent::AgentEnd {
                agent,
                session_id,
                user_id,
                request_id,
            } => info!(
                "[agent:end] {} | session_id={} user_id={} request_id={}",
                agent, session_id, user_id, request_id
            ),
            HookEvent::Classified {
                agent,
                index,
                decision,
                finish,
            } => debug!(
                agent,
                index,
                decision = decision.label(),
                finish = ?finish,
                "[bridge:classify]"
            ),
            HookEvent::Rewritten { agent, tool } => {
                debug!(agent, tool, "[bridge:rewrite] tool result sent as text")
            }
            HookEvent::Dropped { agent, tool } => {
                info!(agent, tool, "[bridge:drop] unauthorized tool result removed")
            }
        }
    }
}

impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        "logger"
    }

    fn before_agent(&self, ctx: &mut CallbackContext<'_>) {
        self.observe(&HookEvent::AgentStart {
            agent: ctx.agent.name(),
            session_id: ctx.session_id,
            user_id: ctx.user_id,
            request_id: ctx.request_id,
        });
    }

    fn after_model(&self, ctx: &mut CallbackContext<'_>, response: &mut ModelResponse) {
        self.observe(&HookEvent::ModelAfter {
            agent: ctx.agent.name(),
            finish: response.finish,
            turn_complete: response.turn_complete,
        });
    }

    fn after_agent(&self, ctx: &mut CallbackContext<'_>) {
        self.observe(&HookEvent::AgentEnd {
            agent: ctx.agent.name(),
            session_id: ctx.session_id,
            user_id: ctx.user_id,
            request_id: ctx.request_id,
        });
    }
}

/// Hook that keeps a one-line record of every event, for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingHook {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHook {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ObservationHook for RecordingHook {
        fn observe(&self, event: &HookEvent<'_>) {
            let line = match *event {
                HookEvent::AgentStart { agent, .. } => format!("agent_start:{agent}"),
                HookEvent::ModelAfter { agent, finish, .. } => {
                    format!("model_after:{agent}:{finish:?}")
                }
                HookEvent::AgentEnd { agent, .. } => format!("agent_end:{agent}"),
                HookEvent::Classified {
                    index, decision, ..
                } => format!("classified:{index}:{}", decision.label()),
                HookEvent::Rewritten { tool, .. } => format!("rewritten:{tool}"),
                HookEvent::Dropped { tool, .. } => format!("dropped:{tool}"),
            };
            self.events.lock().unwrap().push(line);
        }
    }
}
