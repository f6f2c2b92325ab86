use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::model::FinishSignal;

/// One step of a run, as seen by the caller.
///
/// The loop emits one event per committed turn: model turns authored by the
/// agent and tool-result turns authored by `"tools"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Request id of the run that produced this event
    pub id: String,
    pub author: String,
    pub content: Turn,
    pub finish: Option<FinishSignal>,
    final_response: bool,
}

impl AgentEvent {
    pub fn model_turn(
        id: impl Into<String>,
        author: impl Into<String>,
        content: Turn,
        finish: FinishSignal,
        final_response: bool,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            content,
            finish: Some(finish),
            final_response,
        }
    }

    pub fn tool_results(id: impl Into<String>, content: Turn) -> Self {
        Self {
            id: id.into(),
            author: "tools".to_string(),
            content,
            finish: None,
            final_response: false,
        }
    }

    /// True for the event that ends the run.
    pub fn is_final_response(&self) -> bool {
        self.final_response
    }

    /// Text of the event's content, if it has any.
    pub fn text(&self) -> Option<String> {
        self.content.text()
    }
}
