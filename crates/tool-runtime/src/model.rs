use serde::{Deserialize, Serialize};

use crate::conversation::{Fragment, Turn};
use crate::tool::{ToolCall, ToolDefinition};

/// Whether the current turn is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishSignal {
    /// The model expects tool results and another round
    Continue,
    /// Nothing more should be awaited for this turn
    Stop,
}

/// What is about to be sent to the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_prompt: Option<String>,
    /// In-flight copy of the history; callbacks may rewrite it freely.
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub fragments: Vec<Fragment>,
    pub finish: FinishSignal,
    /// Set when something other than the model decided the turn is over.
    pub turn_complete: bool,
}

impl ModelResponse {
    pub fn new(fragments: Vec<Fragment>, finish: FinishSignal) -> Self {
        Self {
            fragments,
            finish,
            turn_complete: false,
        }
    }

    /// A plain text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Fragment::text(text)], FinishSignal::Stop)
    }

    /// A response consisting of structured calls only.
    pub fn calls(calls: Vec<ToolCall>) -> Self {
        Self::new(
            calls.into_iter().map(Fragment::ToolCall).collect(),
            FinishSignal::Continue,
        )
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.fragments.iter().filter_map(Fragment::as_tool_call)
    }

    /// Mark the turn complete regardless of what the model signalled.
    pub fn force_stop(&mut self) {
        self.finish = FinishSignal::Stop;
        self.turn_complete = true;
    }
}
