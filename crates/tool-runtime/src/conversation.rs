use crate::tool::{ToolCall, ToolResultEnvelope};
use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One atomic unit of model or user content.
///
/// Always exactly one variant; the bridge resolves each fragment into a new
/// fragment or drops it, never leaves one half-converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    /// Plain text
    Text(String),
    /// Structured tool invocation
    ToolCall(ToolCall),
    /// Result of a prior tool invocation
    ToolResult(ToolResultEnvelope),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Fragment::ToolCall(call) => Some(call),
            _ => None,
        }
    }
}

/// An ordered sequence of fragments from one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub fragments: Vec<Fragment>,
}

impl Turn {
    pub fn user(fragments: Vec<Fragment>) -> Self {
        Self {
            role: Role::User,
            fragments,
        }
    }

    pub fn model(fragments: Vec<Fragment>) -> Self {
        Self {
            role: Role::Model,
            fragments,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Fragment::text(text)])
    }

    /// Concatenated text fragments, `None` when the turn carries no text.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self.fragments.iter().filter_map(Fragment::as_text).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.fragments.iter().filter_map(Fragment::as_tool_call)
    }
}

/// Committed conversation history for one session.
///
/// Turns are append-only; callbacks work on a copy inside the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
