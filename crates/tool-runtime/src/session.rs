use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;

/// Mutable bridge state that belongs to exactly one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Most recent synthesized tool-result text. Single slot, last write wins.
    last_tool_result: Option<String>,
}

impl SessionState {
    pub fn last_tool_result(&self) -> Option<&str> {
        self.last_tool_result.as_deref()
    }

    pub fn remember_tool_result(&mut self, text: String) {
        self.last_tool_result = Some(text);
    }
}

/// An in-memory conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    pub conversation: Conversation,
    pub state: SessionState,
}

impl Session {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            id: id.into(),
            conversation: Conversation::new(),
            state: SessionState::default(),
        }
    }
}
