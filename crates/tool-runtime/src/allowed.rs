//! The set of tool names an agent is authorized to invoke.
//!
//! Membership is the only authorization gate in the bridge: a call whose name
//! is not in the set never reaches the dispatcher.

use std::collections::BTreeSet;

use crate::agent::Agent;
use crate::tool::Nameable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedTools {
    names: BTreeSet<String>,
}

impl AllowedTools {
    /// An explicit allow-list.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Static mode: every tool reachable through the agent and its sub-agents.
    /// A tool named like the agent carrying it is skipped.
    pub fn from_agent_tree(agent: &Agent) -> Self {
        let mut allowed = Self::default();
        allowed.collect(agent, true);
        allowed
    }

    /// Dynamic mode: only the tools attached to the active agent.
    /// An agent without tools yields the empty set.
    pub fn from_active_agent(agent: &Agent) -> Self {
        let mut allowed = Self::default();
        allowed.collect(agent, false);
        allowed
    }

    fn collect(&mut self, agent: &Agent, recursive: bool) {
        for name in agent.tools().names() {
            if name != agent.name() {
                self.names.insert(name.to_string());
            }
        }
        if recursive {
            for sub_agent in agent.sub_agents() {
                self.collect(sub_agent, true);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for AllowedTools {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::new(iter)
    }
}
