//! Agent definitions: a name, an instruction, the tools it may call and the
//! sub-agents it delegates to.

use std::collections::HashSet;
use std::sync::Arc;

use crate::registry::{RegistryError, ToolRegistry};
use crate::tool::{Nameable, Tool, ToolDefinition};

pub struct Agent {
    name: String,
    description: String,
    instruction: String,
    tools: ToolRegistry,
    sub_agents: Vec<Agent>,
}

impl Agent {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: instruction.into(),
            tools: ToolRegistry::new(),
            sub_agents: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a tool. The tool's name is resolved here, once.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Result<Self, RegistryError> {
        self.tools.register(tool)?;
        Ok(self)
    }

    pub fn with_shared_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, RegistryError> {
        self.tools.register_shared(tool)?;
        Ok(self)
    }

    pub fn with_sub_agent(mut self, agent: Agent) -> Self {
        self.sub_agents.push(agent);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn sub_agents(&self) -> &[Agent] {
        &self.sub_agents
    }

    /// Find a tool by name, searching this agent first and then its
    /// sub-agents depth first.
    pub fn find_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .or_else(|| self.sub_agents.iter().find_map(|a| a.find_tool(name)))
    }

    /// Definitions of every tool reachable from this agent, first occurrence wins.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut seen = HashSet::new();
        let mut defs = Vec::new();
        self.collect_definitions(&mut seen, &mut defs);
        defs
    }

    fn collect_definitions(&self, seen: &mut HashSet<String>, defs: &mut Vec<ToolDefinition>) {
        for def in self.tools.list() {
            if def.name != self.name && seen.insert(def.name.clone()) {
                defs.push(def);
            }
        }
        for agent in &self.sub_agents {
            agent.collect_definitions(seen, defs);
        }
    }
}

impl Nameable for Agent {
    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.names().collect::<Vec<_>>())
            .field("sub_agents", &self.sub_agents)
            .finish()
    }
}
