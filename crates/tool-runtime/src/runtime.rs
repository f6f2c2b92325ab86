use crate::agent::Agent;
use crate::conversation::{Fragment, Turn};
use crate::event::AgentEvent;
use crate::model::{ModelRequest, ModelResponse};
use crate::plugin::{CallbackContext, Plugin};
use crate::provider::{ModelError, ModelProvider};
use crate::session::{Session, SessionState};
use crate::tool::{Nameable, ToolCall, ToolContext, ToolResultEnvelope};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The core agentic loop that orchestrates model ↔ tool execution.
///
/// Flow: User → plugins → Model → plugins → ToolCalls → Execute → Results → ... → Final Text
pub struct AgenticLoop {
    provider: Arc<dyn ModelProvider>,
    agent: Arc<Agent>,
    plugins: Vec<Arc<dyn Plugin>>,
    max_iterations: usize,
}

/// Identifiers shared by every callback of one run.
struct RunIds {
    session_id: String,
    user_id: String,
    request_id: String,
}

impl RunIds {
    fn context<'a>(&'a self, agent: &'a Agent, state: &'a mut SessionState) -> CallbackContext<'a> {
        CallbackContext {
            agent,
            session_id: &self.session_id,
            user_id: &self.user_id,
            request_id: &self.request_id,
            state,
        }
    }
}

impl AgenticLoop {
    pub fn new(provider: Arc<dyn ModelProvider>, agent: Arc<Agent>) -> Self {
        Self {
            provider,
            agent,
            plugins: Vec::new(),
            max_iterations: 10,
        }
    }

    /// Plugins run in registration order.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run a single user turn through the agentic loop.
    /// Returns every committed turn as an event; the last one is final.
    pub async fn run(
        &self,
        session: &mut Session,
        user_message: String,
    ) -> Result<Vec<AgentEvent>, AgenticLoopError> {
        let ids = RunIds {
            session_id: session.id.clone(),
            user_id: session.user_id.clone(),
            request_id: uuid::Uuid::new_v4().to_string(),
        };
        let agent = self.agent.as_ref();
        let tool_context = ToolContext {
            session_id: ids.session_id.clone(),
            user_id: ids.user_id.clone(),
        };

        session.conversation.push(Turn::user_text(user_message));
        for plugin in &self.plugins {
            plugin.before_agent(&mut ids.context(agent, &mut session.state));
        }

        let mut events = Vec::new();
        for iteration in 0..self.max_iterations {
            debug!(iteration, agent = agent.name(), "Starting agentic loop iteration");

            let mut request = ModelRequest {
                system_prompt: Some(agent.instruction().to_string())
                    .filter(|instruction| !instruction.is_empty()),
                turns: session.conversation.turns().to_vec(),
                tools: agent.tool_definitions(),
            };
            for plugin in &self.plugins {
                plugin.before_model(&mut ids.context(agent, &mut session.state), &mut request);
            }

            let mut response = self.provider.generate(request).await?;

            for plugin in &self.plugins {
                plugin.after_model(&mut ids.context(agent, &mut session.state), &mut response);
            }
            assign_call_ids(&mut response);

            let calls: Vec<ToolCall> = response.tool_calls().cloned().collect();
            let is_final = response.turn_complete || calls.is_empty();
            if response.turn_complete && !calls.is_empty() {
                warn!(
                    count = calls.len(),
                    "Turn was force-stopped, skipping remaining tool calls"
                );
            }

            let turn = Turn::model(response.fragments);
            session.conversation.push(turn.clone());
            events.push(AgentEvent::model_turn(
                ids.request_id.as_str(),
                agent.name(),
                turn,
                response.finish,
                is_final,
            ));

            if is_final {
                info!(iteration, "Agentic loop complete");
                for plugin in &self.plugins {
                    plugin.after_agent(&mut ids.context(agent, &mut session.state));
                }
                return Ok(events);
            }

            info!(count = calls.len(), "Executing tool calls");
            let results = self.execute_tool_calls(calls, &tool_context).await;
            let turn = Turn::user(results.into_iter().map(Fragment::ToolResult).collect());
            session.conversation.push(turn.clone());
            events.push(AgentEvent::tool_results(ids.request_id.as_str(), turn));
        }

        warn!(max = self.max_iterations, "Agentic loop ran out of iterations");
        Err(AgenticLoopError::MaxIterations(self.max_iterations))
    }

    /// Execute calls concurrently; results keep the call order.
    async fn execute_tool_calls(
        &self,
        calls: Vec<ToolCall>,
        context: &ToolContext,
    ) -> Vec<ToolResultEnvelope> {
        let futures = calls.into_iter().map(|call| async move {
            let value = match self.agent.find_tool(&call.name) {
                Some(tool) => match tool.execute(call.arguments, context).await {
                    Ok(Value::Object(map)) => Value::Object(map),
                    Ok(other) => json!({ "result": other }),
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool failed");
                        json!({ "ok": false, "error": e.to_string() })
                    }
                },
                None => {
                    warn!(tool = %call.name, "Unknown tool");
                    json!({ "ok": false, "error": format!("unknown tool: {}", call.name) })
                }
            };
            ToolResultEnvelope {
                id: call.id,
                name: call.name,
                result: Some(value),
            }
        });
        join_all(futures).await
    }
}

/// Calls without an id get a fresh one so results can be matched up.
fn assign_call_ids(response: &mut ModelResponse) {
    for fragment in &mut response.fragments {
        if let Fragment::ToolCall(call) = fragment {
            if call.id.is_none() {
                call.id = Some(format!("call_{}", uuid::Uuid::new_v4().simple()));
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgenticLoopError {
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),
    #[error("Max iterations ({0}) exceeded")]
    MaxIterations(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowed::AllowedTools;
    use crate::bridge::ToolCallNormalizer;
    use crate::hooks::recording::RecordingHook;
    use crate::hooks::LoggerPlugin;
    use crate::model::FinishSignal;
    use crate::provider::mock::MockModelProvider;
    use crate::tool::EchoTool;
    use crate::tools::CalcTool;
    use serde_json::Map;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn setup_test_loop() -> (AgenticLoop, Arc<MockModelProvider>) {
        let provider = Arc::new(MockModelProvider::new());
        let agent = Agent::new("root", "You are a helpful assistant.")
            .with_tool(EchoTool)
            .unwrap()
            .with_tool(CalcTool)
            .unwrap();

        let agentic_loop = AgenticLoop::new(
            provider.clone() as Arc<dyn ModelProvider>,
            Arc::new(agent),
        );
        (agentic_loop, provider)
    }

    fn session() -> Session {
        Session::new("app", "u1", "s1")
    }

    #[tokio::test]
    async fn test_simple_text_response() {
        let (agentic_loop, provider) = setup_test_loop();
        provider.queue_text("Hello, I'm an AI assistant!");

        let mut session = session();
        let events = agentic_loop.run(&mut session, "Hello".to_string()).await.unwrap();

        assert_eq!(events.len(), 1);
        assert!(events[0].is_final_response());
        assert_eq!(events[0].author, "root");
        assert_eq!(session.conversation.len(), 2);

        let requests = provider.requests();
        assert_eq!(
            requests[0].system_prompt.as_deref(),
            Some("You are a helpful assistant.")
        );
        assert_eq!(requests[0].tools.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_call_and_response() {
        let (agentic_loop, provider) = setup_test_loop();
        provider.queue_response(ModelResponse::calls(vec![ToolCall::new(
            "echo",
            args(json!({"message": "test"})),
        )
        .with_id("call_1")]));
        provider.queue_text("Done!");

        let mut session = session();
        let events = agentic_loop
            .run(&mut session, "Echo test".to_string())
            .await
            .unwrap();

        // user, model (call), tool result, model (text)
        assert_eq!(session.conversation.len(), 4);
        assert_eq!(events.len(), 3);
        assert!(!events[0].is_final_response());
        assert_eq!(events[1].author, "tools");
        assert_eq!(events[2].text().as_deref(), Some("Done!"));

        let Fragment::ToolResult(envelope) = &session.conversation.turns()[2].fragments[0] else {
            panic!("expected a tool result");
        };
        assert_eq!(envelope.id.as_deref(), Some("call_1"));
        assert_eq!(envelope.result, Some(json!({"result": "test"})));

        // Second request carries the result envelope.
        assert_eq!(provider.requests()[1].turns.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_tool_error_become_results() {
        let (agentic_loop, provider) = setup_test_loop();
        provider.queue_response(ModelResponse::calls(vec![
            ToolCall::new("nope", Map::new()),
            ToolCall::new("calc", args(json!({"expression": "1/0"}))),
        ]));
        provider.queue_text("Sorry.");

        let mut session = session();
        agentic_loop.run(&mut session, "go".to_string()).await.unwrap();

        let results: Vec<&ToolResultEnvelope> = session.conversation.turns()[2]
            .fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::ToolResult(envelope) => Some(envelope),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].result,
            Some(json!({"ok": false, "error": "unknown tool: nope"}))
        );
        assert_eq!(
            results[1].result,
            Some(json!({"ok": false, "error": "Invalid input: division by zero"}))
        );
        assert!(results.iter().all(|r| r.id.is_some()));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let (agentic_loop, provider) = setup_test_loop();
        let agentic_loop = agentic_loop.with_max_iterations(2);
        for _ in 0..3 {
            provider.queue_response(ModelResponse::calls(vec![ToolCall::new(
                "echo",
                args(json!({"message": "again"})),
            )]));
        }

        let mut session = session();
        let err = agentic_loop
            .run(&mut session, "loop".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AgenticLoopError::MaxIterations(2)));
    }

    #[tokio::test]
    async fn test_text_call_is_recovered_and_executed() {
        let (agentic_loop, provider) = setup_test_loop();
        let normalizer = ToolCallNormalizer::new(Some(AllowedTools::new(["calc"])));
        let agentic_loop = agentic_loop
            .with_plugin(Arc::new(LoggerPlugin::new()))
            .with_plugin(Arc::new(normalizer));

        // Model answers with the call spelled out as text and signals stop.
        provider.queue_text(r#"{"name": "calc", "arguments": {"expression": "2*(5+7)"}}"#);
        provider.queue_response(ModelResponse::new(
            vec![Fragment::ToolCall(ToolCall::new("final_answer", Map::new()))],
            FinishSignal::Continue,
        ));

        let mut session = session();
        let events = agentic_loop
            .run(&mut session, "What is 2*(5+7)?".to_string())
            .await
            .unwrap();

        let last = events.last().unwrap();
        assert!(last.is_final_response());
        assert_eq!(last.text().as_deref(), Some("calc result: 24"));
        assert_eq!(session.state.last_tool_result(), Some("calc result: 24"));

        // The second request saw the result as text, not as an envelope.
        let second = &provider.requests()[1];
        assert_eq!(
            second.turns.last().unwrap(),
            &Turn::user(vec![Fragment::text("calc result: 24")])
        );
        // History keeps the envelope itself.
        assert!(matches!(
            session.conversation.turns()[2].fragments[0],
            Fragment::ToolResult(_)
        ));
    }

    #[tokio::test]
    async fn test_forced_stop_skips_calls() {
        let (agentic_loop, provider) = setup_test_loop();
        let hook = Arc::new(RecordingHook::new());
        let agentic_loop = agentic_loop.with_plugin(Arc::new(
            ToolCallNormalizer::new(Some(AllowedTools::new(["calc", "echo"])))
                .with_hook(hook.clone()),
        ));
        provider.queue_response(ModelResponse::calls(vec![
            ToolCall::new("echo", args(json!({"message": "hi"}))),
            ToolCall::new("shell", Map::new()),
        ]));

        let mut session = session();
        let events = agentic_loop
            .run(&mut session, "run something".to_string())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert!(events[0].is_final_response());
        assert_eq!(events[0].finish, Some(FinishSignal::Stop));
        assert!(events[0]
            .text()
            .is_some_and(|t| t.contains("unsupported tool call ignored: 'shell'")));
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(
            hook.events(),
            vec!["classified:0:pass_through", "classified:1:diagnostic"]
        );
    }

    #[tokio::test]
    async fn test_dynamic_mode_advertises_what_it_allows() {
        let provider = Arc::new(MockModelProvider::new());
        let weather = Agent::new("weather", "").with_tool(EchoTool).unwrap();
        let root = Agent::new("root", "")
            .with_tool(CalcTool)
            .unwrap()
            .with_sub_agent(weather);
        let agentic_loop = AgenticLoop::new(
            provider.clone() as Arc<dyn ModelProvider>,
            Arc::new(root),
        )
        .with_plugin(Arc::new(ToolCallNormalizer::dynamic()));
        provider.queue_response(ModelResponse::calls(vec![ToolCall::new(
            "calc",
            args(json!({"expression": "1+1"})),
        )]));
        provider.queue_text("2");

        let mut session = session();
        let events = agentic_loop.run(&mut session, "1+1?".to_string()).await.unwrap();

        let allowed = AllowedTools::from_active_agent(agentic_loop.agent());
        for request in provider.requests() {
            let offered: Vec<&str> = request.tools.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(offered, allowed.iter().collect::<Vec<_>>());
        }
        assert_eq!(events.last().unwrap().text().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_sessions_keep_separate_caches() {
        let (agentic_loop, provider) = setup_test_loop();
        let agentic_loop = agentic_loop.with_plugin(Arc::new(ToolCallNormalizer::new(Some(
            AllowedTools::new(["calc"]),
        ))));

        provider.queue_response(ModelResponse::calls(vec![ToolCall::new(
            "calc",
            args(json!({"expression": "2+2"})),
        )]));
        provider.queue_text("4");
        provider.queue_response(ModelResponse::calls(vec![ToolCall::new(
            "finalize",
            Map::new(),
        )]));

        let mut first = session();
        agentic_loop.run(&mut first, "2+2?".to_string()).await.unwrap();
        assert_eq!(first.state.last_tool_result(), Some("calc result: 4"));

        // A fresh session has no cached result, so an empty finalize is unsupported.
        let mut second = Session::new("app", "u2", "s2");
        let events = agentic_loop.run(&mut second, "done?".to_string()).await.unwrap();
        assert!(events[0]
            .text()
            .is_some_and(|t| t.contains("unsupported tool call ignored: 'finalize'")));
        assert_eq!(second.state.last_tool_result(), None);
    }
}
