//! Scenario tests for the normalizer as the runtime drives it.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::*;
use crate::agent::Agent;
use crate::conversation::Turn;
use crate::hooks::recording::RecordingHook;
use crate::session::SessionState;
use crate::tool::{EchoTool, ToolCall, ToolResultEnvelope};
use crate::tools::CalcTool;

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn calc_only() -> ToolCallNormalizer {
    ToolCallNormalizer::new(Some(AllowedTools::new(["calc"])))
}

/// Run the inbound callback over `fragments` and return the response.
fn inbound(
    normalizer: &ToolCallNormalizer,
    agent: &Agent,
    state: &mut SessionState,
    fragments: Vec<Fragment>,
) -> ModelResponse {
    let mut ctx = CallbackContext {
        agent,
        session_id: "s1",
        user_id: "u1",
        request_id: "r1",
        state,
    };
    let mut response = ModelResponse::new(fragments, FinishSignal::Continue);
    normalizer.after_model(&mut ctx, &mut response);
    response
}

#[test]
fn test_text_call_is_recovered() {
    let agent = Agent::new("root", "");
    let mut state = SessionState::default();
    let response = inbound(
        &calc_only(),
        &agent,
        &mut state,
        vec![Fragment::text(
            r#"{"name": "calc", "arguments": {"expression": "2+2"}}"#,
        )],
    );

    assert_eq!(
        response.fragments,
        vec![Fragment::ToolCall(ToolCall::new(
            "calc",
            args(json!({"expression": "2+2"}))
        ))]
    );
    assert_eq!(response.finish, FinishSignal::Continue);
    assert!(!response.turn_complete);
}

#[test]
fn test_unknown_structured_call_stops_turn() {
    let agent = Agent::new("root", "");
    let mut state = SessionState::default();
    let response = inbound(
        &calc_only(),
        &agent,
        &mut state,
        vec![Fragment::ToolCall(ToolCall::new("unknown_tool", Map::new()))],
    );

    assert_eq!(response.fragments.len(), 1);
    let text = response.fragments[0].as_text().unwrap();
    assert!(text.contains("unsupported tool call"));
    assert!(text.contains("'unknown_tool'"));
    assert_eq!(response.finish, FinishSignal::Stop);
    assert!(response.turn_complete);
}

#[test]
fn test_empty_allow_list_is_identity() {
    let agent = Agent::new("root", "");
    let normalizer = ToolCallNormalizer::new(Some(AllowedTools::default()));
    let fragments = vec![
        Fragment::text(r#"{"name": "calc", "arguments": {}}"#),
        Fragment::ToolCall(ToolCall::new("unknown_tool", Map::new())),
        Fragment::ToolResult(ToolResultEnvelope::new("calc", None)),
    ];
    let mut state = SessionState::default();

    let response = inbound(&normalizer, &agent, &mut state, fragments.clone());

    assert_eq!(response.fragments, fragments);
    assert_eq!(response.finish, FinishSignal::Continue);
    assert!(!response.turn_complete);

    let mut request = ModelRequest {
        turns: vec![Turn::user(vec![Fragment::ToolResult(ToolResultEnvelope::new(
            "calc",
            Some(json!({"output": "4"})),
        ))])],
        ..Default::default()
    };
    let before = request.turns.clone();
    let mut ctx = CallbackContext {
        agent: &agent,
        session_id: "s1",
        user_id: "u1",
        request_id: "r1",
        state: &mut state,
    };
    normalizer.before_model(&mut ctx, &mut request);
    assert_eq!(request.turns, before);
}

#[test]
fn test_outbound_rewrite_updates_cache() {
    let agent = Agent::new("root", "");
    let mut state = SessionState::default();
    let mut request = ModelRequest {
        turns: vec![Turn::user(vec![Fragment::ToolResult(ToolResultEnvelope::new(
            "calc",
            Some(json!({"output": "4"})),
        ))])],
        ..Default::default()
    };
    let mut ctx = CallbackContext {
        agent: &agent,
        session_id: "s1",
        user_id: "u1",
        request_id: "r1",
        state: &mut state,
    };

    calc_only().before_model(&mut ctx, &mut request);

    assert_eq!(request.turns, vec![Turn::user(vec![Fragment::text("calc result: 4")])]);
    assert_eq!(state.last_tool_result(), Some("calc result: 4"));
}

#[test]
fn test_finalize_text_for_any_allow_list() {
    let agent = Agent::new("root", "");
    for allowed in [
        AllowedTools::new(["calc"]),
        AllowedTools::new(["http_get", "weather_lookup"]),
        AllowedTools::new(["final_answer"]),
    ] {
        let mut state = SessionState::default();
        let response = inbound(
            &ToolCallNormalizer::new(Some(allowed)),
            &agent,
            &mut state,
            vec![Fragment::ToolCall(ToolCall::new(
                "final_answer",
                args(json!({"text": "X"})),
            ))],
        );
        assert_eq!(response.fragments, vec![Fragment::text("X")]);
        assert_eq!(response.finish, FinishSignal::Stop);
    }
}

#[test]
fn test_empty_finalize_reproduces_cached_result() {
    let agent = Agent::new("root", "");
    let normalizer = calc_only();
    let mut state = SessionState::default();
    state.remember_tool_result("calc result: 24".to_string());

    let response = inbound(
        &normalizer,
        &agent,
        &mut state,
        vec![Fragment::ToolCall(ToolCall::new("finalize", Map::new()))],
    );

    assert_eq!(response.fragments, vec![Fragment::text("calc result: 24")]);
    assert!(response.turn_complete);
}

#[test]
fn test_echoed_result_feeds_later_finalize() {
    let agent = Agent::new("root", "");
    let mut state = SessionState::default();
    let response = inbound(
        &calc_only(),
        &agent,
        &mut state,
        vec![
            Fragment::ToolResult(ToolResultEnvelope::new("calc", Some(json!({"result": "7"})))),
            Fragment::ToolResult(ToolResultEnvelope::new("shell", Some(json!("x")))),
            Fragment::ToolCall(ToolCall::new("final_answer", Map::new())),
        ],
    );

    assert_eq!(
        response.fragments,
        vec![Fragment::text("calc result: 7"), Fragment::text("calc result: 7")]
    );
    assert_eq!(state.last_tool_result(), Some("calc result: 7"));
    assert_eq!(response.finish, FinishSignal::Stop);
}

#[test]
fn test_broken_json_prose_is_byte_identical() {
    let agent = Agent::new("root", "");
    let prose = "  {\"name\": \"calc\", \"arguments\": {\"expression\": \"2+2\"}  \n";
    let mut state = SessionState::default();
    let response = inbound(
        &calc_only(),
        &agent,
        &mut state,
        vec![Fragment::text(prose)],
    );
    assert_eq!(response.fragments, vec![Fragment::text(prose)]);
    assert!(!response.turn_complete);
}

#[test]
fn test_prose_is_idempotent() {
    let agent = Agent::new("root", "");
    let normalizer = calc_only();
    let input = vec![
        Fragment::text("The result is 24."),
        Fragment::text("{ not json"),
        Fragment::ToolCall(ToolCall::new("calc", args(json!({"expression": "1"})))),
    ];
    let mut state = SessionState::default();

    let first = inbound(&normalizer, &agent, &mut state, input.clone());
    let second = inbound(&normalizer, &agent, &mut state, first.fragments.clone());

    assert_eq!(first.fragments, input);
    assert_eq!(second, first);
}

#[test]
fn test_mixed_response_keeps_order() {
    let agent = Agent::new("root", "");
    let mut state = SessionState::default();
    let response = inbound(
        &calc_only(),
        &agent,
        &mut state,
        vec![
            Fragment::text("Computing."),
            Fragment::ToolCall(ToolCall::new("calc", args(json!({"expression": "3*3"})))),
            Fragment::ToolCall(ToolCall::new("shell", Map::new())),
        ],
    );

    assert_eq!(response.fragments.len(), 3);
    assert_eq!(response.fragments[0], Fragment::text("Computing."));
    assert!(response.fragments[1].as_tool_call().is_some());
    assert!(response.fragments[2]
        .as_text()
        .is_some_and(|t| t.contains("'shell'")));
    assert_eq!(response.finish, FinishSignal::Stop);
}

#[test]
fn test_dynamic_mode_uses_active_agent() {
    let root = Agent::new("root", "").with_tool(CalcTool).unwrap();
    let normalizer = ToolCallNormalizer::dynamic();
    let mut state = SessionState::default();

    let response = inbound(
        &normalizer,
        &root,
        &mut state,
        vec![Fragment::ToolCall(ToolCall::new("echo", Map::new()))],
    );
    assert!(response.turn_complete);

    let echo_agent = Agent::new("helper", "").with_tool(EchoTool).unwrap();
    let response = inbound(
        &normalizer,
        &echo_agent,
        &mut state,
        vec![Fragment::ToolCall(ToolCall::new("echo", Map::new()))],
    );
    assert!(!response.turn_complete);
    assert!(response.fragments[0].as_tool_call().is_some());
}

#[test]
fn test_dynamic_mode_without_tools_is_noop() {
    let bare = Agent::new("bare", "");
    let normalizer = ToolCallNormalizer::dynamic();
    let fragments = vec![Fragment::ToolCall(ToolCall::new("anything", Map::new()))];
    let mut state = SessionState::default();

    let response = inbound(&normalizer, &bare, &mut state, fragments.clone());
    assert_eq!(response.fragments, fragments);
    assert!(!response.turn_complete);
}

#[test]
fn test_static_tree_allows_sub_agent_tools() {
    let weather = Agent::new("weather", "").with_tool(EchoTool).unwrap();
    let root = Agent::new("root", "")
        .with_tool(CalcTool)
        .unwrap()
        .with_sub_agent(weather);
    let normalizer = ToolCallNormalizer::for_agent_tree(&root);
    let mut state = SessionState::default();

    let response = inbound(
        &normalizer,
        &root,
        &mut state,
        vec![Fragment::ToolCall(ToolCall::new("echo", Map::new()))],
    );
    assert!(!response.turn_complete);
}

#[test]
fn test_hook_sees_every_decision_without_changing_outcome() {
    let agent = Agent::new("root", "");
    let hook = Arc::new(RecordingHook::new());
    let observed = calc_only().with_hook(hook.clone());
    let fragments = vec![
        Fragment::text("hello"),
        Fragment::text(r#"{"name": "calc", "arguments": {"expression": "1"}}"#),
        Fragment::ToolResult(ToolResultEnvelope::new("shell", None)),
        Fragment::ToolCall(ToolCall::new("bogus", Map::new())),
    ];

    let mut plain_state = SessionState::default();
    let mut observed_state = SessionState::default();
    let plain = inbound(&calc_only(), &agent, &mut plain_state, fragments.clone());
    let with_hook = inbound(&observed, &agent, &mut observed_state, fragments);

    assert_eq!(plain, with_hook);
    assert_eq!(
        hook.events(),
        vec![
            "classified:0:pass_through",
            "classified:1:recovered",
            "classified:2:suppressed",
            "classified:3:diagnostic",
        ]
    );
}

#[test]
fn test_request_offers_only_allowed_tools() {
    let weather = Agent::new("weather", "").with_tool(EchoTool).unwrap();
    let root = Agent::new("root", "")
        .with_tool(CalcTool)
        .unwrap()
        .with_sub_agent(weather);
    let mut request = ModelRequest {
        tools: root.tool_definitions(),
        ..Default::default()
    };
    let mut state = SessionState::default();
    let mut ctx = CallbackContext {
        agent: &root,
        session_id: "s1",
        user_id: "u1",
        request_id: "r1",
        state: &mut state,
    };

    ToolCallNormalizer::dynamic().before_model(&mut ctx, &mut request);

    let offered: Vec<&str> = request.tools.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(offered, vec!["calc"]);
}

#[test]
fn test_empty_allow_list_keeps_tool_definitions() {
    let root = Agent::new("root", "").with_tool(CalcTool).unwrap();
    let mut request = ModelRequest {
        tools: root.tool_definitions(),
        ..Default::default()
    };
    let mut state = SessionState::default();
    let mut ctx = CallbackContext {
        agent: &root,
        session_id: "s1",
        user_id: "u1",
        request_id: "r1",
        state: &mut state,
    };

    ToolCallNormalizer::new(Some(AllowedTools::default())).before_model(&mut ctx, &mut request);

    assert_eq!(request.tools.len(), 1);
}
