//! Pure classification of a single response fragment.
//!
//! Nothing here mutates state; the caller applies the [`Decision`] and the
//! optional finish override.

use serde_json::{Map, Value};

use crate::allowed::AllowedTools;
use crate::conversation::Fragment;
use crate::model::FinishSignal;
use crate::tool::{ToolCall, ToolResultEnvelope};

/// Pseudo tool names meaning "this is my final answer".
pub const FINALIZE_TOOL_NAMES: &[&str] = &[
    "final_answer",
    "finalize",
    "final_response",
    "final",
    "answer",
];

/// Argument keys searched, in order, for a finalize call's text.
const FINAL_TEXT_KEYS: [&str; 4] = ["text", "response", "message", "content"];

/// What to do with one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Keep the fragment exactly as it is.
    PassThrough,
    /// Replace text with the structured call it spelled out.
    Recovered(ToolCall),
    /// Replace with the model's final answer.
    FinalAnswer(String),
    /// Replace with a tool-result summary and remember it.
    ToolResultText(String),
    /// Replace with an explanation of why nothing was executed.
    Diagnostic(String),
    /// Remove the fragment.
    Suppressed,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::PassThrough => "pass_through",
            Decision::Recovered(_) => "recovered",
            Decision::FinalAnswer(_) => "final_answer",
            Decision::ToolResultText(_) => "tool_result_text",
            Decision::Diagnostic(_) => "diagnostic",
            Decision::Suppressed => "suppressed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub decision: Decision,
    /// `Some(Stop)` when the turn must end after this response.
    pub finish: Option<FinishSignal>,
}

impl Classification {
    fn keep() -> Self {
        Self {
            decision: Decision::PassThrough,
            finish: None,
        }
    }

    fn stop(decision: Decision) -> Self {
        Self {
            decision,
            finish: Some(FinishSignal::Stop),
        }
    }
}

pub fn is_finalize_name(name: &str) -> bool {
    FINALIZE_TOOL_NAMES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Classify one inbound fragment.
///
/// With an empty allow-list nothing is classified at all.
pub fn classify(
    fragment: &Fragment,
    allowed: &AllowedTools,
    last_tool_result: Option<&str>,
) -> Classification {
    if allowed.is_empty() {
        return Classification::keep();
    }
    match fragment {
        Fragment::ToolCall(call) => {
            classify_call(&call.name, &call.arguments, allowed, last_tool_result)
        }
        Fragment::ToolResult(envelope) => {
            if allowed.contains(&envelope.name) {
                Classification::stop(Decision::ToolResultText(summarize_tool_result(envelope)))
            } else {
                Classification {
                    decision: Decision::Suppressed,
                    finish: None,
                }
            }
        }
        Fragment::Text(text) => classify_text(text, allowed, last_tool_result),
    }
}

fn classify_call(
    name: &str,
    arguments: &Map<String, Value>,
    allowed: &AllowedTools,
    last_tool_result: Option<&str>,
) -> Classification {
    if is_finalize_name(name) {
        if let Some(text) = extract_final_text(arguments) {
            return Classification::stop(Decision::FinalAnswer(text));
        }
        if !arguments.is_empty() {
            return Classification::stop(Decision::FinalAnswer(compact(arguments)));
        }
        if let Some(cached) = last_tool_result.filter(|text| !text.is_empty()) {
            return Classification::stop(Decision::FinalAnswer(cached.to_string()));
        }
        return unsupported(name);
    }
    if !allowed.contains(name) {
        return unsupported(name);
    }
    Classification::keep()
}

/// Text that spells out a call as a JSON object is treated like the call.
fn classify_text(
    text: &str,
    allowed: &AllowedTools,
    last_tool_result: Option<&str>,
) -> Classification {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return Classification::keep();
    }
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(trimmed) else {
        return Classification::keep();
    };
    let Some(Value::String(name)) = object.remove("name") else {
        return Classification::keep();
    };

    let raw_arguments = match object.remove("arguments") {
        Some(value) => Some(value),
        None => object.remove("parameters"),
    };
    let arguments = match raw_arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments,
        Some(_) => {
            return Classification::stop(Decision::Diagnostic(format!(
                "malformed tool arguments for '{name}'; ignoring them"
            )));
        }
    };

    let classification = classify_call(&name, &arguments, allowed, last_tool_result);
    match classification.decision {
        Decision::PassThrough => Classification {
            decision: Decision::Recovered(ToolCall::new(name, arguments)),
            finish: None,
        },
        _ => classification,
    }
}

fn unsupported(name: &str) -> Classification {
    Classification::stop(Decision::Diagnostic(format!(
        "unsupported tool call ignored: '{name}'"
    )))
}

/// First usable value among the finalize text keys.
fn extract_final_text(arguments: &Map<String, Value>) -> Option<String> {
    FINAL_TEXT_KEYS
        .iter()
        .filter_map(|key| arguments.get(*key))
        .find_map(|value| {
            let text = match value {
                Value::Null => return None,
                Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(" "),
                other => value_text(other),
            };
            (!text.is_empty()).then_some(text)
        })
}

/// Textual form of a tool result, shared by the inbound and outbound paths.
pub fn summarize_tool_result(envelope: &ToolResultEnvelope) -> String {
    let payload = match &envelope.result {
        None | Some(Value::Null) => return format!("{} completed.", envelope.name),
        Some(Value::Object(map)) => match map.get("output").or_else(|| map.get("result")) {
            Some(value) => value_text(value),
            None => compact(map),
        },
        Some(other) => value_text(other),
    };
    format!("{} result: {}", envelope.name, payload)
}

/// Strings as-is, everything else as compact JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compact(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}
