//! Outbound rewrite: the chat protocol has no tool-result turn, so prior
//! results travel to the model as text.

use crate::allowed::AllowedTools;
use crate::conversation::{Fragment, Turn};
use crate::session::SessionState;

use super::classify::summarize_tool_result;

/// What happened to one tool-result envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten { tool: String },
    Dropped { tool: String },
}

/// Rewrite every tool-result envelope in `turns`.
///
/// Allowed results become text and refresh the cache; the rest are dropped.
/// A turn emptied by dropping is removed. Calls and text are left alone.
pub fn rewrite_tool_results(
    turns: &mut Vec<Turn>,
    allowed: &AllowedTools,
    state: &mut SessionState,
) -> Vec<RewriteOutcome> {
    let mut outcomes = Vec::new();
    if allowed.is_empty() {
        return outcomes;
    }

    turns.retain_mut(|turn| {
        let had_fragments = !turn.fragments.is_empty();
        let fragments = std::mem::take(&mut turn.fragments);
        for fragment in fragments {
            match fragment {
                Fragment::ToolResult(envelope) if allowed.contains(&envelope.name) => {
                    let text = summarize_tool_result(&envelope);
                    state.remember_tool_result(text.clone());
                    turn.fragments.push(Fragment::Text(text));
                    outcomes.push(RewriteOutcome::Rewritten {
                        tool: envelope.name,
                    });
                }
                Fragment::ToolResult(envelope) => {
                    outcomes.push(RewriteOutcome::Dropped {
                        tool: envelope.name,
                    });
                }
                other => turn.fragments.push(other),
            }
        }
        !(had_fragments && turn.fragments.is_empty())
    });

    outcomes
}
