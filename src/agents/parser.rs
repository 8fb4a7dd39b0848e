//! Parsing of ReAct-style model replies into actions and final answers.
//!
//! The executor expects each model turn to end in one of two shapes:
//!
//! ```text
//! Thought: I should look this up
//! Action: limited_search
//! Action Input: {"query": "rust ownership"}
//! ```
//!
//! ```text
//! Thought: I have enough information
//! Final Answer: Ownership is ...
//! ```
//!
//! Anything else yields a [`ParseError`] whose message is written to be fed
//! back to the model as a corrective observation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Marker that switches a reply from action mode to answer mode.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION_WITH_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.+?)\s*(?:\n|\r\n?)Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .unwrap()
});
static ACTION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Action\s*\d*\s*:").unwrap());
static ACTION_INPUT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Action\s*\d*\s*Input\s*\d*\s*:").unwrap());

const MISSING_ACTION_FEEDBACK: &str = "I could not find an Action after the Thought.\n\
     You MUST use one of these formats:\n\
     Thought: [your reasoning]\n\
     Action: [tool name]\n\
     Action Input: [tool input]\n\
     or\n\
     Thought: [your reasoning]\n\
     Final Answer: [your complete answer]";

const MISSING_ACTION_INPUT_FEEDBACK: &str = "I found an Action but no Action Input right after it.\n\
     After the Action line you MUST provide:\n\
     Action Input: [tool input]";

// ---------------------------------------------------------------------------
// Parsed shapes
// ---------------------------------------------------------------------------

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    /// Reasoning preceding the action, with the `Thought:` label stripped.
    pub thought: String,
    /// Tool name as the model wrote it. Matching normalizes separately.
    pub tool: String,
    /// Tool input after quote/backtick cleanup and JSON repair.
    pub tool_input: String,
    /// The raw reply the action was parsed from.
    pub text: String,
}

/// A completed task answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFinish {
    /// Reasoning preceding the answer, with the `Thought:` label stripped.
    pub thought: String,
    /// Everything after the last `Final Answer:` marker.
    pub output: String,
    /// The raw reply the answer was parsed from.
    pub text: String,
}

/// Outcome of parsing one model reply.
#[derive(Debug, Clone)]
pub enum ParseResult {
    /// The model wants to run a tool.
    Action(AgentAction),
    /// The model produced its final answer.
    Finish(AgentFinish),
}

/// Reply did not match either expected shape.
///
/// `feedback` is phrased as an observation the executor can hand back to the
/// model so the next turn self-corrects.
#[derive(Debug, Clone, Error)]
#[error("{feedback}")]
pub struct ParseError {
    pub feedback: String,
}

impl ParseError {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse function
// ---------------------------------------------------------------------------

/// Parse one model reply into an action or a final answer.
///
/// A reply containing `Final Answer:` finishes the task even if an action
/// block also appears. Models that emit both usually intend the answer, and
/// honoring it avoids burning an extra tool call.
///
/// # Errors
/// Returns [`ParseError`] when neither shape is present; the message tells
/// the model which part was missing and restates the expected format.
pub fn parse(text: &str) -> Result<ParseResult, ParseError> {
    let thought = extract_thought(text);

    if text.contains(FINAL_ANSWER_MARKER) {
        let answer = text.rsplit(FINAL_ANSWER_MARKER).next().unwrap_or("").trim();
        let answer = clean_trailing_backticks(answer);
        return Ok(ParseResult::Finish(AgentFinish {
            thought,
            output: answer,
            text: text.to_string(),
        }));
    }

    if let Some(caps) = ACTION_WITH_INPUT.captures(text) {
        let tool = clean_action(caps.get(1).map_or("", |m| m.as_str()));
        let raw_input = caps.get(2).map_or("", |m| m.as_str()).trim();
        let raw_input = clean_trailing_backticks(raw_input.trim_matches('"'));
        let tool_input = safe_repair_json(&raw_input);
        return Ok(ParseResult::Action(AgentAction {
            thought,
            tool,
            tool_input,
            text: text.to_string(),
        }));
    }

    if !ACTION_LINE.is_match(text) {
        return Err(ParseError::new(MISSING_ACTION_FEEDBACK));
    }
    if !ACTION_INPUT_LINE.is_match(text) {
        return Err(ParseError::new(MISSING_ACTION_INPUT_FEEDBACK));
    }
    Err(ParseError::new(
        "I could not parse that reply. Please use the exact Thought/Action/Action Input format.",
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text before the first `Action`/`Final Answer` line, labels and code fences
/// removed.
fn extract_thought(text: &str) -> String {
    let cut = text.find("\nAction").or_else(|| text.find("\nFinal Answer"));
    let head = match cut {
        Some(idx) => &text[..idx],
        None => return String::new(),
    };
    let head = head.replace("```", "");
    let head = head.trim();
    head.strip_prefix("Thought:").unwrap_or(head).trim().to_string()
}

/// Strip markdown emphasis the model sometimes wraps tool names in.
fn clean_action(text: &str) -> String {
    text.trim().trim_matches('*').trim().to_string()
}

/// Drop an unmatched trailing ``` fence, keeping balanced ones intact.
fn clean_trailing_backticks(text: &str) -> String {
    if text.ends_with("```") && text.matches("```").count() % 2 != 0 {
        text[..text.len() - 3].trim_end().to_string()
    } else {
        text.to_string()
    }
}

/// Best-effort repair of near-JSON tool input.
///
/// Collapses triple quotes and keeps the repair only when the result parses;
/// array inputs and plain text pass through untouched.
fn safe_repair_json(tool_input: &str) -> String {
    if tool_input.starts_with('[') && tool_input.ends_with(']') {
        return tool_input.to_string();
    }
    let cleaned = tool_input.replace("\"\"\"", "\"");
    if cleaned != tool_input && serde_json::from_str::<Value>(&cleaned).is_ok() {
        return cleaned;
    }
    tool_input.to_string()
}
