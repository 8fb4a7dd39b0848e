//! Task execution loop for a single agent.
//!
//! Drives the Thought/Action/Observation cycle: call the model, parse the
//! reply, run the requested tool, feed the result back, until the model
//! produces a final answer or the iteration cap is hit. Parse failures are
//! not fatal; the parser's feedback goes back to the model as an observation
//! so the next turn can self-correct.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use super::parser::{self, AgentAction, AgentFinish, ParseResult};
use crate::llm::{ChatModel, LLMMessage, LlmError};
use crate::tools::{lock_tool, tool_names, SharedTool};
use crate::utilities::{sanitize_tool_name, Logger, PrinterColor};

/// Iteration cap applied when an agent does not configure one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// Failures that end a task without a final answer.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("agent exceeded maximum iterations ({0}) without a final answer")]
    MaxIterations(u32),
    #[error(transparent)]
    Model(#[from] LlmError),
}

/// One agent working one task against a chat model.
///
/// Borrows the model and the tool set; conversation state lives here so the
/// agent itself stays immutable during execution.
pub struct AgentExecutor<'a> {
    model: &'a dyn ChatModel,
    tools: &'a [SharedTool],
    max_iterations: u32,
    logger: Logger,
    messages: Vec<LLMMessage>,
    iterations: u32,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        tools: &'a [SharedTool],
        max_iterations: u32,
        verbose: bool,
    ) -> Self {
        Self {
            model,
            tools,
            max_iterations,
            logger: Logger::new(verbose),
            messages: Vec::new(),
            iterations: 0,
        }
    }

    /// Run the loop for one task.
    ///
    /// `system` carries the role framing and format contract, `user` the
    /// interpolated task text.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Model`] when the model call fails and
    /// [`ExecutorError::MaxIterations`] when the cap is reached first.
    pub fn invoke(&mut self, system: &str, user: &str) -> Result<AgentFinish, ExecutorError> {
        self.messages.clear();
        self.messages.push(LLMMessage::system(system));
        self.messages.push(LLMMessage::user(user));
        self.iterations = 0;
        self.invoke_loop()
    }

    fn invoke_loop(&mut self) -> Result<AgentFinish, ExecutorError> {
        loop {
            if self.iterations >= self.max_iterations {
                return Err(ExecutorError::MaxIterations(self.max_iterations));
            }
            self.iterations += 1;

            let reply = self.model.chat(&self.messages)?;
            log::debug!("model reply (turn {}): {} chars", self.iterations, reply.len());
            self.messages.push(LLMMessage::assistant(reply.clone()));

            match parser::parse(&reply) {
                Ok(ParseResult::Finish(finish)) => {
                    self.logger
                        .log("info", "Agent reached a final answer", Some(PrinterColor::Green));
                    return Ok(finish);
                }
                Ok(ParseResult::Action(action)) => {
                    let (observation, is_answer) = self.execute_action(&action);
                    if is_answer {
                        return Ok(AgentFinish {
                            thought: action.thought,
                            output: observation,
                            text: reply,
                        });
                    }
                    self.observe(&observation);
                }
                Err(parse_error) => {
                    log::debug!("unparseable reply on turn {}", self.iterations);
                    self.observe(&parse_error.feedback);
                }
            }
        }
    }

    /// Run the requested tool and render its result as an observation.
    ///
    /// Returns the observation text and whether the tool declared its result
    /// to be the final answer. Unknown tools and tool failures produce
    /// explanatory observations, never errors; the model decides what to do
    /// with them.
    fn execute_action(&self, action: &AgentAction) -> (String, bool) {
        let wanted = sanitize_tool_name(&action.tool);
        let tool = self
            .tools
            .iter()
            .find(|t| sanitize_tool_name(lock_tool(t).name()) == wanted);

        let Some(tool) = tool else {
            let names = tool_names(self.tools).join(", ");
            return (
                format!(
                    "Tool '{}' does not exist. Available tools: [{}]. \
                     Use the exact tool name from the list.",
                    action.tool, names
                ),
                false,
            );
        };

        let args = parse_tool_input(&action.tool_input);
        let mut guard = lock_tool(tool);
        self.logger.log(
            "info",
            &format!("Using tool: {}", guard.name()),
            Some(PrinterColor::Yellow),
        );

        let observation = match guard.run(args) {
            Ok(Value::String(text)) => text,
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            Err(e) => format!("Tool '{}' failed: {}", guard.name(), e),
        };
        (observation, guard.result_as_answer())
    }

    fn observe(&mut self, observation: &str) {
        self.messages
            .push(LLMMessage::user(format!("Observation: {}", observation)));
    }
}

/// Interpret the raw action input.
///
/// A JSON object becomes the tool's argument map; anything else is passed
/// through as a `query` argument, which every builtin tool accepts as its
/// primary input.
pub fn parse_tool_input(raw: &str) -> HashMap<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return map.into_iter().collect();
    }
    let mut args = HashMap::new();
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        args.insert("query".to_string(), Value::String(trimmed.to_string()));
    }
    args
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::tools::base_tool::{shared, BaseTool, ToolResult};

    /// Scripted model: returns replies in order, then repeats the last one.
    #[derive(Debug)]
    struct ScriptedModel {
        replies: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChatModel for ScriptedModel {
        fn chat(&self, _messages: &[LLMMessage]) -> Result<String, LlmError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .get(idx)
                .or_else(|| self.replies.last())
                .cloned()
                .unwrap_or_default();
            Ok(reply)
        }
    }

    #[derive(Debug)]
    struct RecordingTool {
        uses: u32,
        last_query: Option<String>,
        as_answer: bool,
    }

    impl RecordingTool {
        fn new() -> Self {
            Self {
                uses: 0,
                last_query: None,
                as_answer: false,
            }
        }
    }

    #[async_trait]
    impl BaseTool for RecordingTool {
        fn name(&self) -> &str {
            "recording_tool"
        }

        fn description(&self) -> &str {
            "Records what it was asked"
        }

        fn result_as_answer(&self) -> bool {
            self.as_answer
        }

        fn current_usage_count(&self) -> u32 {
            self.uses
        }

        fn increment_usage_count(&mut self) {
            self.uses += 1;
        }

        fn reset_usage_count(&mut self) {
            self.uses = 0;
        }

        fn run(&mut self, args: HashMap<String, Value>) -> ToolResult {
            self.increment_usage_count();
            self.last_query = args
                .get("query")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            Ok(Value::String(format!("observed #{}", self.uses)))
        }
    }

    #[test]
    fn test_direct_final_answer() {
        let model = ScriptedModel::new(&["Thought: easy\nFinal Answer: done"]);
        let mut executor = AgentExecutor::new(&model, &[], 5, false);
        let finish = executor.invoke("system", "user").unwrap();
        assert_eq!(finish.output, "done");
        assert_eq!(model.call_count(), 1);
    }

    #[test]
    fn test_action_then_final_answer() {
        let model = ScriptedModel::new(&[
            "Thought: look it up\nAction: recording_tool\nAction Input: rust borrowing",
            "Thought: got it\nFinal Answer: borrowing explained",
        ]);
        let tools = vec![shared(RecordingTool::new())];
        let mut executor = AgentExecutor::new(&model, &tools, 5, false);
        let finish = executor.invoke("system", "user").unwrap();
        assert_eq!(finish.output, "borrowing explained");
        assert_eq!(model.call_count(), 2);
        let guard = lock_tool(&tools[0]);
        assert_eq!(guard.current_usage_count(), 1);
    }

    #[test]
    fn test_unknown_tool_feeds_back_and_recovers() {
        let model = ScriptedModel::new(&[
            "Thought: hm\nAction: no_such_tool\nAction Input: x",
            "Thought: ok\nFinal Answer: recovered",
        ]);
        let tools = vec![shared(RecordingTool::new())];
        let mut executor = AgentExecutor::new(&model, &tools, 5, false);
        let finish = executor.invoke("system", "user").unwrap();
        assert_eq!(finish.output, "recovered");
        // the wrong tool never ran
        assert_eq!(lock_tool(&tools[0]).current_usage_count(), 0);
    }

    #[test]
    fn test_parse_error_feeds_back_and_recovers() {
        let model = ScriptedModel::new(&[
            "I will just ramble without any format",
            "Thought: right\nFinal Answer: formatted now",
        ]);
        let mut executor = AgentExecutor::new(&model, &[], 5, false);
        let finish = executor.invoke("system", "user").unwrap();
        assert_eq!(finish.output, "formatted now");
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn test_iteration_cap() {
        let model =
            ScriptedModel::new(&["Thought: loop\nAction: recording_tool\nAction Input: again"]);
        let tools = vec![shared(RecordingTool::new())];
        let mut executor = AgentExecutor::new(&model, &tools, 3, false);
        let err = executor.invoke("system", "user").unwrap_err();
        assert!(matches!(err, ExecutorError::MaxIterations(3)));
        assert_eq!(model.call_count(), 3);
    }

    #[test]
    fn test_result_as_answer_short_circuits() {
        let model = ScriptedModel::new(&[
            "Thought: fetch\nAction: recording_tool\nAction Input: q",
            "Thought: should never be reached\nFinal Answer: nope",
        ]);
        let mut tool = RecordingTool::new();
        tool.as_answer = true;
        let tools = vec![shared(tool)];
        let mut executor = AgentExecutor::new(&model, &tools, 5, false);
        let finish = executor.invoke("system", "user").unwrap();
        assert_eq!(finish.output, "observed #1");
        assert_eq!(model.call_count(), 1);
    }

    #[test]
    fn test_json_object_input_becomes_args() {
        let model = ScriptedModel::new(&[
            "Thought: t\nAction: recording_tool\nAction Input: {\"query\": \"from json\"}",
            "Thought: t\nFinal Answer: ok",
        ]);
        let concrete = std::sync::Arc::new(std::sync::Mutex::new(RecordingTool::new()));
        let tools: Vec<SharedTool> = vec![concrete.clone()];
        let mut executor = AgentExecutor::new(&model, &tools, 5, false);
        executor.invoke("system", "user").unwrap();
        let recorded = concrete.lock().unwrap().last_query.clone();
        assert_eq!(recorded.as_deref(), Some("from json"));
    }

    #[test]
    fn test_plain_text_input_becomes_query() {
        let args = parse_tool_input("just some text");
        assert_eq!(args.get("query").unwrap(), &Value::String("just some text".into()));
        assert!(parse_tool_input("   ").is_empty());
    }
}
