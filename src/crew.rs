//! Sequential workflow over agents and tasks.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::agent::Agent;
use crate::agents::ExecutorError;
use crate::task::{Task, TaskOutput};
use crate::tools::lock_tool;
use crate::utilities::{Logger, PrinterColor};

/// Separator between previous task outputs in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Callback invoked after each task completes. Receives the task with its
/// output and timestamps filled in.
pub type TaskCallback = Box<dyn Fn(&Task) + Send + Sync>;

/// Failures that end a workflow run.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("input interpolation failed: {0}")]
    Interpolation(String),
    #[error("task '{0}' has no agent assigned")]
    UnassignedTask(String),
    #[error("no agent registered for role '{0}'")]
    UnknownAgent(String),
    #[error(transparent)]
    Execution(#[from] ExecutorError),
    #[error("no task produced any output")]
    EmptyOutput,
}

/// Result of a full workflow run.
#[derive(Debug, Clone)]
pub struct CrewOutput {
    /// The last non-empty task result.
    pub raw: String,
    /// Every task output, in execution order.
    pub tasks_output: Vec<TaskOutput>,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A group of agents working an ordered task list.
///
/// Tasks run strictly in order on the calling thread; each task sees the
/// accumulated outputs of the tasks before it as context.
pub struct Crew {
    /// Optional name, shown in progress output.
    pub name: Option<String>,
    /// Unique identifier for the crew instance.
    pub id: Uuid,
    /// Agents available to this crew, keyed by role at lookup time.
    pub agents: Vec<Agent>,
    /// Tasks in execution order.
    pub tasks: Vec<Task>,
    /// Print progress while working.
    pub verbose: bool,
    logger: Logger,
    task_callback: Option<TaskCallback>,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agents", &self.agents.len())
            .field("tasks", &self.tasks.len())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Crew {
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>) -> Self {
        Self {
            name: None,
            id: Uuid::new_v4(),
            agents,
            tasks,
            verbose: false,
            logger: Logger::new(false),
            task_callback: None,
        }
    }

    /// Enable or disable progress printing for the crew and its logger.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
        self.logger = Logger::new(verbose);
    }

    /// Register a callback invoked after each completed task.
    pub fn set_task_callback<F>(&mut self, callback: F)
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.task_callback = Some(Box::new(callback));
    }

    /// Run the workflow.
    ///
    /// Usage counters of every bound tool are reset first, so limits apply
    /// per run rather than per process. Inputs are then interpolated into
    /// tasks and agents, and tasks execute in order.
    ///
    /// # Errors
    /// Returns [`CrewError`] on unbound placeholders, unknown agent roles,
    /// model failures, or when no task produces output.
    pub fn kickoff(
        &mut self,
        inputs: Option<HashMap<String, String>>,
    ) -> Result<CrewOutput, CrewError> {
        self.reset_tool_usage();

        let inputs = inputs.unwrap_or_default();
        self.interpolate_inputs(&inputs)?;

        self.execute_tasks()
    }

    /// Reset usage counters on every tool bound to any agent.
    fn reset_tool_usage(&self) {
        let mut count = 0usize;
        for agent in &self.agents {
            for tool in &agent.tools {
                lock_tool(tool).reset_usage_count();
                count += 1;
            }
        }
        if count > 0 {
            log::debug!("reset usage counters on {} tool bindings", count);
        }
    }

    fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), CrewError> {
        for task in &mut self.tasks {
            task.interpolate_inputs(inputs)
                .map_err(CrewError::Interpolation)?;
        }
        for agent in &mut self.agents {
            agent
                .interpolate_inputs(inputs)
                .map_err(CrewError::Interpolation)?;
        }
        Ok(())
    }

    fn execute_tasks(&mut self) -> Result<CrewOutput, CrewError> {
        let total = self.tasks.len();
        let mut task_outputs: Vec<TaskOutput> = Vec::new();

        for (index, task) in self.tasks.iter_mut().enumerate() {
            let role = task
                .agent
                .clone()
                .ok_or_else(|| CrewError::UnassignedTask(task.description.clone()))?;
            let agent = self
                .agents
                .iter()
                .find(|a| a.role == role)
                .ok_or_else(|| CrewError::UnknownAgent(role.clone()))?;

            let context = if task_outputs.is_empty() {
                None
            } else {
                Some(
                    task_outputs
                        .iter()
                        .map(|o| o.raw.clone())
                        .collect::<Vec<String>>()
                        .join(CONTEXT_SEPARATOR),
                )
            };

            self.logger.log(
                "info",
                &format!("Task {}/{} started (agent: {})", index + 1, total, role),
                Some(PrinterColor::BoldBlue),
            );

            task.start_time = Some(Utc::now());
            let raw = agent.execute_task(&task.prompt(), context.as_deref())?;
            task.end_time = Some(Utc::now());

            let mut output = TaskOutput::new(task.description.clone(), role, raw);
            output.name = task.name.clone();
            output.expected_output = Some(task.expected_output.clone());
            task.output = Some(output.clone());

            self.logger.log(
                "info",
                &format!("Task {}/{} completed", index + 1, total),
                Some(PrinterColor::BoldGreen),
            );

            if let Some(ref callback) = self.task_callback {
                callback(task);
            }

            task_outputs.push(output);
        }

        Self::create_output(task_outputs)
    }

    fn create_output(task_outputs: Vec<TaskOutput>) -> Result<CrewOutput, CrewError> {
        let raw = task_outputs
            .iter()
            .rev()
            .find(|o| !o.raw.is_empty())
            .map(|o| o.raw.clone())
            .ok_or(CrewError::EmptyOutput)?;
        Ok(CrewOutput {
            raw,
            tasks_output: task_outputs,
        })
    }
}

impl fmt::Display for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crew(id={}, agents={}, tasks={})",
            self.id,
            self.agents.len(),
            self.tasks.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::llm::{ChatModel, LLMMessage, LlmError};
    use crate::tools::base_tool::{BaseTool, SharedTool, ToolResult};

    /// Hands out scripted replies in order and records user prompts.
    #[derive(Debug)]
    struct SequencedModel {
        replies: Mutex<VecDeque<String>>,
        user_prompts: Mutex<Vec<String>>,
    }

    impl SequencedModel {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                user_prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChatModel for SequencedModel {
        fn chat(&self, messages: &[LLMMessage]) -> Result<String, LlmError> {
            if let Some(last_user) = messages.iter().rev().find(|m| m.role == "user") {
                self.user_prompts.lock().unwrap().push(last_user.content.clone());
            }
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "Thought: done\nFinal Answer: fallback".to_string()))
        }
    }

    #[derive(Debug)]
    struct CountingTool {
        uses: u32,
    }

    #[async_trait]
    impl BaseTool for CountingTool {
        fn name(&self) -> &str {
            "counting_tool"
        }

        fn description(&self) -> &str {
            "Counts invocations"
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

        fn run(&mut self, _args: HashMap<String, Value>) -> ToolResult {
            self.increment_usage_count();
            Ok(Value::String(format!("count is {}", self.uses)))
        }
    }

    fn agent_with_model(role: &str, model: Arc<SequencedModel>) -> Agent {
        let mut agent = Agent::new(role, format!("{} goal", role), format!("{} story", role));
        agent.llm = model;
        agent
    }

    #[test]
    fn test_sequential_context_chaining() {
        let model = SequencedModel::new(&[
            "Thought: a\nFinal Answer: first result",
            "Thought: b\nFinal Answer: second result",
            "Thought: c\nFinal Answer: third result",
        ]);

        let alpha = agent_with_model("alpha", model.clone());
        let beta = agent_with_model("beta", model.clone());

        let mut task1 = Task::new("task one", "out one");
        task1.agent = Some("alpha".to_string());
        let mut task2 = Task::new("task two", "out two");
        task2.agent = Some("beta".to_string());
        let mut task3 = Task::new("task three", "out three");
        task3.agent = Some("alpha".to_string());

        let mut crew = Crew::new(vec![alpha, beta], vec![task1, task2, task3]);
        let output = crew.kickoff(None).unwrap();

        assert_eq!(output.raw, "third result");
        assert_eq!(output.tasks_output.len(), 3);

        let prompts = model.user_prompts.lock().unwrap();
        assert!(!prompts[0].contains("first result"));
        assert!(prompts[1].contains("first result"));
        assert!(prompts[2].contains(&format!("first result{}second result", CONTEXT_SEPARATOR)));
    }

    #[test]
    fn test_tool_counters_reset_between_runs() {
        let model = SequencedModel::new(&[
            "Thought: use it\nAction: counting_tool\nAction Input: go",
            "Thought: done\nFinal Answer: run one",
            "Thought: use it\nAction: counting_tool\nAction Input: go",
            "Thought: done\nFinal Answer: run two",
        ]);

        let concrete = Arc::new(Mutex::new(CountingTool { uses: 0 }));
        let tool: SharedTool = concrete.clone();

        let mut agent = agent_with_model("worker", model);
        agent.tools = vec![tool];

        let mut task = Task::new("count once", "a count");
        task.agent = Some("worker".to_string());

        let mut crew = Crew::new(vec![agent], vec![task]);
        crew.kickoff(None).unwrap();
        assert_eq!(concrete.lock().unwrap().uses, 1);

        crew.kickoff(None).unwrap();
        // without the per-run reset this would be 2
        assert_eq!(concrete.lock().unwrap().uses, 1);
    }

    #[test]
    fn test_unknown_agent_role_errors() {
        let model = SequencedModel::new(&[]);
        let agent = agent_with_model("alpha", model);
        let mut task = Task::new("task", "out");
        task.agent = Some("missing".to_string());

        let mut crew = Crew::new(vec![agent], vec![task]);
        let err = crew.kickoff(None).unwrap_err();
        assert!(matches!(err, CrewError::UnknownAgent(role) if role == "missing"));
    }

    #[test]
    fn test_unassigned_task_errors() {
        let model = SequencedModel::new(&[]);
        let agent = agent_with_model("alpha", model);
        let task = Task::new("task", "out");

        let mut crew = Crew::new(vec![agent], vec![task]);
        assert!(matches!(
            crew.kickoff(None).unwrap_err(),
            CrewError::UnassignedTask(_)
        ));
    }

    #[test]
    fn test_interpolation_flows_into_prompts() {
        let model = SequencedModel::new(&["Thought: t\nFinal Answer: ok"]);
        let agent = agent_with_model("alpha", model.clone());
        let mut task = Task::new("Research {topic}", "Notes on {topic}");
        task.agent = Some("alpha".to_string());

        let mut crew = Crew::new(vec![agent], vec![task]);
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), "borrow checking".to_string());
        crew.kickoff(Some(inputs)).unwrap();

        let prompts = model.user_prompts.lock().unwrap();
        assert!(prompts[0].contains("Research borrow checking"));
        assert!(prompts[0].contains("Notes on borrow checking"));
    }

    #[test]
    fn test_unbound_placeholder_fails_the_run() {
        let model = SequencedModel::new(&[]);
        let agent = agent_with_model("alpha", model);
        let mut task = Task::new("Research {topic}", "Notes");
        task.agent = Some("alpha".to_string());

        let mut crew = Crew::new(vec![agent], vec![task]);
        let err = crew.kickoff(None).unwrap_err();
        assert!(matches!(err, CrewError::Interpolation(msg) if msg.contains("{topic}")));
    }

    #[test]
    fn test_all_empty_outputs_error() {
        let model = SequencedModel::new(&["Thought: t\nFinal Answer:"]);
        let agent = agent_with_model("alpha", model);
        let mut task = Task::new("task", "out");
        task.agent = Some("alpha".to_string());

        let mut crew = Crew::new(vec![agent], vec![task]);
        assert!(matches!(
            crew.kickoff(None).unwrap_err(),
            CrewError::EmptyOutput
        ));
    }

    #[test]
    fn test_task_callback_sees_timing() {
        let model = SequencedModel::new(&["Thought: t\nFinal Answer: done"]);
        let agent = agent_with_model("alpha", model);
        let mut task = Task::new("task", "out");
        task.agent = Some("alpha".to_string());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut crew = Crew::new(vec![agent], vec![task]);
        crew.set_task_callback(move |task| {
            seen_clone
                .lock()
                .unwrap()
                .push(task.execution_duration().is_some());
        });
        crew.kickoff(None).unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &[true]);
    }
}
