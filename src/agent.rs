//! Agent identity and task execution entry point.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::agents::{AgentExecutor, ExecutorError, Prompts, DEFAULT_MAX_ITERATIONS};
use crate::llm::{ChatModel, LLM};
use crate::tools::{render_tool_lines, tool_names, SharedTool};
use crate::utilities::interpolate_only;

/// One role in a pod: identity, model handle, and bound tools.
///
/// The model sits behind the [`ChatModel`] trait so workflow tests can
/// substitute scripted replies for a live endpoint.
#[derive(Debug)]
pub struct Agent {
    /// Role name, also the key tasks use to reference this agent.
    pub role: String,
    /// Objective the agent optimizes for.
    pub goal: String,
    /// Persona framing included in the system prompt.
    pub backstory: String,
    /// Chat model the agent talks to.
    pub llm: Arc<dyn ChatModel>,
    /// Tools resolved for this agent, in configuration order.
    pub tools: Vec<SharedTool>,
    /// Cap on reasoning loop turns per task.
    pub max_iterations: u32,
    /// Print progress while working.
    pub verbose: bool,
    /// Unique identifier for the agent instance.
    pub id: Uuid,
    original_goal: Option<String>,
    original_backstory: Option<String>,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            llm: Arc::new(LLM::default()),
            tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            verbose: false,
            id: Uuid::new_v4(),
            original_goal: None,
            original_backstory: None,
        }
    }

    /// Interpolate `{placeholder}` inputs into goal and backstory, keeping
    /// the templates for later runs.
    ///
    /// # Errors
    /// Returns an error naming the first placeholder with no binding.
    pub fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), String> {
        if self.original_goal.is_none() {
            self.original_goal = Some(self.goal.clone());
        }
        if self.original_backstory.is_none() {
            self.original_backstory = Some(self.backstory.clone());
        }
        self.goal = interpolate_only(self.original_goal.as_deref(), inputs)?;
        self.backstory = interpolate_only(self.original_backstory.as_deref(), inputs)?;
        Ok(())
    }

    /// Run one task to completion and return the final answer.
    ///
    /// `context` carries the outputs of earlier tasks in the workflow.
    ///
    /// # Errors
    /// Propagates model failures and the iteration cap from the executor.
    pub fn execute_task(
        &self,
        task_prompt: &str,
        context: Option<&str>,
    ) -> Result<String, ExecutorError> {
        let prompts = Prompts::new(!self.tools.is_empty());
        let system = prompts.system(
            &self.role,
            &self.goal,
            &self.backstory,
            &render_tool_lines(&self.tools),
            &tool_names(&self.tools).join(", "),
        );

        let mut task_text = task_prompt.to_string();
        if let Some(context) = context {
            task_text.push_str("\n\nThis is the context you are working with:\n");
            task_text.push_str(context);
        }
        let user = prompts.user(&task_text);

        let mut executor = AgentExecutor::new(
            self.llm.as_ref(),
            &self.tools,
            self.max_iterations,
            self.verbose,
        );
        let finish = executor.invoke(&system, &user)?;
        Ok(finish.output)
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent(role={}, goal={})", self.role, self.goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_interpolation_preserves_template() {
        let mut agent = Agent::new("Researcher", "Study {topic}", "Expert in {topic}.");
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), "compilers".to_string());
        agent.interpolate_inputs(&inputs).unwrap();
        assert_eq!(agent.goal, "Study compilers");
        assert_eq!(agent.backstory, "Expert in compilers.");

        inputs.insert("topic".to_string(), "linkers".to_string());
        agent.interpolate_inputs(&inputs).unwrap();
        assert_eq!(agent.goal, "Study linkers");
    }

    #[test]
    fn test_new_agent_defaults() {
        let agent = Agent::new("Writer", "write", "story");
        assert_eq!(agent.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert!(!agent.verbose);
        assert!(agent.tools.is_empty());
    }
}
