//! Task and task output types.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utilities::interpolate_only;

// ---------------------------------------------------------------------------
// TaskOutput
// ---------------------------------------------------------------------------

/// Result of one executed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Description of the task, after interpolation.
    pub description: String,
    /// Optional task name.
    pub name: Option<String>,
    /// Expected output the agent was asked for.
    pub expected_output: Option<String>,
    /// Short summary derived from the description.
    pub summary: Option<String>,
    /// The agent's final answer.
    pub raw: String,
    /// Role of the agent that produced the answer.
    pub agent: String,
}

impl TaskOutput {
    pub fn new(description: String, agent: String, raw: String) -> Self {
        let summary = Self::generate_summary(&description);
        Self {
            description,
            name: None,
            expected_output: None,
            summary: Some(summary),
            raw,
            agent,
        }
    }

    /// First 10 words of the description plus an ellipsis.
    fn generate_summary(description: &str) -> String {
        let excerpt: String = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{}...", excerpt)
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work assigned to one agent.
#[derive(Debug, Serialize, Deserialize)]
pub struct Task {
    /// Optional name for the task.
    pub name: Option<String>,
    /// What the agent should do.
    pub description: String,
    /// What a good answer looks like.
    pub expected_output: String,
    /// Role of the agent responsible for execution.
    pub agent: Option<String>,
    /// Unique identifier for the task.
    pub id: Uuid,
    /// Output once the task has run.
    pub output: Option<TaskOutput>,
    /// Start of the task execution.
    pub start_time: Option<DateTime<Utc>>,
    /// End of the task execution.
    pub end_time: Option<DateTime<Utc>>,
    /// Description before interpolation, kept so re-running with different
    /// inputs starts from the template.
    #[serde(skip)]
    original_description: Option<String>,
    /// Expected output before interpolation.
    #[serde(skip)]
    original_expected_output: Option<String>,
}

impl Clone for Task {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            expected_output: self.expected_output.clone(),
            agent: self.agent.clone(),
            id: Uuid::new_v4(),
            output: None,
            start_time: None,
            end_time: None,
            original_description: self.original_description.clone(),
            original_expected_output: self.original_expected_output.clone(),
        }
    }
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            name: None,
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
            id: Uuid::new_v4(),
            output: None,
            start_time: None,
            end_time: None,
            original_description: None,
            original_expected_output: None,
        }
    }

    /// The prompt text handed to the agent for this task.
    pub fn prompt(&self) -> String {
        format!(
            "{}\nExpected Output: {}",
            self.description, self.expected_output
        )
    }

    /// Interpolate `{placeholder}` inputs into description and expected
    /// output. Templates are preserved so a later call starts from the
    /// original text rather than the previous interpolation.
    ///
    /// # Errors
    /// Returns an error naming the first placeholder with no binding.
    pub fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), String> {
        if self.original_description.is_none() {
            self.original_description = Some(self.description.clone());
        }
        if self.original_expected_output.is_none() {
            self.original_expected_output = Some(self.expected_output.clone());
        }

        self.description = interpolate_only(self.original_description.as_deref(), inputs)?;
        self.expected_output = interpolate_only(self.original_expected_output.as_deref(), inputs)?;
        Ok(())
    }

    /// Execution duration in seconds once both timestamps are set.
    pub fn execution_duration(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task(description={}, expected_output={})",
            self.description, self.expected_output
        )
    }
}
