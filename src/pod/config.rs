//! Pod configuration schema.
//!
//! One YAML file per pod: agent roles, task descriptions, tool references,
//! workflow order, and input/output declarations. Unset sections fall back
//! to defaults, so a minimal pod needs only agents and tasks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::llm::DEFAULT_MODEL;

fn default_true() -> bool {
    true
}

/// One pod: a named group of agents with an ordered task list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodConfig {
    /// Display name; the file stem is the lookup key.
    pub name: Option<String>,
    pub description: Option<String>,
    pub llm: LlmConfig,
    /// Agents keyed by a short name; tasks reference that key.
    pub agents: BTreeMap<String, AgentConfig>,
    pub tasks: BTreeMap<String, TaskConfig>,
    pub tools: ToolSelection,
    pub workflow: WorkflowConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
}

impl PodConfig {
    /// Display name, falling back to the lookup key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    /// Task names in execution order: the workflow list when present,
    /// otherwise the task map in name order.
    pub fn task_order(&self) -> Vec<String> {
        if !self.workflow.tasks.is_empty() {
            self.workflow.tasks.clone()
        } else {
            self.tasks.keys().cloned().collect()
        }
    }
}

/// Model settings for every agent in the pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Request timeout in seconds; environment fallback when unset.
    pub timeout: Option<f64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 2048,
            timeout: None,
        }
    }
}

/// One agent role inside a pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Registry names of the tools this agent binds, in order.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Parsed for compatibility; delegation is not supported and a true
    /// value is ignored with a warning.
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Reasoning loop cap override for this agent.
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

/// One task inside a pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
    /// Key of the agent (in the pod's `agents` map) that runs this task.
    pub agent: String,
}

/// Informational tool listing shown by `info`; binding happens through the
/// per-agent tool lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSelection {
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
}

/// Execution order and verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Task names in execution order; empty means task-map name order.
    pub tasks: Vec<String>,
    pub verbose: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            verbose: true,
        }
    }
}

/// Declared inputs, used by interactive prompting and `run` validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub required: Vec<InputSpec>,
    pub optional: Vec<InputSpec>,
}

/// One declared input parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: Option<String>,
}

/// Where and whether to write the run result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub save: bool,
    pub dir: String,
    /// Filename template; `{pod_name}`, `{timestamp}` and any run input
    /// are substituted.
    pub filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save: true,
            dir: "output".to_string(),
            filename: "{pod_name}_{timestamp}".to_string(),
        }
    }
}
