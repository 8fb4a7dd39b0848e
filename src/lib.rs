//! # orcapod
//!
//! YAML-configured pods of AI agents. A pod file names a group of agent
//! roles, an ordered task list, and the tools each agent may use; the
//! capability registry constructs those tools from a declarative `tools.yaml`
//! with per-entry failure isolation, and the runner executes the pod's tasks
//! sequentially against a chat model, feeding each task's output into the
//! next task's context.

pub mod agent;
pub mod agents;
pub mod artifact;
pub mod cli;
pub mod crew;
pub mod llm;
pub mod pod;
pub mod progress;
pub mod runner;
pub mod task;
pub mod tools;
pub mod utilities;

pub use agent::Agent;
pub use crew::{Crew, CrewOutput};
pub use llm::LLM;
pub use pod::{PodConfig, PodLoader};
pub use runner::{PodRunner, RunOptions, RunOutcome};
pub use task::{Task, TaskOutput};
pub use tools::{BaseTool, ToolRegistry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
