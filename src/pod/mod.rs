//! Pod configuration: schema, loading, and crew assembly.

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    AgentConfig, InputSpec, InputsConfig, LlmConfig, OutputConfig, PodConfig, TaskConfig,
    ToolSelection, WorkflowConfig,
};
pub use error::PodError;
pub use loader::PodLoader;
