//! Task execution machinery: prompt slices, reply parsing, and the
//! per-task Thought/Action/Observation loop.

pub mod executor;
pub mod parser;
pub mod prompts;

pub use executor::{AgentExecutor, ExecutorError, DEFAULT_MAX_ITERATIONS};
pub use parser::{AgentAction, AgentFinish, ParseError, ParseResult};
pub use prompts::Prompts;
