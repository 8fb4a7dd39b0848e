//! Prompt slices for the task execution loop.
//!
//! Slices are embedded rather than loaded from disk. `{role}`, `{goal}`,
//! `{backstory}`, `{tools}`, `{tool_names}` and `{input}` are substituted
//! with plain string replacement, so task text containing JSON braces is
//! never misread as a placeholder.

const ROLE_PLAYING_SLICE: &str = "You are {role}. {backstory}\nYour personal goal is: {goal}";

const TOOLS_SLICE: &str = "\nYou ONLY have access to the following tools. Never invent a tool \
that is not listed here:\n\n{tools}\n\nUse the following format in your response:\n\n\
Thought: what you should do next and why\n\
Action: the tool to use, exactly one of [{tool_names}]\n\
Action Input: the input for the tool, as a simple JSON object with double-quoted keys and values\n\
Observation: the tool result\n\n\
Repeat Thought/Action/Action Input/Observation as needed. Once you have gathered \
enough information, reply with:\n\n\
Thought: I now know the final answer\n\
Final Answer: your complete answer to the task";

const NO_TOOLS_SLICE: &str = "\nTo complete the task, respond using exactly this format:\n\n\
Thought: I now can give a complete answer\n\
Final Answer: your complete answer to the task, as thorough as the expected output requires";

const CURRENT_TASK_SLICE: &str = "\nCurrent Task: {input}\n\n\
Begin! Give your best and most complete Final Answer.\n\nThought:";

/// Builds the system and user messages for one task turn.
#[derive(Debug, Clone, Copy)]
pub struct Prompts {
    /// Whether the agent has any tools bound. Selects the ReAct format
    /// slice or the answer-only slice.
    pub has_tools: bool,
}

impl Prompts {
    pub fn new(has_tools: bool) -> Self {
        Self { has_tools }
    }

    /// Role framing plus the format contract the parser expects.
    ///
    /// `tools_block` is the rendered per-tool description list and
    /// `tool_names` the comma-separated name list. Both are ignored when
    /// the agent has no tools.
    pub fn system(
        &self,
        role: &str,
        goal: &str,
        backstory: &str,
        tools_block: &str,
        tool_names: &str,
    ) -> String {
        let mut prompt = ROLE_PLAYING_SLICE
            .replace("{role}", role)
            .replace("{goal}", goal)
            .replace("{backstory}", backstory);
        if self.has_tools {
            prompt.push_str(
                &TOOLS_SLICE
                    .replace("{tools}", tools_block)
                    .replace("{tool_names}", tool_names),
            );
        } else {
            prompt.push_str(NO_TOOLS_SLICE);
        }
        prompt
    }

    /// Task framing around the interpolated task text.
    pub fn user(&self, task_text: &str) -> String {
        CURRENT_TASK_SLICE.replace("{input}", task_text)
    }
}
