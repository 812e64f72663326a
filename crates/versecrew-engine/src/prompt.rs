//! Prompt construction for agents and tasks.

use versecrew_config::{AgentConfig, TaskConfig};

pub const DELEGATE_WORK: &str = "delegate_work";
pub const ASK_QUESTION: &str = "ask_question";

pub const FORCE_FINAL_ANSWER: &str = "You have used all the steps you are allowed. \
Do not use any more tools. Reply now with `Final Answer:` followed by your best complete answer.";

/// Tool lines offered to an agent: its own tools plus, when delegating, the coworker tools.
pub struct ToolMenu {
    pub descriptions: String,
    pub names: Vec<String>,
}

impl ToolMenu {
    pub fn new(descriptions: String, names: Vec<String>) -> Self {
        Self { descriptions, names }
    }

    /// Adds `delegate_work` and `ask_question` naming the given coworker roles.
    pub fn with_delegation(mut self, coworkers: &[&str]) -> Self {
        let list = coworkers.join(", ");
        let lines = [
            format!(
                "{DELEGATE_WORK}: Delegate a specific task to one of the following coworkers: {list}. \
                 Input format: coworker | task | context. The coworker knows nothing about your \
                 task, so share all the context they need."
            ),
            format!(
                "{ASK_QUESTION}: Ask a specific question to one of the following coworkers: {list}. \
                 Input format: coworker | question | context."
            ),
        ];
        for line in lines {
            if !self.descriptions.is_empty() {
                self.descriptions.push('\n');
            }
            self.descriptions.push_str(&line);
        }
        self.names.push(DELEGATE_WORK.to_string());
        self.names.push(ASK_QUESTION.to_string());
        self
    }
}

pub fn system_prompt(agent: &AgentConfig, menu: &ToolMenu) -> String {
    let mut prompt = format!(
        "You are {}.\n{}\n\nYour personal goal is: {}\n\n",
        agent.role, agent.backstory, agent.goal
    );

    if menu.names.is_empty() {
        prompt.push_str(
            "You have no tools. Answer from your own knowledge.\n\n\
             When you have the answer, respond with:\n\n\
             Final Answer: the complete final answer to the task\n",
        );
        return prompt;
    }

    prompt.push_str(&format!(
        "You have access to the following tools:\n\n{}\n\n\
         Use the following format:\n\n\
         Thought: think about what to do next\n\
         Action: the tool to use, one of [{}]\n\
         Action Input: the input to the tool\n\
         Observation: the result of the tool\n\n\
         Thought, Action and Action Input may repeat; stop after Action Input and wait for the Observation.\n\n\
         When you know the final answer, respond with:\n\n\
         Thought: I now know the final answer\n\
         Final Answer: the complete final answer to the task\n",
        menu.descriptions,
        menu.names.join(", ")
    ));
    prompt
}

/// The opening user message for a task, with outputs of earlier tasks as context.
pub fn task_prompt(task: &TaskConfig, context: &[String]) -> String {
    let mut prompt = format!("Current task: {}\n", task.description);

    if let Some(expected) = &task.expected_output {
        prompt.push_str(&format!("\nThis is the expected criteria for your final answer: {}\n", expected));
    }

    if !context.is_empty() {
        prompt.push_str(&format!(
            "\nThis is the context you're working with:\n{}\n",
            context.join("\n\n---\n\n")
        ));
    }

    prompt.push_str("\nBegin! Use the tools available and give your best Final Answer.");
    prompt
}

/// The opening user message for work handed over by a coworker.
pub fn delegated_prompt(kind: &str, task: &str, context: &str) -> String {
    let mut prompt = match kind {
        ASK_QUESTION => format!("A coworker asks you: {}\n", task),
        _ => format!("Current task: {}\n", task),
    };
    if !context.is_empty() {
        prompt.push_str(&format!("\nThis is the context you're working with:\n{}\n", context));
    }
    prompt.push_str("\nBegin! Give your best Final Answer.");
    prompt
}
