//! Fixed instructions sent to the model by each node.

use triage_llm::Message;
use triage_types::{Result, TaskRecord};

pub const PARSER_PROMPT: &str = "\
You are a task parser. Parse the user's input into a list of tasks.
Extract the task description, due date (if provided), and any tags (prefixed with #).
Return the tasks as a JSON array of objects with the keys \"description\", \"due_date\" and \"tags\".";

pub const PRIORITIZER_PROMPT: &str = "\
You are a task prioritization expert. Your job is to analyze tasks and assign:
1. An importance level (High, Medium, Low)
2. A priority score from 1-10 (10 being highest priority)

Consider the following factors:
- Due date: more urgent dates should have higher priority
- Tags: certain tags like #urgent or #important should increase priority
- Task description: look for keywords indicating importance or urgency

Return the tasks in JSON format with added importance and priority_score fields.";

pub const PRESENTER_PROMPT: &str = "\
You are a personal assistant presenting prioritized tasks.
Format the list of prioritized tasks in a clear, organized way.
Include a helpful summary of why tasks were prioritized as they were.
Use markdown for formatting to make it easy to read.";

pub fn parse_messages(raw_input: &str) -> Vec<Message> {
    vec![
        Message::system(PARSER_PROMPT),
        Message::user(format!("Parse these tasks: {raw_input}")),
    ]
}

pub fn prioritize_messages(tasks: &[TaskRecord]) -> Result<Vec<Message>> {
    Ok(vec![
        Message::system(PRIORITIZER_PROMPT),
        Message::user(format!(
            "Prioritize these tasks: {}",
            serde_json::to_string_pretty(tasks)?
        )),
    ])
}

pub fn format_messages(tasks: &[TaskRecord]) -> Result<Vec<Message>> {
    Ok(vec![
        Message::system(PRESENTER_PROMPT),
        Message::user(format!(
            "Format these prioritized tasks for presentation to the user: {}",
            serde_json::to_string_pretty(tasks)?
        )),
    ])
}
