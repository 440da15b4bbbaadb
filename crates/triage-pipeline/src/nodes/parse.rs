use std::sync::Arc;

use async_trait::async_trait;
use triage_llm::ChatModel;
use triage_types::{PipelineState, Result, TaskRecord, TriageError};

use crate::coerce::parsed_task;
use crate::extract::extract;
use crate::graph::NodeId;
use crate::node::Node;
use crate::prompts;

// ---------------------------------------------------------------------------
// ParseTasksNode — raw text to TaskRecords
// ---------------------------------------------------------------------------

pub struct ParseTasksNode {
    model: Arc<dyn ChatModel>,
}

impl ParseTasksNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    async fn parse(&self, raw_input: &str) -> Result<Vec<TaskRecord>> {
        let reply = self
            .model
            .generate(&prompts::parse_messages(raw_input))
            .await?;
        extract(&reply)?.iter().map(parsed_task).collect()
    }
}

#[async_trait]
impl Node for ParseTasksNode {
    fn id(&self) -> NodeId {
        NodeId::ParseTasks
    }

    async fn run(&self, state: &PipelineState) -> PipelineState {
        if state.raw_input().trim().is_empty() {
            let err = TriageError::Input("No tasks provided.".into());
            return state.clone().with_error(err.to_string());
        }

        match self.parse(state.raw_input()).await {
            Ok(tasks) => {
                tracing::info!(node = %self.id(), tasks = tasks.len(), "Tasks parsed");
                state.clone().with_tasks(tasks)
            }
            Err(e) => {
                tracing::warn!(node = %self.id(), error = %e, "Task parsing failed");
                state.clone().with_error(format!("Failed to parse tasks: {e}"))
            }
        }
    }
}
