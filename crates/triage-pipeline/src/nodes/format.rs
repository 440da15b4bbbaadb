use std::sync::Arc;

use async_trait::async_trait;
use triage_llm::ChatModel;
use triage_types::{PipelineState, Result, TaskRecord, TriageError};

use crate::graph::NodeId;
use crate::node::Node;
use crate::prompts;

// ---------------------------------------------------------------------------
// FormatOutputNode — human-readable summary, returned verbatim
// ---------------------------------------------------------------------------

pub struct FormatOutputNode {
    model: Arc<dyn ChatModel>,
}

impl FormatOutputNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    async fn render(&self, tasks: &[TaskRecord]) -> Result<String> {
        self.model
            .generate(&prompts::format_messages(tasks)?)
            .await
    }
}

#[async_trait]
impl Node for FormatOutputNode {
    fn id(&self) -> NodeId {
        NodeId::FormatOutput
    }

    async fn run(&self, state: &PipelineState) -> PipelineState {
        if state.prioritized_tasks().is_empty() {
            let err = TriageError::Input("No prioritized tasks to format.".into());
            return state.clone().with_error(err.to_string());
        }

        match self.render(state.prioritized_tasks()).await {
            Ok(text) => {
                tracing::info!(node = %self.id(), chars = text.len(), "Output formatted");
                state.clone().with_formatted_output(text)
            }
            Err(e) => {
                tracing::warn!(node = %self.id(), error = %e, "Output formatting failed");
                state.clone().with_error(format!("Failed to format output: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_llm::ScriptedModel;
    use triage_types::Step;

    fn prioritized() -> PipelineState {
        let task = TaskRecord::parsed("Call mom", "", vec![]);
        PipelineState::new("x")
            .with_tasks(vec![task.clone()])
            .with_prioritized_tasks(vec![task])
    }

    #[tokio::test]
    async fn reply_becomes_output_verbatim() {
        let reply = "## Your tasks\n\n1. **Call mom** `{not json}`\n";
        let node = FormatOutputNode::new(Arc::new(ScriptedModel::new().reply(reply)));
        let out = node.run(&prioritized()).await;
        assert_eq!(out.output(), reply);
        assert_eq!(out.current_step(), Step::OutputFormatted);
        assert!(out.errors().is_empty());
    }

    #[tokio::test]
    async fn empty_prioritized_list_is_an_input_error() {
        let model = Arc::new(ScriptedModel::new());
        let node = FormatOutputNode::new(model.clone());
        let state = PipelineState::new("x").with_prioritized_tasks(vec![]);
        let out = node.run(&state).await;
        assert_eq!(out.errors(), ["No prioritized tasks to format."]);
        assert_eq!(out.output(), "");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn invocation_failure_is_recorded() {
        let node = FormatOutputNode::new(Arc::new(ScriptedModel::new().fail(
            TriageError::RequestTimeout {
                provider: "openai".into(),
                timeout_ms: 60_000,
            },
        )));
        let out = node.run(&prioritized()).await;
        assert_eq!(out.errors().len(), 1);
        assert!(out.errors()[0].starts_with("Failed to format output: "));
        assert_eq!(out.output(), "");
        assert_eq!(out.current_step(), Step::TasksPrioritized);
    }
}
