use std::sync::Arc;

use async_trait::async_trait;
use triage_llm::ChatModel;
use triage_types::{PipelineState, Result, TaskRecord, TriageError};

use crate::coerce::prioritized_task;
use crate::extract::extract;
use crate::graph::NodeId;
use crate::node::Node;
use crate::prompts;

// ---------------------------------------------------------------------------
// PrioritizeTasksNode — importance and score per task, sorted
// ---------------------------------------------------------------------------

pub struct PrioritizeTasksNode {
    model: Arc<dyn ChatModel>,
}

impl PrioritizeTasksNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    async fn prioritize(&self, tasks: &[TaskRecord]) -> Result<Vec<TaskRecord>> {
        let reply = self
            .model
            .generate(&prompts::prioritize_messages(tasks)?)
            .await?;
        let mut ranked = extract(&reply)?
            .iter()
            .map(prioritized_task)
            .collect::<Result<Vec<_>>>()?;
        if ranked.is_empty() {
            return Err(TriageError::Shape {
                expected: "a non-empty list of tasks".into(),
                actual: "an empty list".into(),
            });
        }
        sort_by_priority(&mut ranked);
        Ok(ranked)
    }
}

/// Highest score first; equal scores keep their order.
pub fn sort_by_priority(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
}

#[async_trait]
impl Node for PrioritizeTasksNode {
    fn id(&self) -> NodeId {
        NodeId::PrioritizeTasks
    }

    async fn run(&self, state: &PipelineState) -> PipelineState {
        if state.tasks().is_empty() {
            let err = TriageError::Input("No tasks to prioritize.".into());
            return state.clone().with_error(err.to_string());
        }

        match self.prioritize(state.tasks()).await {
            Ok(ranked) => {
                tracing::info!(node = %self.id(), tasks = ranked.len(), "Tasks prioritized");
                state.clone().with_prioritized_tasks(ranked)
            }
            Err(e) => {
                tracing::warn!(node = %self.id(), error = %e, "Task prioritization failed");
                state
                    .clone()
                    .with_error(format!("Failed to prioritize tasks: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_llm::ScriptedModel;
    use triage_types::{Importance, Step};

    fn parsed_state() -> PipelineState {
        PipelineState::new("tasks").with_tasks(vec![
            TaskRecord::parsed("Schedule dentist", "", vec!["health".into()]),
            TaskRecord::parsed("Review PRs", "", vec!["work".into(), "urgent".into()]),
            TaskRecord::parsed("Call mom", "", vec!["personal".into()]),
        ])
    }

    #[tokio::test]
    async fn no_tasks_is_an_input_error() {
        let model = Arc::new(ScriptedModel::new());
        let node = PrioritizeTasksNode::new(model.clone());
        let out = node.run(&PipelineState::new("x")).await;
        assert_eq!(out.errors(), ["No tasks to prioritize."]);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn sorts_descending_and_keeps_ties_stable() {
        let reply = r#"[
            {"description": "Schedule dentist", "tags": ["health"], "importance": "Low", "priority_score": 3},
            {"description": "Review PRs", "tags": ["work", "urgent"], "importance": "High", "priority_score": 9},
            {"description": "Call mom", "tags": ["personal"], "importance": "Medium", "priority_score": 3}
        ]"#;
        let node = PrioritizeTasksNode::new(Arc::new(ScriptedModel::new().reply(reply)));
        let out = node.run(&parsed_state()).await;

        assert_eq!(out.current_step(), Step::TasksPrioritized);
        let order: Vec<_> = out
            .prioritized_tasks()
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(order, ["Review PRs", "Schedule dentist", "Call mom"]);
        assert_eq!(out.prioritized_tasks()[0].importance, Importance::High);
        assert_eq!(out.tasks().len(), 3, "parsed tasks are kept");
    }

    #[tokio::test]
    async fn non_numeric_score_defaults_to_five() {
        let reply = r#"[
            {"description": "A", "importance": "High", "priority_score": "high"},
            {"description": "B", "importance": "Low", "priority_score": 2}
        ]"#;
        let node = PrioritizeTasksNode::new(Arc::new(ScriptedModel::new().reply(reply)));
        let out = node.run(&parsed_state()).await;

        assert!(out.errors().is_empty());
        assert_eq!(out.prioritized_tasks()[0].description, "A");
        assert_eq!(out.prioritized_tasks()[0].priority_score, 5.0);
    }

    #[tokio::test]
    async fn unparseable_reply_is_recorded() {
        let node = PrioritizeTasksNode::new(Arc::new(
            ScriptedModel::new().reply("I'm sorry, I can't help with that."),
        ));
        let out = node.run(&parsed_state()).await;
        assert_eq!(out.errors().len(), 1);
        assert!(out.errors()[0].starts_with("Failed to prioritize tasks: JSON parsing failed:"));
        assert!(out.prioritized_tasks().is_empty());
        assert_eq!(out.current_step(), Step::TasksParsed);
    }

    #[tokio::test]
    async fn empty_ranking_is_recorded_as_error() {
        let node = PrioritizeTasksNode::new(Arc::new(ScriptedModel::new().reply("```json\n[]\n```")));
        let out = node.run(&parsed_state()).await;
        assert_eq!(
            out.errors(),
            ["Failed to prioritize tasks: Expected a non-empty list of tasks, got an empty list"]
        );
        assert!(out.prioritized_tasks().is_empty());
        assert_eq!(out.current_step(), Step::TasksParsed);
    }

    #[test]
    fn sort_invariant_holds() {
        let mut tasks: Vec<TaskRecord> = [4.0, 9.5, 1.0, 9.5, 7.25, 0.0]
            .iter()
            .enumerate()
            .map(|(i, s)| TaskRecord::parsed(format!("t{i}"), "", vec![]).prioritized(Importance::Unset, *s))
            .collect();
        sort_by_priority(&mut tasks);
        for pair in tasks.windows(2) {
            assert!(pair[0].priority_score >= pair[1].priority_score);
        }
        assert_eq!(tasks[0].description, "t1");
        assert_eq!(tasks[1].description, "t3");
    }
}
