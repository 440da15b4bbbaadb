use async_trait::async_trait;
use triage_types::PipelineState;

use crate::graph::NodeId;
use crate::node::Node;

pub const ERROR_BANNER: &str = "The following errors occurred:\n";

/// Renders every collected error, in order, into `output`.
pub struct HandleErrorsNode;

impl HandleErrorsNode {
    pub fn report(errors: &[String]) -> String {
        format!("{ERROR_BANNER}{}", errors.join("\n"))
    }
}

#[async_trait]
impl Node for HandleErrorsNode {
    fn id(&self) -> NodeId {
        NodeId::HandleErrors
    }

    async fn run(&self, state: &PipelineState) -> PipelineState {
        tracing::info!(node = %self.id(), errors = state.errors().len(), "Reporting errors");
        state
            .clone()
            .with_error_report(Self::report(state.errors()))
    }
}
