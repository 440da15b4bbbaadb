//! Next-node selection.

use triage_types::{PipelineState, Step};

use crate::graph::NodeId;

/// Signature shared by [`route`] and any replacement the executor is given.
pub type RouterFn = fn(&PipelineState) -> NodeId;

/// Pick the node to run after a state was produced.
///
/// Errors always win; otherwise the step decides. A state that has not
/// advanced past `Start` routes to `Terminal`.
pub fn route(state: &PipelineState) -> NodeId {
    if state.has_errors() {
        return NodeId::HandleErrors;
    }
    match state.current_step() {
        Step::TasksParsed => NodeId::PrioritizeTasks,
        Step::TasksPrioritized => NodeId::FormatOutput,
        Step::Start | Step::OutputFormatted => NodeId::Terminal,
    }
}
