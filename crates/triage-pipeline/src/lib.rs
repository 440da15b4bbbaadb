//! Task prioritization pipeline.
//!
//! This crate implements the core Triage runner: structured extraction and
//! repair of model output, the four nodes (parse, prioritize, format, handle
//! errors), the pure router, the fixed graph topology, and the executor that
//! walks it.

pub mod coerce;
pub mod engine;
pub mod events;
pub mod extract;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod prompts;
pub mod router;

pub use coerce::{coerce_score, coerce_tags, parsed_task, prioritized_task, FALLBACK_SCORE};
pub use engine::{PipelineExecutor, PipelineRun};
pub use events::{EventEmitter, PipelineEvent};
pub use extract::{extract, TaskObject};
pub use graph::{to_dot, to_mermaid, Edge, NodeId, EDGES, ENTRY};
pub use node::{default_registry, DynNode, Node, NodeRegistry};
pub use nodes::{
    FormatOutputNode, HandleErrorsNode, ParseTasksNode, PrioritizeTasksNode, ERROR_BANNER,
};
pub use router::{route, RouterFn};
