//! The built-in pipeline nodes.

pub mod format;
pub mod handle_errors;
pub mod parse;
pub mod prioritize;

pub use format::FormatOutputNode;
pub use handle_errors::{HandleErrorsNode, ERROR_BANNER};
pub use parse::ParseTasksNode;
pub use prioritize::PrioritizeTasksNode;
