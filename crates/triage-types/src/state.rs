use serde::{Deserialize, Serialize};

use crate::task::TaskRecord;

// ---------------------------------------------------------------------------
// Step — how far a run has progressed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    #[default]
    #[serde(rename = "")]
    Start,
    #[serde(rename = "tasks_parsed")]
    TasksParsed,
    #[serde(rename = "tasks_prioritized")]
    TasksPrioritized,
    #[serde(rename = "output_formatted")]
    OutputFormatted,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Start => "",
            Step::TasksParsed => "tasks_parsed",
            Step::TasksPrioritized => "tasks_prioritized",
            Step::OutputFormatted => "output_formatted",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineState — immutable snapshot threaded through the graph
// ---------------------------------------------------------------------------

/// One snapshot of a pipeline run.
///
/// Fields are private: the only way to derive a new snapshot is through the
/// consuming `with_*` transitions, which keep `errors` append-only and tie
/// each payload to the step that produces it. A node receives `&PipelineState`
/// and returns a fresh value, so snapshots are never shared mutably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    raw_input: String,
    tasks: Vec<TaskRecord>,
    prioritized_tasks: Vec<TaskRecord>,
    current_step: Step,
    errors: Vec<String>,
    output: String,
}

impl PipelineState {
    /// Initial state for a run over `raw_input`.
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            ..Self::default()
        }
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn prioritized_tasks(&self) -> &[TaskRecord] {
        &self.prioritized_tasks
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Append one error entry.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Record parsed tasks and advance to `tasks_parsed`.
    pub fn with_tasks(mut self, tasks: Vec<TaskRecord>) -> Self {
        self.tasks = tasks;
        self.current_step = Step::TasksParsed;
        self
    }

    /// Record prioritized tasks and advance to `tasks_prioritized`.
    pub fn with_prioritized_tasks(mut self, tasks: Vec<TaskRecord>) -> Self {
        self.prioritized_tasks = tasks;
        self.current_step = Step::TasksPrioritized;
        self
    }

    /// Record the user-facing summary and advance to `output_formatted`.
    pub fn with_formatted_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self.current_step = Step::OutputFormatted;
        self
    }

    /// Replace `output` with an error report. The step is left untouched.
    pub fn with_error_report(mut self, report: impl Into<String>) -> Self {
        self.output = report.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = PipelineState::new("1. Do a thing");
        assert_eq!(state.raw_input(), "1. Do a thing");
        assert!(state.tasks().is_empty());
        assert!(state.prioritized_tasks().is_empty());
        assert_eq!(state.current_step(), Step::Start);
        assert!(!state.has_errors());
        assert_eq!(state.output(), "");
    }

    #[test]
    fn transitions_do_not_touch_the_source_snapshot() {
        let original = PipelineState::new("x");
        let next = original
            .clone()
            .with_tasks(vec![TaskRecord::parsed("x", "", vec![])]);
        assert!(original.tasks().is_empty());
        assert_eq!(original.current_step(), Step::Start);
        assert_eq!(next.tasks().len(), 1);
        assert_eq!(next.current_step(), Step::TasksParsed);
    }

    #[test]
    fn errors_accumulate_in_order() {
        let state = PipelineState::new("")
            .with_error("first")
            .with_error("second");
        assert_eq!(state.errors(), ["first", "second"]);
    }

    #[test]
    fn error_report_keeps_step() {
        let state = PipelineState::new("x")
            .with_tasks(vec![])
            .with_error("boom")
            .with_error_report("report");
        assert_eq!(state.current_step(), Step::TasksParsed);
        assert_eq!(state.output(), "report");
    }

    #[test]
    fn step_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&Step::Start).unwrap(), "\"\"");
        assert_eq!(
            serde_json::to_string(&Step::TasksParsed).unwrap(),
            "\"tasks_parsed\""
        );
        assert_eq!(
            serde_json::to_string(&Step::TasksPrioritized).unwrap(),
            "\"tasks_prioritized\""
        );
        assert_eq!(
            serde_json::to_string(&Step::OutputFormatted).unwrap(),
            "\"output_formatted\""
        );
        assert_eq!(Step::TasksParsed.to_string(), "tasks_parsed");
    }

    #[test]
    fn state_serializes_with_field_names() {
        let state = PipelineState::new("in").with_error("bad");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["raw_input"], "in");
        assert_eq!(json["current_step"], "");
        assert_eq!(json["errors"][0], "bad");
    }
}
