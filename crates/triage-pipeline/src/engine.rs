//! Graph executor: the sequential walk from `ParseTasks` to `Terminal`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use triage_llm::ChatModel;
use triage_types::{PipelineState, Result, Step, TriageError};
use uuid::Uuid;

use crate::events::{EventEmitter, PipelineEvent};
use crate::graph::{self, NodeId, ENTRY};
use crate::node::{default_registry, NodeRegistry};
use crate::router::{route, RouterFn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Drives registered nodes through the graph, one run at a time per call.
///
/// Holds no per-run state, so one executor can serve concurrent runs.
pub struct PipelineExecutor {
    registry: NodeRegistry,
    router: RouterFn,
    events: Option<EventEmitter>,
}

/// The outcome of one completed walk.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Nodes in the order they ran.
    pub path: Vec<NodeId>,
    pub final_state: PipelineState,
    pub duration_ms: u64,
}

impl PipelineRun {
    /// True when the run finished through `FormatOutput` with no errors.
    pub fn succeeded(&self) -> bool {
        !self.final_state.has_errors()
    }

    pub fn output(&self) -> &str {
        self.final_state.output()
    }
}

// ---------------------------------------------------------------------------
// PipelineExecutor
// ---------------------------------------------------------------------------

impl PipelineExecutor {
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            registry,
            router: route,
            events: None,
        }
    }

    /// Executor over the built-in nodes, all backed by `model`.
    pub fn with_model(model: Arc<dyn ChatModel>) -> Self {
        Self::new(default_registry(model))
    }

    /// Replace the router. Transitions are still checked against the graph.
    pub fn with_router(mut self, router: RouterFn) -> Self {
        self.router = router;
        self
    }

    pub fn with_events(mut self, emitter: EventEmitter) -> Self {
        self.events = Some(emitter);
        self
    }

    pub fn events(&self) -> Option<&EventEmitter> {
        self.events.as_ref()
    }

    /// Run the pipeline over `raw_input` with a fresh state.
    ///
    /// Node failures end up in `final_state.errors`; an `Err` here is always
    /// a consistency fault in the graph, router, or registry.
    pub async fn run(&self, raw_input: impl Into<String>) -> Result<PipelineRun> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let initial = PipelineState::new(raw_input);
        let id = run_id.to_string();

        tracing::info!(run_id = %id, input_chars = initial.raw_input().len(), "Pipeline run started");
        self.emit(PipelineEvent::RunStarted {
            run_id: id.clone(),
            input_chars: initial.raw_input().chars().count(),
        });

        match self.walk(&id, initial).await {
            Ok((path, final_state)) => {
                let duration_ms = clock.elapsed().as_millis() as u64;
                tracing::info!(
                    run_id = %id,
                    nodes = path.len(),
                    errors = final_state.errors().len(),
                    duration_ms,
                    "Pipeline run completed"
                );
                self.emit(PipelineEvent::RunCompleted {
                    run_id: id,
                    path: path.clone(),
                    errors: final_state.errors().len(),
                    duration_ms,
                });
                Ok(PipelineRun {
                    run_id,
                    started_at,
                    path,
                    final_state,
                    duration_ms,
                })
            }
            Err(e) => {
                tracing::error!(run_id = %id, error = %e, "Pipeline run failed");
                self.emit(PipelineEvent::RunFailed {
                    run_id: id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn walk(
        &self,
        run_id: &str,
        mut state: PipelineState,
    ) -> Result<(Vec<NodeId>, PipelineState)> {
        let mut path: Vec<NodeId> = Vec::new();
        let mut current = ENTRY;

        loop {
            // EDGES is acyclic, so check_transition rejects a loop before this can fire.
            if path.contains(&current) {
                return Err(TriageError::Internal(format!(
                    "node '{current}' would run twice"
                )));
            }
            let node = self.registry.get(current).ok_or_else(|| {
                TriageError::Internal(format!("no node registered for '{current}'"))
            })?;

            self.emit(PipelineEvent::NodeStarted {
                run_id: run_id.to_string(),
                node: current,
            });
            let clock = Instant::now();
            state = node.run(&state).await;
            path.push(current);

            let duration_ms = clock.elapsed().as_millis() as u64;
            tracing::debug!(
                run_id,
                node = %current,
                step = %state.current_step(),
                errors = state.errors().len(),
                duration_ms,
                "Node completed"
            );
            self.emit(PipelineEvent::NodeCompleted {
                run_id: run_id.to_string(),
                node: current,
                step: state.current_step(),
                errors: state.errors().len(),
                duration_ms,
            });

            // HandleErrors always ends the run.
            if current == NodeId::HandleErrors {
                break;
            }

            let next = (self.router)(&state);
            check_transition(current, next, &state)?;
            if next.is_terminal() {
                break;
            }
            current = next;
        }

        if path.is_empty() {
            return Err(TriageError::Internal("no node ran".into()));
        }
        Ok((path, state))
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref emitter) = self.events {
            emitter.emit(event);
        }
    }
}

/// Reject a router decision the graph does not allow.
fn check_transition(from: NodeId, to: NodeId, state: &PipelineState) -> Result<()> {
    if state.has_errors() && to != NodeId::HandleErrors {
        return Err(TriageError::Internal(format!(
            "errors recorded after '{from}' but routed to '{to}'"
        )));
    }
    if to.is_terminal() && !state.has_errors() && state.current_step() != Step::OutputFormatted {
        return Err(TriageError::Internal(format!(
            "pipeline ended without output after '{from}'"
        )));
    }
    if !graph::is_edge(from, to) {
        return Err(TriageError::Internal(format!(
            "no edge from '{from}' to '{to}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
