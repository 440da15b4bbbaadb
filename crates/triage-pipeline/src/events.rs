//! Run progress events.
//!
//! Emits [`PipelineEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! observers (the CLI's `--events` stream, tests) can follow a run without
//! coupling to the executor.

use serde::{Deserialize, Serialize};
use triage_types::Step;

use crate::graph::NodeId;

/// Events emitted while a run is executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: String,
        input_chars: usize,
    },
    NodeStarted {
        run_id: String,
        node: NodeId,
    },
    NodeCompleted {
        run_id: String,
        node: NodeId,
        step: Step,
        errors: usize,
        duration_ms: u64,
    },
    RunCompleted {
        run_id: String,
        path: Vec<NodeId>,
        errors: usize,
        duration_ms: u64,
    },
    RunFailed {
        run_id: String,
        error: String,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Send to current subscribers. Dropped when nobody is listening.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(64)
    }
}
