//! Node trait, dynamic dispatch wrapper, and node registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use triage_llm::ChatModel;
use triage_types::PipelineState;

use crate::graph::NodeId;
use crate::nodes::{FormatOutputNode, HandleErrorsNode, ParseTasksNode, PrioritizeTasksNode};

// ---------------------------------------------------------------------------
// Node trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Node: Send + Sync {
    /// The graph position this node fills.
    fn id(&self) -> NodeId;

    /// Derive the next snapshot from `state`.
    ///
    /// Failures are recorded in the returned state's `errors`; a node never
    /// returns an error of its own.
    async fn run(&self, state: &PipelineState) -> PipelineState;
}

// ---------------------------------------------------------------------------
// DynNode — object-safe wrapper
// ---------------------------------------------------------------------------

pub struct DynNode(Box<dyn Node>);

impl DynNode {
    pub fn new(node: impl Node + 'static) -> Self {
        Self(Box::new(node))
    }

    pub fn id(&self) -> NodeId {
        self.0.id()
    }

    pub async fn run(&self, state: &PipelineState) -> PipelineState {
        self.0.run(state).await
    }
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, DynNode>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under its own id, replacing any previous entry.
    pub fn register(&mut self, node: impl Node + 'static) {
        self.nodes.insert(node.id(), DynNode::new(node));
    }

    pub fn get(&self, id: NodeId) -> Option<&DynNode> {
        self.nodes.get(&id)
    }

    pub fn has(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Registry with the four built-in nodes sharing one model.
pub fn default_registry(model: Arc<dyn ChatModel>) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(ParseTasksNode::new(model.clone()));
    registry.register(PrioritizeTasksNode::new(model.clone()));
    registry.register(FormatOutputNode::new(model));
    registry.register(HandleErrorsNode);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_llm::ScriptedModel;

    struct EchoNode;

    #[async_trait]
    impl Node for EchoNode {
        fn id(&self) -> NodeId {
            NodeId::FormatOutput
        }

        async fn run(&self, state: &PipelineState) -> PipelineState {
            state.clone().with_formatted_output(state.raw_input())
        }
    }

    #[test]
    fn default_registry_has_every_runnable_node() {
        let reg = default_registry(Arc::new(ScriptedModel::new()));
        assert_eq!(reg.len(), 4);
        for id in NodeId::ALL.iter().filter(|n| !n.is_terminal()) {
            assert!(reg.has(*id), "missing {id}");
        }
        assert!(!reg.has(NodeId::Terminal));
    }

    #[tokio::test]
    async fn register_replaces_by_id() {
        let mut reg = default_registry(Arc::new(ScriptedModel::new()));
        reg.register(EchoNode);
        assert_eq!(reg.len(), 4);

        let node = reg.get(NodeId::FormatOutput).unwrap();
        let out = node.run(&PipelineState::new("hello")).await;
        assert_eq!(out.output(), "hello");
    }

    #[test]
    fn empty_registry() {
        let reg = NodeRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.get(NodeId::ParseTasks).is_none());
    }
}
