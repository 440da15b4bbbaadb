//! Fixed pipeline topology: node identifiers, edges, and renderers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    ParseTasks,
    PrioritizeTasks,
    FormatOutput,
    HandleErrors,
    Terminal,
}

impl NodeId {
    pub const ALL: [NodeId; 5] = [
        NodeId::ParseTasks,
        NodeId::PrioritizeTasks,
        NodeId::FormatOutput,
        NodeId::HandleErrors,
        NodeId::Terminal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::ParseTasks => "parse_tasks",
            NodeId::PrioritizeTasks => "prioritize_tasks",
            NodeId::FormatOutput => "format_output",
            NodeId::HandleErrors => "handle_errors",
            NodeId::Terminal => "__end__",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == NodeId::Terminal
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// A permitted transition, labelled with the state that selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: &'static str,
}

pub const ENTRY: NodeId = NodeId::ParseTasks;

pub static EDGES: [Edge; 7] = [
    Edge { from: NodeId::ParseTasks, to: NodeId::PrioritizeTasks, label: "tasks_parsed" },
    Edge { from: NodeId::ParseTasks, to: NodeId::HandleErrors, label: "errors" },
    Edge { from: NodeId::PrioritizeTasks, to: NodeId::FormatOutput, label: "tasks_prioritized" },
    Edge { from: NodeId::PrioritizeTasks, to: NodeId::HandleErrors, label: "errors" },
    Edge { from: NodeId::FormatOutput, to: NodeId::Terminal, label: "output_formatted" },
    Edge { from: NodeId::FormatOutput, to: NodeId::HandleErrors, label: "errors" },
    Edge { from: NodeId::HandleErrors, to: NodeId::Terminal, label: "" },
];

pub fn successors(from: NodeId) -> impl Iterator<Item = NodeId> {
    EDGES.iter().filter(move |e| e.from == from).map(|e| e.to)
}

pub fn is_edge(from: NodeId, to: NodeId) -> bool {
    successors(from).any(|n| n == to)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Mermaid flowchart of the pipeline.
pub fn to_mermaid() -> String {
    let mut out = String::from("graph TD;\n");
    out.push_str("    __start__([start]) --> parse_tasks;\n");
    for node in NodeId::ALL.iter().filter(|n| !n.is_terminal()) {
        out.push_str(&format!("    {node}({node})\n"));
    }
    out.push_str("    __end__([end])\n");
    for edge in &EDGES {
        if edge.label.is_empty() {
            out.push_str(&format!("    {} --> {};\n", edge.from, edge.to));
        } else {
            out.push_str(&format!(
                "    {} -. {} .-> {};\n",
                edge.from, edge.label, edge.to
            ));
        }
    }
    out
}

/// Graphviz DOT digraph of the pipeline.
pub fn to_dot() -> String {
    let mut out = String::from("digraph task_prioritizer {\n    rankdir=TB;\n");
    out.push_str("    start [shape=Mdiamond];\n");
    for node in NodeId::ALL {
        let shape = if node.is_terminal() { "Msquare" } else { "box" };
        out.push_str(&format!("    {node} [shape={shape}];\n"));
    }
    out.push_str(&format!("    start -> {ENTRY};\n"));
    for edge in &EDGES {
        if edge.label.is_empty() {
            out.push_str(&format!("    {} -> {};\n", edge.from, edge.to));
        } else {
            out.push_str(&format!(
                "    {} -> {} [label=\"{}\"];\n",
                edge.from, edge.to, edge.label
            ));
        }
    }
    out.push_str("}\n");
    out
}
