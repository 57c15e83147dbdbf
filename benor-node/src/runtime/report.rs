use serde::Serialize;

use benor_common::{ClusterConfig, NodeId, NodeState, Value};

/// Final view of one participant after a run.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub faulty: bool,
    pub outcome: String,
    pub state: NodeState,
}

/// Summary printed by the `launch` and `simulate` commands.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub n: usize,
    pub f: usize,
    pub nodes: Vec<NodeReport>,
    /// Value every correct participant decided, if they all decided the same.
    pub agreement: Option<Value>,
}

impl ClusterReport {
    pub fn new(config: &ClusterConfig, nodes: Vec<NodeReport>) -> Self {
        let agreement = agreement(&nodes);
        Self { n: config.n, f: config.f, nodes, agreement }
    }

    pub fn decided(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|node| node.state.has_decided())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn agreement(nodes: &[NodeReport]) -> Option<Value> {
    let mut correct = nodes.iter().filter(|node| !node.faulty).peekable();
    correct.peek()?;
    let mut decided = None;
    for node in correct {
        if !node.state.has_decided() {
            return None;
        }
        match (decided, node.state.x) {
            (_, None) => return None,
            (None, Some(x)) => decided = Some(x),
            (Some(d), Some(x)) if d != x => return None,
            _ => {}
        }
    }
    decided
}
