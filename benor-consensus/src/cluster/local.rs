use std::{
    sync::{Arc, RwLock, Weak},
    time::Duration,
};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

use benor_common::{
    ClusterConfig, ConsensusError, NetworkError, NodeId, NodeState, PhaseMessage,
    Result,
};
use benor_p2p::PhasePublisher;

use super::core::ConsensusNode;
use crate::consensus::engine::RunOutcome;

/// In-process transport: delivery is a direct call into the receiving node.
///
/// With a hold configured, a message addressed to a node that has not yet
/// reached the message's round waits (up to the hold) before delivery, which
/// models a message still in flight instead of one lost to a slow starter.
#[derive(Debug, Default)]
pub struct LocalNetwork {
    nodes: RwLock<Vec<Weak<ConsensusNode>>>,
    hold: Option<Duration>,
}

impl LocalNetwork {
    pub fn new(hold: Option<Duration>) -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
            hold,
        }
    }

    fn attach(&self, nodes: &[Arc<ConsensusNode>]) {
        if let Ok(mut slots) = self.nodes.write() {
            *slots = nodes.iter().map(Arc::downgrade).collect();
        }
    }

    fn lookup(&self, id: NodeId) -> Option<Arc<ConsensusNode>> {
        let slots = self.nodes.read().ok()?;
        slots.get(id.0).and_then(Weak::upgrade)
    }

    async fn hold_until_round(node: &ConsensusNode, k: u32, hold: Duration) {
        let mut rx = node.subscribe();
        let reached = rx.wait_for(|s| s.is_terminal() || s.k.map_or(true, |current| current >= k));
        if tokio::time::timeout(hold, reached).await.is_err() {
            debug!("{} still behind round {} after {:?}", node.id(), k, hold);
        }
    }
}

#[async_trait]
impl PhasePublisher for LocalNetwork {
    async fn send(&self, to: NodeId, msg: PhaseMessage) -> std::result::Result<(), NetworkError> {
        let node = self.lookup(to).ok_or_else(|| NetworkError::Unreachable {
            peer: to,
            reason: "not part of the local cluster".into(),
        })?;

        if let Some(hold) = self.hold {
            Self::hold_until_round(&node, msg.k, hold).await;
        }

        match node.receive(msg).await {
            Ok(_) => Ok(()),
            Err(ConsensusError::Terminal { .. }) => Err(NetworkError::Rejected { peer: to, status: 500 }),
            Err(e) => Err(NetworkError::Serialization(e.to_string())),
        }
    }
}

/// A whole cluster wired over a [`LocalNetwork`].
#[derive(Debug)]
pub struct LocalCluster {
    nodes: Vec<Arc<ConsensusNode>>,
}

impl LocalCluster {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Cluster whose network holds early messages for up to `hold`.
    pub fn with_delivery_hold(config: ClusterConfig, hold: Duration) -> Result<Self> {
        Self::build(config, Some(hold))
    }

    fn build(config: ClusterConfig, hold: Option<Duration>) -> Result<Self> {
        config.validate()?;
        let network = Arc::new(LocalNetwork::new(hold));
        let nodes: Vec<_> = config
            .node_ids()
            .map(|id| ConsensusNode::new(config.node_config(id), network.clone()))
            .collect();
        network.attach(&nodes);
        Ok(Self { nodes })
    }

    /// Starts every participant at once and waits for all round loops.
    pub async fn run(
        &self,
    ) -> Vec<(NodeId, std::result::Result<RunOutcome, ConsensusError>)> {
        let runs = self.nodes.iter().map(|node| async move { (node.id(), node.start().await) });
        join_all(runs).await
    }

    pub async fn states(&self) -> Vec<NodeState> {
        join_all(self.nodes.iter().map(|node| node.get_state())).await
    }

    pub async fn stop_all(&self) {
        join_all(self.nodes.iter().map(|node| node.stop())).await;
    }
}
