use std::{fmt, sync::Arc};

use rand::RngCore;
use tokio::sync::{watch, Mutex, Notify};

use benor_common::{NodeConfig, NodeId, NodeState};
use benor_p2p::PhasePublisher;

use crate::consensus::engine::ConsensusEngine;

/// Configured fault-injection status, reported by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Live,
    Faulty,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Live => "live",
            NodeStatus::Faulty => "faulty",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant of the protocol.
///
/// The engine sits behind a single async mutex shared by the round loop,
/// message ingestion and introspection. The round loop never holds it while
/// broadcasting, so peers' messages are ingested between the buffer reset
/// and the majority read of the same round.
pub struct ConsensusNode {
    pub(crate) config: NodeConfig,
    pub(crate) engine: Mutex<ConsensusEngine>,
    pub(crate) publisher: Arc<dyn PhasePublisher>,
    /// Woken on every recorded message and on stop.
    pub(crate) inbound: Notify,
    pub(crate) state_tx: watch::Sender<NodeState>,
    /// At most one round loop per node.
    pub(crate) run_guard: Mutex<()>,
}

impl ConsensusNode {
    pub fn new(config: NodeConfig, publisher: Arc<dyn PhasePublisher>) -> Arc<Self> {
        Self::from_engine(ConsensusEngine::from_config(config), publisher)
    }

    /// Same as [`ConsensusNode::new`] with an explicit randomness source for
    /// the faulty-majority fallback.
    pub fn with_rng(
        config: NodeConfig,
        publisher: Arc<dyn PhasePublisher>,
        rng: Box<dyn RngCore + Send>,
    ) -> Arc<Self> {
        Self::from_engine(ConsensusEngine::new(config, rng), publisher)
    }

    fn from_engine(engine: ConsensusEngine, publisher: Arc<dyn PhasePublisher>) -> Arc<Self> {
        let (state_tx, _) = watch::channel(engine.snapshot());
        Arc::new(Self {
            config: engine.config().clone(),
            engine: Mutex::new(engine),
            publisher,
            inbound: Notify::new(),
            state_tx,
            run_guard: Mutex::new(()),
        })
    }

    pub fn id(&self) -> NodeId {
        self.config.id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_faulty(&self) -> bool {
        self.config.faulty
    }

    /// Stream of state snapshots, one per transition.
    pub fn subscribe(&self) -> watch::Receiver<NodeState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn publish_state(&self, engine: &ConsensusEngine) {
        self.state_tx.send_replace(engine.snapshot());
    }
}

impl fmt::Debug for ConsensusNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusNode")
            .field("id", &self.config.id)
            .field("faulty", &self.config.faulty)
            .finish_non_exhaustive()
    }
}
