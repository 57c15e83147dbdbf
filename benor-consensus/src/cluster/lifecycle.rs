use tracing::info;

use benor_common::NodeState;

use super::core::{ConsensusNode, NodeStatus};

impl ConsensusNode {
    /// Marks the node killed. The round loop notices at the top of its next
    /// round; repeated calls change nothing.
    pub async fn stop(&self) {
        let mut engine = self.engine.lock().await;
        if engine.kill() {
            tracing::info!(target: "consensus", "EVENT:STOP node={} k={:?}", self.id(), engine.state().k);
            info!("🔴 {} stopped", self.id());
            self.publish_state(&engine);
        }
        drop(engine);
        self.inbound.notify_waiters();
    }

    pub fn status(&self) -> NodeStatus {
        if self.config.faulty {
            NodeStatus::Faulty
        } else {
            NodeStatus::Live
        }
    }

    pub async fn get_state(&self) -> NodeState {
        self.engine.lock().await.snapshot()
    }
}
