use tracing::{debug, trace};

use benor_common::{ConsensusError, PhaseMessage};

use super::core::ConsensusNode;
use crate::consensus::engine::IngestOutcome;

impl ConsensusNode {
    /// Folds a peer's phase message into the buffers of the current round.
    ///
    /// Killed and decided nodes refuse it; faulty nodes acknowledge it and
    /// do nothing; messages for another round are dropped silently.
    pub async fn receive(&self, msg: PhaseMessage) -> Result<IngestOutcome, ConsensusError> {
        let outcome = {
            let mut engine = self.engine.lock().await;
            engine.ingest(&msg)
        };

        match &outcome {
            Ok(IngestOutcome::Recorded) => {
                trace!("{} <- {} k={} phase={} x={}", self.id(), msg.sender, msg.k, msg.phase, msg.x);
                self.inbound.notify_waiters();
            }
            Ok(_) => {}
            Err(e) => debug!("{} refused message from {}: {}", self.id(), msg.sender, e),
        }
        outcome
    }
}
