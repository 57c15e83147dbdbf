use std::pin::pin;

use tracing::{debug, info};

use benor_common::{ConsensusError, Phase, Value};
use benor_p2p::broadcast;

use super::core::ConsensusNode;
use crate::consensus::{
    engine::{RoundConclusion, RunOutcome},
    evaluator::Tally,
};

impl ConsensusNode {
    /// Runs rounds until the node decides, is stopped or hits the round cap.
    ///
    /// Calls on the same node are serialized; a call made after the node
    /// decided returns right away with the decision.
    pub async fn start(&self) -> Result<RunOutcome, ConsensusError> {
        let _running = self.run_guard.lock().await;
        self.engine.lock().await.check_start()?;

        let id = self.id();
        let n = self.config.n;
        info!("▶️ {} starting rounds (n={}, f={})", id, n, self.config.f);

        loop {
            let propose = {
                let mut engine = self.engine.lock().await;
                let msg = engine.begin_round();
                self.publish_state(&engine);
                msg
            };
            let Some(propose) = propose else { break };
            let k = propose.k;
            tracing::info!(target: "consensus", "EVENT:ROUND node={} k={} x={}", id, k, propose.x);

            // Phase 1
            let report = broadcast(&*self.publisher, n, propose).await;
            debug!("{} k={} phase=1 delivered={} failed={}", id, k, report.delivered, report.failed.len());
            self.await_quorum(Phase::Propose).await;

            let confirm = {
                let mut engine = self.engine.lock().await;
                engine.confirm()
            };
            let Some((confirm, tally)) = confirm else { break };
            self.log_majority(Phase::Propose, k, confirm.x, tally);

            // Phase 2
            let report = broadcast(&*self.publisher, n, confirm).await;
            debug!("{} k={} phase=2 delivered={} failed={}", id, k, report.delivered, report.failed.len());
            if !self.config.faulty_majority() {
                self.await_quorum(Phase::Confirm).await;
            }

            let conclusion = {
                let mut engine = self.engine.lock().await;
                let conclusion = engine.conclude_round();
                self.publish_state(&engine);
                conclusion
            };
            match conclusion {
                (RoundConclusion::Randomized(x), _) => {
                    tracing::info!(target: "consensus", "EVENT:RANDOMIZE node={} k={} x={}", id, k, x);
                }
                (RoundConclusion::Decided(x), tally) => {
                    self.log_majority(Phase::Confirm, k, x, tally);
                    tracing::info!(target: "consensus", "EVENT:DECIDE node={} k={} x={}", id, k, x);
                    info!("🎉 {} decided {} in round {}", id, x, k);
                }
            }
        }

        let outcome = self.engine.lock().await.outcome();
        info!("⏹️ {} finished: {}", id, outcome);
        Ok(outcome)
    }

    fn log_majority(&self, phase: Phase, k: u32, value: Value, tally: Tally) {
        tracing::info!(
            target: "consensus",
            "EVENT:MAJORITY node={} k={} phase={} value={} c0={} c1={}",
            self.id(), k, phase, value, tally.zeros, tally.ones
        );
    }

    /// With `AwaitQuorum`, parks until `N - F` slots of `phase` are filled,
    /// the node is killed, or the timeout fires. A no-op with `Immediate`.
    async fn await_quorum(&self, phase: Phase) {
        let Some(timeout) = self.config.sync.quorum_timeout() else {
            return;
        };
        let quorum = self.config.quorum_size();

        let wait = async {
            loop {
                let mut notified = pin!(self.inbound.notified());
                notified.as_mut().enable();
                {
                    let engine = self.engine.lock().await;
                    if engine.buffered(phase) >= quorum || engine.state().killed {
                        return;
                    }
                }
                notified.await;
            }
        };

        if tokio::time::timeout(timeout, wait).await.is_err() {
            let filled = self.engine.lock().await.buffered(phase);
            debug!("{} phase={} quorum wait timed out with {}/{}", self.id(), phase, filled, quorum);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use rand::rngs::mock::StepRng;
    use tokio::sync::Mutex;

    use benor_common::{ClusterConfig, NetworkError, NodeId, PhaseMessage};
    use benor_p2p::PhasePublisher;

    use super::*;

    #[derive(Clone, Default)]
    struct MockPublisher {
        sent: Arc<Mutex<Vec<(NodeId, PhaseMessage)>>>,
        down: Vec<NodeId>,
        latency: Option<Duration>,
    }

    #[async_trait]
    impl PhasePublisher for MockPublisher {
        async fn send(&self, to: NodeId, msg: PhaseMessage) -> Result<(), NetworkError> {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.sent.lock().await.push((to, msg));
            if self.down.contains(&to) {
                return Err(NetworkError::Unreachable { peer: to, reason: "connection refused".into() });
            }
            Ok(())
        }
    }

    fn node(cluster: ClusterConfig, publisher: &MockPublisher) -> Arc<ConsensusNode> {
        ConsensusNode::new(cluster.node_config(NodeId(0)), Arc::new(publisher.clone()))
    }

    fn faulty_majority() -> ClusterConfig {
        ClusterConfig { seed: Some(3), ..ClusterConfig::new(3, 2) }
    }

    #[tokio::test]
    async fn overlapping_starts_run_a_single_loop() {
        let publisher = MockPublisher { latency: Some(Duration::from_millis(2)), ..Default::default() };
        let node = node(faulty_majority(), &publisher);

        let (a, b) = tokio::join!(node.start(), node.start());

        assert_eq!(a, Ok(RunOutcome::RoundLimit));
        assert_eq!(b, Ok(RunOutcome::RoundLimit));
        assert_eq!(node.get_state().await.k, Some(12));
        // 12 rounds, 2 phases, 2 peers.
        assert_eq!(publisher.sent.lock().await.len(), 12 * 2 * 2);
    }

    #[tokio::test]
    async fn stop_ends_the_loop_at_the_next_round() {
        let publisher = MockPublisher { latency: Some(Duration::from_millis(20)), ..Default::default() };
        let node = node(faulty_majority(), &publisher);

        let runner = tokio::spawn({
            let node = node.clone();
            async move { node.start().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        node.stop().await;

        assert_eq!(runner.await.unwrap(), Ok(RunOutcome::Killed));
        let state = node.get_state().await;
        assert!(state.killed);
        assert_eq!(state.decided, Some(false));
        let k = state.k.unwrap();
        assert!((1..12).contains(&k), "stopped at k={k}");

        // The interrupted round still sent both phases; nothing after it.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(node.get_state().await.k, Some(k));
        assert_eq!(publisher.sent.lock().await.len(), k as usize * 2 * 2);
    }

    #[tokio::test]
    async fn unreachable_peer_does_not_abort_the_round() {
        let publisher = MockPublisher { down: vec![NodeId(2)], ..Default::default() };
        let node = node(ClusterConfig::new(3, 0), &publisher);

        // Only its own votes arrive: no value clears (N - F) / 2, so 1 wins.
        assert_eq!(node.start().await, Ok(RunOutcome::Decided(Value::One)));
        let state = node.get_state().await;
        assert_eq!(state.k, Some(1));
        assert_eq!(state.x, Some(Value::One));

        let sent = publisher.sent.lock().await;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent.iter().filter(|(to, _)| *to == NodeId(2)).count(), 2);
    }

    #[tokio::test]
    async fn phase_messages_follow_a_fixed_coin() {
        let publisher = MockPublisher::default();
        let cluster = ClusterConfig {
            initial_values: Some(vec![Value::Zero; 3]),
            ..ClusterConfig::new(3, 2)
        };
        // A zero draw always lands below the 1/2 cut: every flip is 1.
        let node = ConsensusNode::with_rng(
            cluster.node_config(NodeId(0)),
            Arc::new(publisher.clone()),
            Box::new(StepRng::new(0, 0)),
        );

        assert_eq!(node.start().await, Ok(RunOutcome::RoundLimit));
        assert_eq!(node.get_state().await.x, Some(Value::One));

        let sent = publisher.sent.lock().await;
        assert_eq!(sent.len(), 48);
        for (i, (to, msg)) in sent.iter().enumerate() {
            let round = (i / 4) as u32 + 1;
            let expected_phase = if i % 4 < 2 { Phase::Propose } else { Phase::Confirm };
            let expected_x = if round == 1 { Value::Zero } else { Value::One };
            assert_ne!(*to, NodeId(0));
            assert_eq!(msg.sender, NodeId(0));
            assert_eq!((msg.k, msg.phase, msg.x), (round, expected_phase, expected_x), "send {i}");
        }
    }
}
