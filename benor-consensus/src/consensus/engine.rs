use std::fmt;

use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::debug;

use benor_common::{
    ConsensusError, NodeConfig, NodeState, Phase, PhaseMessage, StartRefusal, Value,
};

use super::{
    evaluator::{MajorityEvaluator, Tally},
    registry::RoundBuffers,
};

/// What happened to an inbound phase message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored in the buffer of the current round.
    Recorded,
    /// Tagged for another round (or from an unknown sender) and dropped.
    Stale,
    /// Acknowledged by a faulty node without touching any state.
    FaultySink,
}

/// End of the second phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundConclusion {
    Decided(Value),
    /// `2F >= N`: the estimate was replaced by a coin flip.
    Randomized(Value),
}

/// Terminal state reached by a round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Decided(Value),
    Killed,
    RoundLimit,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Decided(v) => write!(f, "decided {v}"),
            RunOutcome::Killed => write!(f, "killed"),
            RunOutcome::RoundLimit => write!(f, "round limit reached"),
        }
    }
}

/// Per-node protocol state: estimate, round counter, decision flag and the
/// phase buffers of the current round.
///
/// Every transition of the protocol goes through this type; the async node
/// only decides when to call them.
pub struct ConsensusEngine {
    config: NodeConfig,
    state: NodeState,
    buffers: RoundBuffers,
    evaluator: MajorityEvaluator,
    rng: Box<dyn RngCore + Send>,
}

impl fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

impl ConsensusEngine {
    pub fn new(config: NodeConfig, rng: Box<dyn RngCore + Send>) -> Self {
        let state = if config.faulty {
            NodeState::faulty()
        } else {
            NodeState::correct(config.initial_value)
        };
        Self {
            buffers: RoundBuffers::new(config.n),
            evaluator: MajorityEvaluator::new(config.n, config.f),
            state,
            config,
            rng,
        }
    }

    /// Uses the configured seed when there is one, OS entropy otherwise.
    pub fn from_config(config: NodeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, Box::new(rng))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Owned copy of the state, safe to hand out while rounds keep running.
    pub fn snapshot(&self) -> NodeState {
        self.state.clone()
    }

    pub fn buffers(&self) -> &RoundBuffers {
        &self.buffers
    }

    pub fn buffered(&self, phase: Phase) -> usize {
        self.buffers.filled(phase)
    }

    pub fn ingest(&mut self, msg: &PhaseMessage) -> Result<IngestOutcome, ConsensusError> {
        if self.state.is_terminal() {
            return Err(ConsensusError::Terminal {
                killed: self.state.killed,
                decided: self.state.has_decided(),
            });
        }
        if self.config.faulty {
            return Ok(IngestOutcome::FaultySink);
        }
        if self.state.k != Some(msg.k) {
            debug!(
                "{} dropped k={} phase={} from {} (current k={:?})",
                self.config.id, msg.k, msg.phase, msg.sender, self.state.k
            );
            return Ok(IngestOutcome::Stale);
        }
        if self.buffers.record(msg.sender, msg.phase, msg.x) {
            Ok(IngestOutcome::Recorded)
        } else {
            Ok(IngestOutcome::Stale)
        }
    }

    pub fn check_start(&self) -> Result<(), ConsensusError> {
        let refusal = if self.config.faulty {
            StartRefusal::Faulty
        } else if self.state.killed {
            StartRefusal::Killed
        } else if self.state.x.is_none() || self.state.k.is_none() {
            StartRefusal::Uninitialized
        } else {
            return Ok(());
        };
        Err(ConsensusError::CannotStart(refusal))
    }

    /// Not decided, not killed and below the round cap.
    pub fn can_continue(&self) -> bool {
        !self.state.killed
            && !self.state.has_decided()
            && self.state.k.is_some_and(|k| k < self.config.max_rounds)
    }

    /// Advances `k`, clears the buffers and returns this node's phase-1
    /// message, already counted in its own buffer. `None` once the loop
    /// has to stop.
    pub fn begin_round(&mut self) -> Option<PhaseMessage> {
        if !self.can_continue() {
            return None;
        }
        let (Some(k), Some(x)) = (self.state.k, self.state.x) else {
            return None;
        };
        let k = k + 1;
        self.state.k = Some(k);
        self.buffers.clear();

        let msg = PhaseMessage {
            sender: self.config.id,
            phase: Phase::Propose,
            k,
            x,
        };
        self.buffers.record(msg.sender, msg.phase, msg.x);
        Some(msg)
    }

    /// Majority of phase 1, wrapped as this node's phase-2 message and
    /// counted in its own buffer.
    pub fn confirm(&mut self) -> Option<(PhaseMessage, Tally)> {
        let k = self.state.k?;
        let (v1, tally) = self.evaluator.evaluate(self.buffers.phase(Phase::Propose));
        let msg = PhaseMessage {
            sender: self.config.id,
            phase: Phase::Confirm,
            k,
            x: v1,
        };
        self.buffers.record(msg.sender, msg.phase, msg.x);
        Some((msg, tally))
    }

    pub fn conclude_round(&mut self) -> (RoundConclusion, Tally) {
        if self.config.faulty_majority() {
            let x = Value::random(&mut *self.rng);
            self.state.x = Some(x);
            return (RoundConclusion::Randomized(x), Tally::default());
        }
        let (v2, tally) = self.evaluator.evaluate(self.buffers.phase(Phase::Confirm));
        self.state.x = Some(v2);
        self.state.decided = Some(true);
        (RoundConclusion::Decided(v2), tally)
    }

    /// Returns `true` only on the first call.
    pub fn kill(&mut self) -> bool {
        let first = !self.state.killed;
        self.state.killed = true;
        first
    }

    pub fn outcome(&self) -> RunOutcome {
        match (self.state.has_decided(), self.state.x) {
            (true, Some(x)) => RunOutcome::Decided(x),
            _ if self.state.killed => RunOutcome::Killed,
            _ => RunOutcome::RoundLimit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benor_common::{ClusterConfig, NodeId};

    fn engine(n: usize, f: usize, id: usize, x: Value) -> ConsensusEngine {
        let cluster = ClusterConfig {
            initial_values: Some(vec![x; n]),
            seed: Some(42),
            ..ClusterConfig::new(n, f)
        };
        ConsensusEngine::from_config(cluster.node_config(NodeId(id)))
    }

    fn msg(sender: usize, phase: Phase, k: u32, x: Value) -> PhaseMessage {
        PhaseMessage { sender: NodeId(sender), phase, k, x }
    }

    #[test]
    fn initial_state_of_correct_and_faulty_nodes() {
        assert_eq!(engine(4, 1, 0, Value::One).snapshot(), NodeState::correct(Value::One));
        assert_eq!(engine(4, 1, 3, Value::One).snapshot(), NodeState::faulty());
    }

    #[test]
    fn only_messages_for_the_current_round_are_buffered() {
        let mut e = engine(4, 0, 0, Value::Zero);
        e.begin_round().unwrap();
        e.begin_round().unwrap();
        assert_eq!(e.state().k, Some(2));

        assert_eq!(e.ingest(&msg(1, Phase::Propose, 1, Value::One)), Ok(IngestOutcome::Stale));
        assert_eq!(e.ingest(&msg(1, Phase::Propose, 3, Value::One)), Ok(IngestOutcome::Stale));
        assert_eq!(e.ingest(&msg(1, Phase::Propose, 2, Value::One)), Ok(IngestOutcome::Recorded));
        // own proposal plus node 1
        assert_eq!(e.buffered(Phase::Propose), 2);
    }

    #[test]
    fn faulty_node_is_an_inert_sink() {
        let mut e = engine(4, 1, 3, Value::Zero);
        for k in 0..5 {
            assert_eq!(
                e.ingest(&msg(0, Phase::Propose, k, Value::One)),
                Ok(IngestOutcome::FaultySink)
            );
        }
        assert_eq!(e.check_start(), Err(ConsensusError::CannotStart(StartRefusal::Faulty)));
        assert!(e.begin_round().is_none());
        assert_eq!(e.snapshot(), NodeState::faulty());
    }

    #[test]
    fn decided_node_refuses_messages_and_keeps_buffers() {
        let mut e = engine(1, 0, 0, Value::Zero);
        e.begin_round().unwrap();
        e.confirm().unwrap();
        assert_eq!(e.conclude_round().0, RoundConclusion::Decided(Value::Zero));

        let before = e.buffers().clone();
        assert_eq!(
            e.ingest(&msg(0, Phase::Confirm, 1, Value::One)),
            Err(ConsensusError::Terminal { killed: false, decided: true })
        );
        assert_eq!(e.buffers(), &before);
        assert!(e.begin_round().is_none());
        assert_eq!(e.outcome(), RunOutcome::Decided(Value::Zero));
    }

    #[test]
    fn killed_node_cannot_start_and_kill_is_idempotent() {
        let mut e = engine(3, 0, 0, Value::One);
        assert!(e.kill());
        assert!(!e.kill());
        assert!(e.snapshot().killed);
        assert_eq!(e.check_start(), Err(ConsensusError::CannotStart(StartRefusal::Killed)));
        assert_eq!(e.outcome(), RunOutcome::Killed);
    }

    #[test]
    fn round_counter_stops_at_the_cap() {
        let mut e = engine(3, 2, 0, Value::One);
        let mut rounds = 0;
        while let Some(m) = e.begin_round() {
            rounds += 1;
            assert_eq!(m.k, rounds);
            e.confirm().unwrap();
            assert!(matches!(e.conclude_round().0, RoundConclusion::Randomized(_)));
        }
        assert_eq!(rounds, 12);
        assert_eq!(e.state().k, Some(12));
        assert_eq!(e.state().decided, Some(false));
        assert_eq!(e.outcome(), RunOutcome::RoundLimit);
    }

    #[test]
    fn majorities_of_both_phases_drive_the_decision() {
        // Node 3 of N=4, F=0 starts with 1 but sees three zeros.
        let mut e = engine(4, 0, 3, Value::One);
        let propose = e.begin_round().unwrap();
        assert_eq!(propose.x, Value::One);
        for sender in 0..3 {
            e.ingest(&msg(sender, Phase::Propose, 1, Value::Zero)).unwrap();
        }

        let (confirm, tally) = e.confirm().unwrap();
        assert_eq!(confirm.x, Value::Zero);
        assert_eq!(tally, Tally { zeros: 3, ones: 1 });

        for sender in 0..3 {
            e.ingest(&msg(sender, Phase::Confirm, 1, Value::Zero)).unwrap();
        }
        assert_eq!(e.conclude_round().0, RoundConclusion::Decided(Value::Zero));
        assert_eq!(e.state().x, Some(Value::Zero));
    }
}
