use benor_common::{NodeId, Phase, Value};

/// Phase messages of the current round, one slot per participant and phase.
///
/// A later message from the same sender overwrites its slot, so a sender is
/// never counted twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundBuffers {
    propose: Vec<Option<Value>>,
    confirm: Vec<Option<Value>>,
}

impl RoundBuffers {
    pub fn new(n: usize) -> Self {
        Self {
            propose: vec![None; n],
            confirm: vec![None; n],
        }
    }

    pub fn clear(&mut self) {
        self.propose.iter_mut().for_each(|slot| *slot = None);
        self.confirm.iter_mut().for_each(|slot| *slot = None);
    }

    /// Stores `x` in the sender's slot. Returns `false` for unknown senders.
    pub fn record(&mut self, sender: NodeId, phase: Phase, x: Value) -> bool {
        match self.slots_mut(phase).get_mut(sender.0) {
            Some(slot) => {
                *slot = Some(x);
                true
            }
            None => false,
        }
    }

    pub fn phase(&self, phase: Phase) -> &[Option<Value>] {
        match phase {
            Phase::Propose => &self.propose,
            Phase::Confirm => &self.confirm,
        }
    }

    /// Number of filled slots for `phase`.
    pub fn filled(&self, phase: Phase) -> usize {
        self.phase(phase).iter().filter(|slot| slot.is_some()).count()
    }

    fn slots_mut(&mut self, phase: Phase) -> &mut Vec<Option<Value>> {
        match phase {
            Phase::Propose => &mut self.propose,
            Phase::Confirm => &mut self.confirm,
        }
    }
}
