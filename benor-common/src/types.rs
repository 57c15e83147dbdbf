use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::utils::NodeId;

/// Binary value proposed, confirmed and eventually decided by the nodes.
///
/// Travels on the wire as the bare integers `0` and `1`; anything else is
/// rejected during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Value {
    Zero,
    One,
}

impl Value {
    /// Fair coin flip, used when a node cannot safely converge.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Value::One
        } else {
            Value::Zero
        }
    }

    pub fn as_u8(self) -> u8 {
        self.into()
    }
}

impl From<Value> for u8 {
    fn from(v: Value) -> Self {
        match v {
            Value::Zero => 0,
            Value::One => 1,
        }
    }
}

impl TryFrom<u8> for Value {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            other => Err(format!("value out of binary domain: {other}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// The two steps of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    /// Phase 1: every node proposes its current estimate.
    Propose,
    /// Phase 2: every node confirms the majority it saw in phase 1.
    Confirm,
}

impl From<Phase> for u8 {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Propose => 1,
            Phase::Confirm => 2,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::Propose),
            2 => Ok(Phase::Confirm),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A phase-tagged vote for round `k`. Exists only in flight; the receiver
/// folds it into its round buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMessage {
    pub sender: NodeId,
    pub phase: Phase,
    pub k: u32,
    pub x: Value,
}

/// Local view of one participant.
///
/// Faulty participants keep `x`, `decided` and `k` unset forever; they are
/// serialized as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub killed: bool,
    pub x: Option<Value>,
    pub decided: Option<bool>,
    pub k: Option<u32>,
}

impl NodeState {
    pub fn correct(initial: Value) -> Self {
        Self {
            killed: false,
            x: Some(initial),
            decided: Some(false),
            k: Some(0),
        }
    }

    pub fn faulty() -> Self {
        Self {
            killed: false,
            x: None,
            decided: None,
            k: None,
        }
    }

    pub fn has_decided(&self) -> bool {
        self.decided == Some(true)
    }

    /// Killed or decided: the node refuses every further message.
    pub fn is_terminal(&self) -> bool {
        self.killed || self.has_decided()
    }
}
