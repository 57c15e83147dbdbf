// error.rs
use thiserror::Error;

use crate::utils::NodeId;

pub type Result<T> = std::result::Result<T, BenOrError>;

#[derive(Debug, Error)]
pub enum BenOrError {
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other: {0}")]
    Other(String),
}

/// Why a node refused to run rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRefusal {
    Faulty,
    Killed,
    Uninitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("node is in a terminal state (killed: {killed}, decided: {decided})")]
    Terminal { killed: bool, decided: bool },

    #[error("node cannot start: {0:?}")]
    CannotStart(StartRefusal),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: NodeId, reason: String },

    #[error("peer {peer} rejected the message with status {status}")]
    Rejected { peer: NodeId, status: u16 },

    #[error("serialization error: {0}")]
    Serialization(String),
}
