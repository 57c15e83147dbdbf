//! cluster
//!
//! The async participant built around [`ConsensusEngine`](crate::ConsensusEngine):
//! message ingestion, the round loop, lifecycle and introspection, plus an
//! in-memory network for running a whole cluster inside one process.

pub mod core;
pub mod lifecycle;
pub mod local;
pub mod rounds;
pub mod voting;
