//! consensus
//!
//! Synchronous core of the randomized binary agreement protocol.
//!
//! Every round has two phases. In the first each node proposes its estimate;
//! in the second it confirms the majority it observed. When the cluster has
//! fewer than half faulty participants the second majority is decided. With
//! `2F >= N` no decision is ever safe, so the node flips a coin and tries
//! again until the round cap.
//!
//! Nothing in here performs I/O. The async node in `cluster` drives it.

pub mod engine;
pub mod evaluator;
pub mod registry;
