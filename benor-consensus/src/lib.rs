pub mod cluster;
pub mod consensus;

pub use cluster::core::{ConsensusNode, NodeStatus};
pub use cluster::local::{LocalCluster, LocalNetwork};
pub use consensus::engine::{ConsensusEngine, IngestOutcome, RoundConclusion, RunOutcome};
pub use consensus::evaluator::{MajorityEvaluator, Tally};
pub use consensus::registry::RoundBuffers;
