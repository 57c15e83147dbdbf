pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{ClusterConfig, NodeConfig, RoundSync};
pub use error::{BenOrError, ConsensusError, NetworkError, Result, StartRefusal};
pub use types::{NodeState, Phase, PhaseMessage, Value};
pub use utils::NodeId;
