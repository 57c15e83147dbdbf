//! utils
//!
//! Small identifiers shared by every crate of the workspace.

pub mod node_id;
pub use node_id::NodeId;
