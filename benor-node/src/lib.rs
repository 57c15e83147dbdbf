pub mod api;
pub mod cli;
pub mod logging;
pub mod runtime;

pub use runtime::builder::NodeRuntime;
pub use runtime::harness::{launch, simulate};
pub use runtime::readiness::ReadinessTracker;
pub use runtime::report::ClusterReport;
