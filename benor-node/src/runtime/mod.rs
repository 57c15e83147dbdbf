pub mod builder;
pub mod client;
pub mod harness;
pub mod readiness;
pub mod report;
