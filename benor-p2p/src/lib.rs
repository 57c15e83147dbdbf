pub mod http;
pub mod message;
pub mod ports;

pub use benor_common::NetworkError;
pub use http::HttpPublisher;
pub use message::{MessageRequest, MessageValue};
pub use ports::{broadcast, BroadcastReport, PhasePublisher};
