use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use benor_common::{NetworkError, NodeId, PhaseMessage};

/// Outbound side of the transport: deliver one phase message to one peer.
///
/// `Ok` means the peer acknowledged the message; it says nothing about
/// whether the peer buffered it.
#[async_trait]
pub trait PhasePublisher: Send + Sync {
    async fn send(&self, to: NodeId, msg: PhaseMessage) -> Result<(), NetworkError>;
}

#[async_trait]
impl<P: PhasePublisher + ?Sized> PhasePublisher for Arc<P> {
    async fn send(&self, to: NodeId, msg: PhaseMessage) -> Result<(), NetworkError> {
        (**self).send(to, msg).await
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<NetworkError>,
}

/// Sends `msg` to every participant except its sender, concurrently, and
/// returns once every attempt finished. Failures are collected, never
/// propagated: one bad peer cannot stall or abort the round.
pub async fn broadcast<P: PhasePublisher + ?Sized>(
    publisher: &P,
    n: usize,
    msg: PhaseMessage,
) -> BroadcastReport {
    let sends = (0..n)
        .map(NodeId)
        .filter(|peer| *peer != msg.sender)
        .map(|peer| publisher.send(peer, msg));

    let mut report = BroadcastReport::default();
    for result in join_all(sends).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e @ NetworkError::Rejected { .. }) => {
                debug!("broadcast k={} phase={}: {}", msg.k, msg.phase, e);
                report.failed.push(e);
            }
            Err(e) => {
                warn!("broadcast k={} phase={}: {}", msg.k, msg.phase, e);
                report.failed.push(e);
            }
        }
    }
    report
}
