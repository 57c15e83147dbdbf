use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;

use benor_common::{ClusterConfig, NetworkError, NodeId, PhaseMessage};

use crate::{message::MessageRequest, ports::PhasePublisher};

/// Delivers phase messages with `POST {peer}/message`.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: Client,
    peers: Vec<String>,
}

impl HttpPublisher {
    pub fn new(config: &ClusterConfig) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NetworkError::Serialization(format!("http client: {e}")))?;
        let peers = config.node_ids().map(|id| config.node_url(id)).collect();
        Ok(Self { client, peers })
    }

    pub fn peer_url(&self, id: NodeId) -> Option<&str> {
        self.peers.get(id.0).map(String::as_str)
    }
}

#[async_trait]
impl PhasePublisher for HttpPublisher {
    async fn send(&self, to: NodeId, msg: PhaseMessage) -> Result<(), NetworkError> {
        let base = self.peer_url(to).ok_or_else(|| NetworkError::Unreachable {
            peer: to,
            reason: "unknown participant".into(),
        })?;

        let response = self
            .client
            .post(format!("{base}/message"))
            .json(&MessageRequest::from(msg))
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable { peer: to, reason: e.to_string() })?;

        let status = response.status();
        trace!("{} -> {} k={} phase={} status={}", msg.sender, to, msg.k, msg.phase, status);
        if status.is_success() {
            Ok(())
        } else {
            Err(NetworkError::Rejected { peer: to, status: status.as_u16() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benor_common::{Phase, Value};

    #[tokio::test]
    async fn unreachable_peer_is_reported_not_raised() {
        // Nothing listens on this port range.
        let config = ClusterConfig {
            base_port: 1,
            request_timeout_ms: 200,
            ..ClusterConfig::new(2, 0)
        };
        let publisher = HttpPublisher::new(&config).unwrap();
        let msg = PhaseMessage { sender: NodeId(0), phase: Phase::Propose, k: 1, x: Value::Zero };

        let err = publisher.send(NodeId(1), msg).await.unwrap_err();
        assert!(matches!(err, NetworkError::Unreachable { peer: NodeId(1), .. }));

        let unknown = publisher.send(NodeId(7), msg).await.unwrap_err();
        assert!(matches!(unknown, NetworkError::Unreachable { peer: NodeId(7), .. }));
    }
}
