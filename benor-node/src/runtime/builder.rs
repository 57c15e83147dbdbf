use std::{future::Future, net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use benor_common::{ClusterConfig, NodeId, Result};
use benor_consensus::ConsensusNode;
use benor_p2p::HttpPublisher;

use crate::api::rest::{router, AppState};

/// A participant bound to its address, ready to serve the REST surface.
pub struct NodeRuntime {
    pub node: Arc<ConsensusNode>,
    listener: TcpListener,
}

impl NodeRuntime {
    /// Builds participant `id` of `config` with an HTTP publisher and binds
    /// `host:base_port + id`.
    pub async fn bind(config: &ClusterConfig, id: NodeId) -> Result<Self> {
        let publisher = Arc::new(HttpPublisher::new(config)?);
        let node = ConsensusNode::new(config.node_config(id), publisher);
        let listener = TcpListener::bind((config.host.as_str(), config.node_port(id))).await?;
        Ok(Self { node, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` resolves. `on_ready` fires once, as soon as
    /// the socket accepts connections.
    pub async fn serve<R, S>(self, on_ready: R, shutdown: S) -> Result<()>
    where
        R: FnOnce(NodeId) + Send,
        S: Future<Output = ()> + Send + 'static,
    {
        let id = self.node.id();
        let addr = self.local_addr()?;
        let app = router(AppState::new(self.node));

        info!("🌐 {} listening on {}", id, addr);
        on_ready(id);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("{} server closed", id);
        Ok(())
    }
}
