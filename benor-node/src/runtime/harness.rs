//! Drivers that run a whole cluster: over HTTP inside one process
//! (`launch`), or over the in-memory network (`simulate`).

use std::time::Duration;

use futures::future::join_all;
use tokio::{sync::watch, task::JoinSet};
use tracing::{error, info, warn};

use benor_common::{ClusterConfig, NodeState, Result};
use benor_consensus::LocalCluster;

use super::{
    builder::NodeRuntime,
    client::ControlClient,
    readiness::ReadinessTracker,
    report::{ClusterReport, NodeReport},
};

const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Serves every participant of `config` on its own port, waits until all of
/// them accept connections, calls `GET /start` on each concurrently and
/// collects their final state. Servers are shut down before returning.
pub async fn launch(config: ClusterConfig) -> Result<ClusterReport> {
    config.validate()?;
    info!("🚀 launching {} participants (f={}) from port {}", config.n, config.f, config.base_port);

    let readiness = ReadinessTracker::new(config.n);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = JoinSet::new();

    for id in config.node_ids() {
        let runtime = NodeRuntime::bind(&config, id).await?;
        let tracker = readiness.clone();
        let mut stop = shutdown_rx.clone();
        let shutdown = async move {
            let _ = stop.wait_for(|stop| *stop).await;
        };
        servers.spawn(runtime.serve(move |id| tracker.mark_ready(id), shutdown));
    }

    let result = drive(&config, &readiness).await;

    let _ = shutdown_tx.send(true);
    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("server error: {}", e),
            Err(e) => error!("server task failed: {}", e),
        }
    }
    result
}

async fn drive(config: &ClusterConfig, readiness: &ReadinessTracker) -> Result<ClusterReport> {
    readiness.wait_all(READY_TIMEOUT).await?;
    info!("✅ all participants ready, starting rounds");

    let client = ControlClient::new(config)?;
    let replies = join_all(config.node_ids().map(|id| client.start(id))).await;

    let mut nodes = Vec::with_capacity(config.n);
    for (id, reply) in config.node_ids().zip(replies) {
        let outcome = match reply {
            Ok(reply) => reply.body,
            Err(e) => format!("unreachable: {e}"),
        };
        let state = match client.get_state(id).await {
            Ok(state) => state,
            Err(e) => {
                warn!("{}: could not read state: {}", id, e);
                NodeState::faulty()
            }
        };
        nodes.push(NodeReport { id, faulty: config.is_faulty(id), outcome, state });
    }
    Ok(ClusterReport::new(config, nodes))
}

/// Same experiment as [`launch`] without sockets.
pub async fn simulate(config: ClusterConfig) -> Result<ClusterReport> {
    let cluster = match config.sync.quorum_timeout() {
        Some(hold) => LocalCluster::with_delivery_hold(config.clone(), hold)?,
        None => LocalCluster::new(config.clone())?,
    };
    info!("🧪 simulating {} participants (f={}) in memory", config.n, config.f);

    let outcomes = cluster.run().await;
    let states = cluster.states().await;

    let nodes = outcomes
        .into_iter()
        .zip(states)
        .map(|((id, outcome), state)| NodeReport {
            id,
            faulty: config.is_faulty(id),
            outcome: match outcome {
                Ok(outcome) => outcome.to_string(),
                Err(e) => e.to_string(),
            },
            state,
        })
        .collect();
    Ok(ClusterReport::new(&config, nodes))
}
