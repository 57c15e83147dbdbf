use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use benor_common::{BenOrError, NodeId, Result};

/// Tracks which participants are accepting connections, so a driver only
/// triggers rounds once the whole cluster can be reached.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    tx: Arc<watch::Sender<Vec<bool>>>,
}

impl ReadinessTracker {
    pub fn new(n: usize) -> Self {
        let (tx, _) = watch::channel(vec![false; n]);
        Self { tx: Arc::new(tx) }
    }

    pub fn mark_ready(&self, id: NodeId) {
        self.tx.send_modify(|ready| {
            if let Some(slot) = ready.get_mut(id.0) {
                *slot = true;
            }
        });
    }

    pub fn all_ready(&self) -> bool {
        self.tx.borrow().iter().all(|ready| *ready)
    }

    pub async fn wait_all(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.tx.subscribe();
        let all = rx.wait_for(|ready| ready.iter().all(|r| *r));
        let result = match tokio::time::timeout(timeout, all).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BenOrError::Other(format!("readiness channel closed: {e}"))),
            Err(_) => {
                let pending: Vec<usize> = self
                    .tx
                    .borrow()
                    .iter()
                    .enumerate()
                    .filter(|(_, ready)| !**ready)
                    .map(|(i, _)| i)
                    .collect();
                Err(BenOrError::Other(format!("participants {pending:?} not ready after {timeout:?}")))
            }
        };
        result
    }
}
