use std::time::Duration;

use reqwest::{Client, StatusCode};

use benor_common::{BenOrError, ClusterConfig, NetworkError, NodeId, NodeState, Result};

/// Round loops can run a while; `/start` only answers once they end.
const START_TIMEOUT: Duration = Duration::from_secs(120);

/// Driver-side client of the participants' REST surface.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
    config: ClusterConfig,
}

/// Status code and body of a control call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlReply {
    pub status: u16,
    pub body: String,
}

impl ControlReply {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

impl ControlClient {
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(START_TIMEOUT)
            .build()
            .map_err(|e| BenOrError::Other(format!("http client: {e}")))?;
        Ok(Self { client, config: config.clone() })
    }

    pub async fn start(&self, id: NodeId) -> Result<ControlReply> {
        self.get(id, "start").await
    }

    pub async fn stop(&self, id: NodeId) -> Result<ControlReply> {
        self.get(id, "stop").await
    }

    pub async fn status(&self, id: NodeId) -> Result<ControlReply> {
        self.get(id, "status").await
    }

    pub async fn get_state(&self, id: NodeId) -> Result<NodeState> {
        let url = format!("{}/getState", self.config.node_url(id));
        let response = self.client.get(url).send().await.map_err(|e| unreachable(id, e))?;
        response
            .json::<NodeState>()
            .await
            .map_err(|e| NetworkError::Serialization(e.to_string()).into())
    }

    /// Posts a raw JSON body to `/message`, as a peer would.
    pub async fn post_message(&self, id: NodeId, body: &serde_json::Value) -> Result<ControlReply> {
        let url = format!("{}/message", self.config.node_url(id));
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(id, e))?;
        reply(response).await
    }

    async fn get(&self, id: NodeId, route: &str) -> Result<ControlReply> {
        let url = format!("{}/{}", self.config.node_url(id), route);
        let response = self.client.get(url).send().await.map_err(|e| unreachable(id, e))?;
        reply(response).await
    }
}

async fn reply(response: reqwest::Response) -> Result<ControlReply> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| NetworkError::Serialization(e.to_string()))?;
    Ok(ControlReply { status, body })
}

fn unreachable(peer: NodeId, e: reqwest::Error) -> BenOrError {
    NetworkError::Unreachable { peer, reason: e.to_string() }.into()
}
