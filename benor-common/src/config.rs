//! config.rs
//!
//! Cluster-wide configuration: size, fault injection, addressing and the
//! knobs of the round loop. Loaded from and saved to JSON files.

use std::{collections::HashSet, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{BenOrError, Result},
    types::Value,
    utils::NodeId,
};

pub const DEFAULT_BASE_PORT: u16 = 3000;
pub const DEFAULT_MAX_ROUNDS: u32 = 12;

/// How a node waits for phase messages before computing a majority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoundSync {
    /// Count whatever has arrived once the broadcast returned.
    #[default]
    Immediate,
    /// Wait for `N - F` entries in the phase buffer, or until the timeout.
    AwaitQuorum { timeout_ms: u64 },
}

impl RoundSync {
    pub fn quorum_timeout(&self) -> Option<Duration> {
        match self {
            RoundSync::Immediate => None,
            RoundSync::AwaitQuorum { timeout_ms } => Some(Duration::from_millis(*timeout_ms)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub n: usize,
    pub f: usize,
    /// Explicit faulty indices. When absent the last `f` participants are faulty.
    pub faulty: Option<Vec<usize>>,
    /// One initial value per participant. When absent values alternate 0, 1, 0, ...
    pub initial_values: Option<Vec<Value>>,
    pub host: String,
    pub base_port: u16,
    pub max_rounds: u32,
    pub sync: RoundSync,
    pub seed: Option<u64>,
    pub request_timeout_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n: 4,
            f: 0,
            faulty: None,
            initial_values: None,
            host: "127.0.0.1".to_string(),
            base_port: DEFAULT_BASE_PORT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            sync: RoundSync::Immediate,
            seed: None,
            request_timeout_ms: 2000,
        }
    }
}

impl ClusterConfig {
    pub fn new(n: usize, f: usize) -> Self {
        Self {
            n,
            f,
            ..Self::default()
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ClusterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(BenOrError::Config("n must be at least 1".into()));
        }
        if self.f > self.n {
            return Err(BenOrError::Config(format!(
                "f ({}) cannot exceed n ({})",
                self.f, self.n
            )));
        }
        if let Some(faulty) = &self.faulty {
            let distinct: HashSet<_> = faulty.iter().collect();
            if distinct.len() != faulty.len() || faulty.len() != self.f {
                return Err(BenOrError::Config(format!(
                    "faulty list must hold exactly {} distinct indices",
                    self.f
                )));
            }
            if let Some(bad) = faulty.iter().find(|i| **i >= self.n) {
                return Err(BenOrError::Config(format!("faulty index {bad} out of range")));
            }
        }
        if let Some(values) = &self.initial_values {
            if values.len() != self.n {
                return Err(BenOrError::Config(format!(
                    "expected {} initial values, got {}",
                    self.n,
                    values.len()
                )));
            }
        }
        if self.base_port as usize + self.n - 1 > u16::MAX as usize {
            return Err(BenOrError::Config(format!(
                "base port {} leaves no room for {} participants",
                self.base_port, self.n
            )));
        }
        Ok(())
    }

    pub fn is_faulty(&self, id: NodeId) -> bool {
        match &self.faulty {
            Some(list) => list.contains(&id.0),
            None => id.0 >= self.n - self.f,
        }
    }

    pub fn initial_value(&self, id: NodeId) -> Value {
        match &self.initial_values {
            Some(values) => values[id.0],
            None if id.0 % 2 == 0 => Value::Zero,
            None => Value::One,
        }
    }

    /// `N - F`: the largest number of phase messages a round can gather.
    pub fn quorum_size(&self) -> usize {
        self.n - self.f
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.n).map(NodeId)
    }

    pub fn node_port(&self, id: NodeId) -> u16 {
        self.base_port + id.0 as u16
    }

    pub fn node_url(&self, id: NodeId) -> String {
        format!("http://{}:{}", self.host, self.node_port(id))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn node_config(&self, id: NodeId) -> NodeConfig {
        NodeConfig {
            id,
            n: self.n,
            f: self.f,
            initial_value: self.initial_value(id),
            faulty: self.is_faulty(id),
            max_rounds: self.max_rounds,
            sync: self.sync,
            seed: self.seed.map(|s| s.wrapping_add(id.0 as u64)),
        }
    }
}

/// Everything one participant needs to know to run the protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub id: NodeId,
    pub n: usize,
    pub f: usize,
    pub initial_value: Value,
    pub faulty: bool,
    pub max_rounds: u32,
    pub sync: RoundSync,
    pub seed: Option<u64>,
}

impl NodeConfig {
    pub fn quorum_size(&self) -> usize {
        self.n - self.f
    }

    /// `2F >= N`: too many faults for a safe deterministic decision.
    pub fn faulty_majority(&self) -> bool {
        2 * self.f >= self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_faulty_nodes_are_the_tail() {
        let config = ClusterConfig::new(5, 2);
        let faulty: Vec<bool> = config.node_ids().map(|id| config.is_faulty(id)).collect();
        assert_eq!(faulty, vec![false, false, false, true, true]);
    }

    #[test]
    fn explicit_faulty_list_overrides_tail() {
        let config = ClusterConfig {
            faulty: Some(vec![0]),
            ..ClusterConfig::new(4, 1)
        };
        assert!(config.validate().is_ok());
        assert!(config.is_faulty(NodeId(0)));
        assert!(!config.is_faulty(NodeId(3)));
    }

    #[test]
    fn addresses_are_derived_from_index() {
        let config = ClusterConfig {
            base_port: 4000,
            ..ClusterConfig::new(3, 0)
        };
        assert_eq!(config.node_port(NodeId(2)), 4002);
        assert_eq!(config.node_url(NodeId(1)), "http://127.0.0.1:4001");
    }

    #[test]
    fn validate_rejects_inconsistent_configs() {
        assert!(ClusterConfig::new(0, 0).validate().is_err());
        assert!(ClusterConfig::new(3, 4).validate().is_err());

        let wrong_values = ClusterConfig {
            initial_values: Some(vec![Value::Zero]),
            ..ClusterConfig::new(3, 0)
        };
        assert!(wrong_values.validate().is_err());

        let duplicate_faulty = ClusterConfig {
            faulty: Some(vec![1, 1]),
            ..ClusterConfig::new(4, 2)
        };
        assert!(duplicate_faulty.validate().is_err());

        let port_overflow = ClusterConfig {
            base_port: u16::MAX,
            ..ClusterConfig::new(2, 0)
        };
        assert!(port_overflow.validate().is_err());
    }

    #[test]
    fn node_config_spreads_the_seed() {
        let config = ClusterConfig {
            seed: Some(10),
            ..ClusterConfig::new(3, 2)
        };
        assert_eq!(config.node_config(NodeId(2)).seed, Some(12));
        assert!(config.node_config(NodeId(0)).faulty_majority());
    }

    #[test]
    fn round_sync_reads_tagged_json() {
        let sync: RoundSync =
            serde_json::from_str(r#"{ "mode": "await_quorum", "timeout_ms": 250 }"#).unwrap();
        assert_eq!(sync.quorum_timeout(), Some(Duration::from_millis(250)));

        let config: ClusterConfig = serde_json::from_str(r#"{ "n": 3, "f": 1 }"#).unwrap();
        assert_eq!(config.sync, RoundSync::Immediate);
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
    }
}
