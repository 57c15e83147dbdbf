use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use benor_common::{BenOrError, ClusterConfig, NodeId, Result, RoundSync, Value};

#[derive(Parser, Debug)]
#[command(name = "benor-node")]
#[command(about = "Randomized binary Byzantine agreement, one HTTP participant per node")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a single participant
    Node {
        #[arg(long)]
        id: usize,
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Serve every participant in this process, run them and print a report
    Launch {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Run the cluster over the in-memory network and print a report
    Simulate {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Write a config file
    InitConfig {
        #[arg(long, value_name = "FILE", default_value = "config.json")]
        out: PathBuf,
        #[command(flatten)]
        cluster: ClusterArgs,
    },
}

impl Cli {
    /// Name of the audit log of this invocation.
    pub fn log_name(&self) -> String {
        match &self.command {
            Commands::Node { id, .. } => NodeId(*id).to_string(),
            Commands::Launch { .. } => "launch".into(),
            Commands::Simulate { .. } => "simulate".into(),
            Commands::InitConfig { .. } => "init".into(),
        }
    }
}

/// Config file plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// JSON config file; defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Number of participants
    #[arg(long = "nodes")]
    pub n: Option<usize>,
    /// Number of faulty participants
    #[arg(long = "faults")]
    pub f: Option<usize>,
    /// Faulty indices, e.g. `--faulty 0,3`
    #[arg(long, value_delimiter = ',')]
    pub faulty: Option<Vec<usize>>,
    /// Initial values, e.g. `--values 0,1,0,1`
    #[arg(long, value_delimiter = ',')]
    pub values: Option<Vec<u8>>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub base_port: Option<u16>,
    #[arg(long)]
    pub max_rounds: Option<u32>,
    /// Seed of the coin flips under a faulty majority
    #[arg(long)]
    pub seed: Option<u64>,
    /// Wait up to this long for N-F phase messages before counting
    #[arg(long)]
    pub await_quorum_ms: Option<u64>,
}

impl ClusterArgs {
    pub fn resolve(&self) -> Result<ClusterConfig> {
        let mut config = match &self.config {
            Some(path) => ClusterConfig::load_from_file(path)?,
            None => ClusterConfig::default(),
        };

        if let Some(n) = self.n {
            config.n = n;
        }
        if let Some(f) = self.f {
            // A count alone falls back to the default faulty tail.
            config.f = f;
            config.faulty = None;
        }
        if let Some(faulty) = &self.faulty {
            config.f = faulty.len();
            config.faulty = Some(faulty.clone());
        }
        if let Some(values) = &self.values {
            let values = values
                .iter()
                .map(|v| Value::try_from(*v))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(BenOrError::Config)?;
            config.initial_values = Some(values);
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(timeout_ms) = self.await_quorum_ms {
            config.sync = RoundSync::AwaitQuorum { timeout_ms };
        }

        config.validate()?;
        Ok(config)
    }
}
