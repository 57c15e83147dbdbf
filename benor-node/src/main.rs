use clap::Parser;
use tracing::{error, info};

use benor_common::{ClusterConfig, NodeId};
use benor_node::{
    cli::{Cli, Commands},
    launch, logging, simulate, NodeRuntime,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::install_panic_hook();
    let _guard = logging::init(&cli.log_name());

    match cli.command {
        Commands::Node { id, cluster } => {
            let config = cluster.resolve()?;
            run_node(config, NodeId(id)).await?;
        }
        Commands::Launch { cluster } => {
            let report = launch(cluster.resolve()?).await?;
            println!("{}", report.to_json());
        }
        Commands::Simulate { cluster } => {
            let report = simulate(cluster.resolve()?).await?;
            println!("{}", report.to_json());
        }
        Commands::InitConfig { out, cluster } => {
            let config = cluster.resolve()?;
            config.save_to_file(&out)?;
            info!("✅ config written to {}", out.display());
        }
    }
    Ok(())
}

async fn run_node(config: ClusterConfig, id: NodeId) -> Result<(), Box<dyn std::error::Error>> {
    if id.0 >= config.n {
        return Err(format!("participant {} outside of a {}-node cluster", id.0, config.n).into());
    }
    info!("--- STARTING {} ---", id);
    info!("faulty: {}, initial value: {}", config.is_faulty(id), config.initial_value(id));

    let runtime = NodeRuntime::bind(&config, id).await.map_err(|e| {
        error!("Failed to bind {} on port {}: {}", id, config.node_port(id), e);
        e
    })?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("ctrl-c handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };
    runtime
        .serve(|id| info!("✅ {} ready. Press Ctrl+C to stop.", id), shutdown)
        .await?;
    Ok(())
}
