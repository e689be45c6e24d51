use std::sync::Arc;

use anyhow::{Context, Result};
use dashboard::{
    blockchain_manager::BlockchainManager,
    config::LocalConfig,
    dashboard::{detect_network, Dashboard, DashboardEvent},
    dispatcher::error_chain,
    health_server::start_health_check_server,
    terminal::{self, TerminalSurface},
    utils::{self, cancellation::CancellationToken},
};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Main entry point for the Position Dashboard
///
/// This function performs the following steps:
/// 1. Initializes the pre-run environment
/// 2. Detects the wallet network and resolves the configured markets
/// 3. Starts the health check server and the terminal command reader
/// 4. Runs the dashboard until `quit`, end of input or Ctrl-C
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_pre_run()?;

    info!("Starting the Position Dashboard");

    let local_config = Arc::new(LocalConfig::load_from_env()?);
    let surface = Arc::new(TerminalSurface::new(&local_config.assets));

    let provider = BlockchainManager::get_provider(&local_config)?;
    let wallet = BlockchainManager::get_wallet(provider.clone());

    let network = detect_network(
        wallet.as_ref(),
        surface.as_ref(),
        local_config.network.as_deref(),
    )
    .await?;

    let protocol =
        BlockchainManager::get_lending_protocol(provider, &local_config, &network.name)?;

    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let dashboard = Dashboard::new(
        wallet,
        protocol,
        surface.clone(),
        &local_config,
        network,
        events_tx.clone(),
        cancel.clone(),
    );

    // `position-dashboard connect` prompts for account access right away
    let args = std::env::args().collect::<Vec<String>>();
    if args.len() > 1 && args[1] == "connect" {
        events_tx
            .send(DashboardEvent::ConnectClicked)
            .context("Dashboard event channel closed")?;
    }

    if local_config.health_server {
        let port = local_config.health_server_port;
        let snapshot = dashboard.snapshot();
        tokio::spawn(async move {
            if let Err(e) = start_health_check_server(port, snapshot).await {
                error!("Health check server failed with error: {}", error_chain(&e));
            }
        });
    }

    let commands = tokio::spawn(terminal::read_commands(
        surface,
        events_tx,
        cancel.clone(),
    ));

    let result = tokio::select! {
        result = dashboard.run(events_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    cancel.cancel();

    match commands.await {
        Ok(Err(e)) => error!("Command reader failed with error: {}", error_chain(&e)),
        Err(e) => error!("Command reader panicked: {}", e),
        Ok(Ok(())) => {}
    }

    if let Err(e) = result {
        let error_message = error_chain(&e);
        error!("Dashboard failed with error: {}", error_message);
        return Err(anyhow::anyhow!("Dashboard failed: {}", error_message));
    }

    info!("Dashboard stopped");
    Ok(())
}

/// Initializes the pre-run environment
///
/// Loads environment variables from an optional `.env` file and sets up the logger.
fn init_pre_run() -> Result<()> {
    // variables may come from the environment alone
    dotenvy::dotenv().ok();
    utils::logger::setup_logger().context("Failed to setup logger")?;
    Ok(())
}
