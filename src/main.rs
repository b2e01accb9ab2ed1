use clap::Parser as _;
use da_disperser::batcher::run_batcher;
use da_disperser::cli::{Cli, Commands};
use da_disperser::server::run_dispersal_server;
use da_disperser::utils::logging::init_logging;
use dotenvy::dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Server { run_command } => {
            info!("starting dispersal server");
            if let Err(e) = run_dispersal_server(run_command).await {
                error!(error = %e, error_chain = ?e, "dispersal server exited with error");
                std::process::exit(1);
            }
        }
        Commands::Batcher { run_command } => {
            info!("starting batcher");
            if let Err(e) = run_batcher(run_command).await {
                error!(error = %e, error_chain = ?e, "batcher exited with error");
                std::process::exit(1);
            }
        }
    }
}
