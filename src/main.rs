//! Safe/Roles operator for Superform vault actions
//!
//! # WARNING
//! Every mutating subcommand submits a real transaction through the Roles
//! module of the given Safe. Double-check the Safe, Roles, and proxy
//! addresses before confirming.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use superform_safe_executor::cli::commands::{
    self, BatchClaimArgs, DepositArgs, PredictProxyArgs, WithdrawArgs, WithdrawRouteArgs,
};
use superform_safe_executor::config::Config;

/// Execute Superform deposits, withdrawals, and claims on behalf of a Safe
#[derive(Parser)]
#[command(name = "sf-operator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "operator.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit into a vault via the proxy factory
    Deposit(DepositArgs),

    /// Withdraw a position with pre-built router calldata
    Withdraw(WithdrawArgs),

    /// Withdraw a position, quoting the route first
    WithdrawRoute(WithdrawRouteArgs),

    /// Claim a position's accrued rewards
    WithdrawRewards(WithdrawArgs),

    /// Claim protocol rewards for a proxy
    BatchClaim(BatchClaimArgs),

    /// Predict the deterministic proxy address for a client
    PredictProxy(PredictProxyArgs),

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("superform_safe_executor=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Deposit(args) => commands::deposit(&config, args).await,
        Commands::Withdraw(args) => commands::withdraw(&config, args).await,
        Commands::WithdrawRoute(args) => commands::withdraw_route(&config, args).await,
        Commands::WithdrawRewards(args) => commands::withdraw_rewards(&config, args).await,
        Commands::BatchClaim(args) => commands::batch_claim(&config, args).await,
        Commands::PredictProxy(args) => commands::predict_proxy(&config, args).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
