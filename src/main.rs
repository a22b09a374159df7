use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ecofinds::account::TokenService;
use ecofinds::api::{ApiServer, ApiState};
use ecofinds::checkout::{SimulatedWallet, UnavailableWallet, WalletProvider};
use ecofinds::cli::cart::handle_cart_command;
use ecofinds::cli::{Cli, Commands};
use ecofinds::config::{ConfigSource, MarketConfig};
use ecofinds::seed::seed_demo_data;
use ecofinds::storage::{lock_store, EntityStore};

/// RUST_LOG wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config_path: &str, port: Option<u16>) -> Result<(), Box<dyn Error>> {
    let (mut config, source) = MarketConfig::load_or_default(config_path);
    if let Some(port) = port {
        config.server.port = port;
    }
    init_tracing(&config.server.log_level);

    match &source {
        ConfigSource::Loaded(path) => info!("Config loaded from {}", path),
        ConfigSource::Created(path) => info!("Config file not found, wrote defaults to {}", path),
        ConfigSource::Defaulted { path, reason } => {
            warn!("Could not use config at {} ({}), running on defaults", path, reason)
        }
    }

    let store = EntityStore::new().shared();
    if config.seed_demo_data {
        seed_demo_data(&mut *lock_store(&store)?)?;
    }

    let wallet: Arc<dyn WalletProvider> = if config.wallet.enabled {
        info!(accounts = config.wallet.accounts.len(), "Using simulated wallet");
        Arc::new(SimulatedWallet::new(config.wallet.accounts.clone()))
    } else {
        warn!("Wallet disabled; crypto checkout will fail");
        Arc::new(UnavailableWallet)
    };

    let tokens = TokenService::new(&config.auth.token_secret, config.auth.token_validity_days);
    let state = ApiState::new(store, tokens, wallet, config.checkout_settings());

    ApiServer::new(state, config.listen_addr()).start().await?;
    Ok(())
}

fn init_config(path: &str, force: bool) -> Result<(), Box<dyn Error>> {
    if std::path::Path::new(path).exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path).into());
    }
    MarketConfig::default().write(path)?;
    println!("Wrote default config to {}", path);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or_default() {
        Commands::Serve { config, port } => serve(&config, port).await,
        Commands::InitConfig { path, force } => init_config(&path, force),
        Commands::Cart { server, token, cmd } => {
            init_tracing("warn");
            handle_cart_command(&server, &token, cmd)
                .await
                .map_err(Into::into)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
