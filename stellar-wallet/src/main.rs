//! Stellar Wallet CLI
//!
//! Interactive wallet for the Stellar test network.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stellar_wallet::commands::{
    init::select_account,
    shell::{self, Shell},
    tty, Terminal,
};
use stellar_wallet::{ConfigStore, HorizonClient};

#[derive(Parser)]
#[command(name = "stellar-wallet")]
#[command(about = "Stellar testnet wallet - manage your test accounts from the terminal")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Custom config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    ctrlc::set_handler(|| {
        // Echo may be off when interrupted at the seed prompt
        tty::restore();
        println!();
        shell::quit();
        std::process::exit(0);
    })?;

    let store = ConfigStore::new(cli.config.unwrap_or_else(ConfigStore::default_path));

    let mut terminal = Terminal;
    let Some(session) = select_account(store, &mut terminal)? else {
        return Ok(());
    };

    println!();
    println!("The following account will be used: {}", session.account());
    println!("Type 'help' to list the available commands.");
    println!();

    let gateway = HorizonClient::testnet()?;
    Shell::new(session, gateway, terminal).run().await
}
