//! Autocompounder CLI
//!
//! Run with: cargo run -- <command>
//!
//! - `simulate`: play a deposit/reward schedule against an in-memory vault
//! - `quote`: price the reward-to-deposit route against live reserves
//! - `monitor`: poll a deployed vault and report when reinvest is due
//! - `config`: validate and print the active configuration

use alloy_primitives::{Address, U256};
use autocompounder::chain::{ChainReader, VaultStatus};
use autocompounder::config::Config;
use autocompounder::simulator::{self, SimulationParams, SimulationReport};
use autocompounder::vault::EventRecord;
use autocompounder::SwapRouter;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use console::style;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Auto-compounding yield vault tooling
#[derive(Parser)]
#[command(name = "autocompounder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML); falls back to AUTOCOMPOUNDER_CONFIG, then environment and .env
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate deposits and reinvests against an in-memory vault
    Simulate {
        /// Number of depositors, one joining per epoch
        #[arg(short, long, default_value_t = 3)]
        depositors: usize,

        /// Number of reward epochs
        #[arg(short, long, default_value_t = 12)]
        epochs: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Quote the reward-to-deposit route against live pair reserves
    Quote {
        /// Reward token amount in wei
        #[arg(short, long)]
        amount: String,
    },

    /// Poll a deployed vault's reinvest status
    Monitor {
        /// Read once and exit
        #[arg(long)]
        once: bool,
    },

    /// Validate and print the active configuration
    Config {
        /// Also write it to this TOML file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" AUTOCOMPOUNDER - Yield Vault Engine").cyan().bold()
    );
    println!(
        "{}",
        style("    Harvest | Convert | Restake").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    dotenvy::dotenv().ok();
    flag.or_else(|| std::env::var_os("AUTOCOMPOUNDER_CONFIG").map(PathBuf::from))
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

/// Whole tokens with four decimals, assuming 18-decimal amounts
fn format_units(amount: U256) -> String {
    let unit = U256::from(10u64).pow(U256::from(18));
    let whole = amount / unit;
    let frac = (amount % unit) / U256::from(10u64).pow(U256::from(14));
    format!("{}.{:04}", whole, frac.to::<u64>())
}

fn run_simulation(config: &Config, depositors: usize, epochs: usize, json: bool) -> Result<()> {
    let params = SimulationParams {
        vault_name: config.vault_name.clone(),
        owner: config.owner_address()?,
        deployer: config.deployer_address()?,
        depositors,
        epochs,
        fees: config.fee_schedule()?,
        min_tokens_to_reinvest: config.min_tokens_to_reinvest()?,
        ..SimulationParams::default()
    };

    let report = simulator::run(&params)?;

    if config.event_log {
        for event in &report.events {
            EventRecord::new(&params.vault_name, event.clone()).append_to_file(&config.event_log_path)?;
        }
        info!("Wrote {} events to {}", report.events.len(), config.event_log_path);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_simulation(&report);
    }
    Ok(())
}

fn print_simulation(report: &SimulationReport) {
    println!("{}", style("═══ EPOCHS ═══").blue().bold());
    println!(
        "  {:>5}  {:>7}  {:>14}  {:>14}  {:>16}  {:>12}",
        "epoch", "holders", "harvested", "restaked", "total deposits", "share price"
    );
    for epoch in &report.epochs {
        let marker = if epoch.reinvested {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!(
            "  {:>5}  {:>7}  {:>14}  {:>14}  {:>16}  {:>12} {}",
            epoch.epoch,
            epoch.holders,
            format_units(epoch.harvested),
            format_units(epoch.restaked),
            format_units(epoch.total_deposits),
            format_units(epoch.share_price),
            marker
        );
    }

    println!();
    println!("{}", style("═══ DEPOSITORS ═══").blue().bold());
    for outcome in &report.depositors {
        println!(
            "  {:?}: deposited {} -> withdrew {}",
            outcome.account,
            format_units(outcome.deposited),
            style(format_units(outcome.withdrawn)).green()
        );
    }

    println!();
    println!("{}", style("═══ FEES (reward token) ═══").blue().bold());
    println!("  Keeper rewards: {}", format_units(report.keeper_rewards));
    println!("  Admin fees:     {}", format_units(report.admin_fees));
    println!("  Dev fees:       {}", format_units(report.dev_fees));
}

async fn run_quote(config: &Config, amount: &str) -> Result<()> {
    config.validate()?;
    let amount = U256::from_str(amount).map_err(|e| eyre!("Invalid amount {}: {}", amount, e))?;
    let vault_config = config.vault_config(Address::ZERO)?;

    let pairs: Vec<Address> = [vault_config.swap_pair0, vault_config.swap_pair1]
        .into_iter()
        .flatten()
        .collect();
    let reader = ChainReader::new(config.rpc_url.clone());
    let mut book = reader.pair_book(&pairs).await?;
    // An LP deposit token is a pair too; a plain token fails the read
    match reader.pair_snapshot(vault_config.deposit_token).await {
        Ok(snapshot) => book.insert(snapshot),
        Err(e) => debug!("Deposit token {:?} is not a pair: {}", vault_config.deposit_token, e),
    }

    let router = SwapRouter::resolve(
        &book,
        vault_config.reward_token,
        vault_config.deposit_token,
        vault_config.swap_pair0,
        vault_config.swap_pair1,
    )?;
    let fees = config.fee_schedule()?;
    let split = fees.split(amount)?;
    let out = router.quote(&book, split.principal)?;

    println!("{}", style("═══ ROUTE ═══").blue().bold());
    for hop in router.hops() {
        println!("  {:?} -> {:?} via {:?}", hop.token_in, hop.token_out, hop.pair);
    }
    if let Some(pair) = router.liquidity_pair() {
        println!("  half per side, then add liquidity to {:?}", pair);
    } else if router.hops().is_empty() {
        println!("  (reward token is the deposit token)");
    }
    println!();
    println!("  Harvest:         {}", format_units(amount));
    println!("  Reinvest reward: {}", format_units(split.reinvest_reward));
    println!("  Admin fee:       {}", format_units(split.admin_fee));
    println!("  Dev fee:         {}", format_units(split.dev_fee));
    println!("  Restaked:        {}", style(format_units(out)).green().bold());
    Ok(())
}

fn print_status(status: &VaultStatus) {
    let ready = if status.reinvest_ready() {
        style("READY").green().bold()
    } else {
        style("waiting").yellow()
    };
    println!(
        "  pending {} (min {}) | reward {} | deployed {} | deposits {} | supply {} | {}",
        format_units(status.pending_reward),
        format_units(status.min_tokens_to_reinvest),
        format_units(status.estimated_reinvest_reward),
        format_units(status.estimated_deployed_balance),
        format_units(status.total_deposits),
        format_units(status.total_supply),
        ready
    );
}

async fn run_monitor(config: &Config, once: bool) -> Result<()> {
    let vault = config
        .vault_address()?
        .ok_or_else(|| eyre!("VAULT_ADDRESS must be set to monitor a vault"))?;
    let reader = ChainReader::new(config.rpc_url.clone());
    let interval = Duration::from_secs(config.monitor_interval_secs.max(1));

    let mut consecutive_failures = 0u32;
    loop {
        match reader.vault_status(vault).await {
            Ok(status) => {
                consecutive_failures = 0;
                print_status(&status);
                if status.reinvest_ready() {
                    info!(
                        "Reinvest is due on {:?}: caller would earn {}",
                        vault, status.estimated_reinvest_reward
                    );
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!("Status read failed ({} in a row): {}", consecutive_failures, e);
                if once {
                    return Err(e);
                }
            }
        }

        if once {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("autocompounder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    print_banner();

    let config = load_config(config_path(cli.config).as_ref())?;

    let result = match cli.command {
        Commands::Simulate {
            depositors,
            epochs,
            json,
        } => run_simulation(&config, depositors, epochs, json),
        Commands::Quote { amount } => run_quote(&config, &amount).await,
        Commands::Monitor { once } => run_monitor(&config, once).await,
        Commands::Config { save } => {
            config.print_summary();
            if let Err(e) = config.validate() {
                error!("Configuration validation failed: {}", e);
                error!("Please check your .env file");
                return Err(e);
            }
            if let Some(path) = save {
                config.save_to_file(&path)?;
                println!("{} {}", style("✓ Saved to").green(), path.display());
            }
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}
