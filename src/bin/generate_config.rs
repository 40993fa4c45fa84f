//! Config Generation Utility
//!
//! Run with: cargo run --bin generate-config [path]
//!
//! Writes the default vault configuration as TOML (default `autocompounder.toml`),
//! ready to be edited and passed back with `--config`.

use autocompounder::Config;
use std::path::PathBuf;

fn main() -> eyre::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("autocompounder.toml"));

    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          AUTOCOMPOUNDER CONFIG GENERATOR                   ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    if path.exists() {
        return Err(eyre::eyre!("{} already exists, refusing to overwrite", path.display()));
    }

    let config = Config::default();
    config.save_to_file(&path)?;

    println!("📝 Wrote {}", path.display());
    println!();
    println!("   Before using it:");
    println!("   1. Set staking_contract to the rewards pool the vault stakes into");
    println!("   2. Set owner and deployer to real addresses");
    println!("   3. Set vault_address if you want to monitor a deployed vault");
    println!();
    println!("   Then: cargo run -- --config {} config", path.display());
    println!();
    Ok(())
}
