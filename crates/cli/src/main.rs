//! Sokoni CLI - Demo data seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # Write the demo product catalog
//! sokoni seed products
//!
//! # Write the demo coupon table
//! sokoni seed coupons
//!
//! # Write both, replacing existing files
//! sokoni seed all --force
//! ```
//!
//! # Commands
//!
//! - `seed products` - Write the demo product catalog JSON
//! - `seed coupons` - Write the demo coupon table JSON
//! - `seed all` - Write both

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sokoni")]
#[command(author, version, about = "Sokoni CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed demo data files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Write the demo product catalog
    Products {
        /// Output directory for data files
        #[arg(short, long, default_value = "crates/storefront/data")]
        out: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Write the demo coupon table
    Coupons {
        /// Output directory for data files
        #[arg(short, long, default_value = "crates/storefront/data")]
        out: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Write both data files
    All {
        /// Output directory for data files
        #[arg(short, long, default_value = "crates/storefront/data")]
        out: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { target } => match target {
            SeedTarget::Products { out, force } => {
                commands::seed::products(&out, force).await?;
            }
            SeedTarget::Coupons { out, force } => {
                commands::seed::coupons(&out, force).await?;
            }
            SeedTarget::All { out, force } => {
                commands::seed::products(&out, force).await?;
                commands::seed::coupons(&out, force).await?;
            }
        },
    }
    Ok(())
}
