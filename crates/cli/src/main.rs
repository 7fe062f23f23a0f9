//! Moo Deng CLI - Catalog browsing tools.
//!
//! # Usage
//!
//! ```bash
//! # List categories
//! md-cli categories
//!
//! # Run the shop filter from the terminal
//! md-cli products --category shirts --price under-25 --price 50-100 --size M --sort price-low-high
//!
//! # Show one product
//! md-cli show 2
//!
//! # List available filter values
//! md-cli facets
//! ```
//!
//! The catalog defaults to the one embedded in the storefront; pass
//! `--catalog` or set `STOREFRONT_CATALOG_PATH` to use another file.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "md-cli")]
#[command(author, version, about = "Moo Deng catalog tools")]
struct Cli {
    /// Catalog JSON file (defaults to the embedded catalog)
    #[arg(long, global = true, env = "STOREFRONT_CATALOG_PATH")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List categories
    Categories,
    /// List products through the shop filter
    Products {
        /// Category ID
        #[arg(short, long)]
        category: Option<String>,

        /// Price range slug (`under-25`, `25-50`, `50-100`, `over-100`); repeatable
        #[arg(short, long)]
        price: Vec<String>,

        /// Size; repeatable
        #[arg(short, long)]
        size: Vec<String>,

        /// Color; repeatable
        #[arg(long)]
        color: Vec<String>,

        /// Sort order (`featured`, `price-low-high`, `price-high-low`, `newest`)
        #[arg(long, default_value = "featured")]
        sort: String,
    },
    /// Show a single product
    Show {
        /// Product ID
        id: String,
    },
    /// List sizes, colors and price ranges available for filtering
    Facets,
}

fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CliError> {
    let catalog = moodeng_storefront::catalog::load_catalog(cli.catalog.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Categories => commands::catalog::categories(&catalog, &mut out)?,
        Commands::Products {
            category,
            price,
            size,
            color,
            sort,
        } => {
            let filter = commands::catalog::build_filter(category, &price, size, color, &sort)?;
            commands::catalog::products(&catalog, &filter, &mut out)?;
        }
        Commands::Show { id } => commands::catalog::show(&catalog, &id, &mut out)?,
        Commands::Facets => commands::catalog::facets(&catalog, &mut out)?,
    }

    out.flush()?;
    Ok(())
}
