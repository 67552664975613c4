#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the landslide clustering pipeline.
//!
//! ```text
//! landslide_map cluster --data data.csv [--config pipeline.toml] [-k 3] [--low 20 --high 50]
//! landslide_map elbow --data data.csv [--k-max 10]
//! landslide_map silhouette --data data.csv --method agglomerative --linkage ward
//! landslide_map linkages --data data.csv [--standardize]
//! landslide_map describe --data data.csv [--year 2022]
//! landslide_map changes --data data.csv --year 2022
//! ```
//!
//! Every command prints its result as JSON on stdout. Running with no
//! subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`landslide_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use landslide_map_disaster_models::FeatureColumn;

use crate::commands::{RunArgs, print_json};

#[derive(Parser)]
#[command(
    name = "landslide_map",
    about = "Cluster landslide-affected areas and categorise their risk"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster records, profile and categorise clusters, and sweep k
    Cluster(RunArgs),
    /// K-Means inertia for k = 1..=k_max
    Elbow(RunArgs),
    /// Silhouette score of the configured method for k = 2..=k_max
    Silhouette(RunArgs),
    /// Cophenetic correlation and silhouette curve for every linkage
    Linkages(RunArgs),
    /// Summary statistics and correlations of the dataset
    Describe {
        /// Landslide CSV export
        #[arg(long)]
        data: PathBuf,
        /// Only use records from this year
        #[arg(long)]
        year: Option<i32>,
        /// Comma-separated columns to correlate (default: all present)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<FeatureColumn>,
    },
    /// Per-area landslide changes against the previous year
    Changes {
        /// Landslide CSV export
        #[arg(long)]
        data: PathBuf,
        /// Year to compare with the one before it
        #[arg(long)]
        year: i32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = landslide_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Landslide Map Toolchain");
        println!();
        return interactive::run(&multi);
    };

    match command {
        Commands::Cluster(args) => print_json(&commands::cluster(&args, &multi)?)?,
        Commands::Elbow(args) => print_json(&commands::elbow(&args, &multi)?)?,
        Commands::Silhouette(args) => print_json(&commands::silhouette(&args, &multi)?)?,
        Commands::Linkages(args) => print_json(&commands::linkages(&args, &multi)?)?,
        Commands::Describe {
            data,
            year,
            columns,
        } => print_json(&commands::describe_records(&data, year, &columns)?)?,
        Commands::Changes { data, year } => print_json(&commands::changes(&data, year)?)?,
    }

    Ok(())
}
