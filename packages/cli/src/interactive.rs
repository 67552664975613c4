//! Menu-driven interface for running the analyses without memorizing
//! CLI flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use landslide_map_analytics_models::{Linkage, MethodKind, config::DEFAULT_K};
use landslide_map_cli_utils::{MultiProgress, prompt_optional, prompt_with_default};

use crate::commands::{self, RunArgs};

/// Top-level actions available in the interactive menu.
enum Tool {
    Cluster,
    Elbow,
    Silhouette,
    CompareLinkages,
    Describe,
    YearlyChanges,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Cluster,
        Self::Elbow,
        Self::Silhouette,
        Self::CompareLinkages,
        Self::Describe,
        Self::YearlyChanges,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Cluster => "Cluster areas and categorise risk",
            Self::Elbow => "Elbow curve (K-Means inertia)",
            Self::Silhouette => "Silhouette curve",
            Self::CompareLinkages => "Compare agglomerative linkages",
            Self::Describe => "Describe dataset",
            Self::YearlyChanges => "Year-over-year landslide changes",
        }
    }
}

/// Runs the interactive menu, prompting for the data file and the settings
/// of the selected tool, then prints the result as JSON.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let data: String = Input::new()
        .with_prompt("Path to landslide CSV")
        .interact_text()?;
    let data = PathBuf::from(data.trim());

    match Tool::ALL[idx] {
        Tool::Cluster => {
            let args = prompt_run_args(data, true)?;
            commands::print_json(&commands::cluster(&args, multi)?)?;
        }
        Tool::Elbow => {
            let args = prompt_run_args(data, false)?;
            commands::print_json(&commands::elbow(&args, multi)?)?;
        }
        Tool::Silhouette => {
            let args = prompt_run_args(data, false)?;
            commands::print_json(&commands::silhouette(&args, multi)?)?;
        }
        Tool::CompareLinkages => {
            let args = prompt_run_args(data, false)?;
            commands::print_json(&commands::linkages(&args, multi)?)?;
        }
        Tool::Describe => {
            let year = prompt_optional("Year (empty for all)")?;
            commands::print_json(&commands::describe_records(&data, year, &[])?)?;
        }
        Tool::YearlyChanges => {
            let year = Input::<i32>::new().with_prompt("Year").interact_text()?;
            commands::print_json(&commands::changes(&data, year)?)?;
        }
    }

    Ok(())
}

/// Prompts for the settings a clustering run needs. The cluster count and
/// risk thresholds are only asked for when `full_run` is set.
fn prompt_run_args(
    data: PathBuf,
    full_run: bool,
) -> Result<RunArgs, Box<dyn std::error::Error>> {
    let mut args = RunArgs::for_data(data);
    args.config = prompt_optional("Config file (empty for defaults)")?;

    let methods = [MethodKind::KMeans, MethodKind::Agglomerative];
    let method_labels = ["K-Means", "Agglomerative"];
    let method_idx = Select::new()
        .with_prompt("Clustering method")
        .items(&method_labels)
        .default(0)
        .interact()?;
    args.method = Some(methods[method_idx]);

    if methods[method_idx] == MethodKind::Agglomerative {
        let linkage_labels: Vec<&str> = Linkage::all().iter().map(AsRef::as_ref).collect();
        let linkage_idx = Select::new()
            .with_prompt("Linkage")
            .items(&linkage_labels)
            .default(linkage_labels.len() - 1)
            .interact()?;
        args.linkage = Some(Linkage::all()[linkage_idx]);
    }

    if full_run {
        args.k = Some(prompt_with_default("Number of clusters", DEFAULT_K)?);
    }
    args.k_max = prompt_optional("Largest k to evaluate (empty for config value)")?;
    args.year = prompt_optional("Year (empty for all)")?;
    args.standardize = Confirm::new()
        .with_prompt("Standardize features?")
        .default(false)
        .interact()?;

    if full_run {
        args.low = prompt_optional("Low risk threshold (empty to skip categorisation)")?;
        if args.low.is_some() {
            args.high = Some(prompt_with_default("High risk threshold", 50.0)?);
        }
    }

    Ok(args)
}
