#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the landslide map binary: logging routed through
//! `indicatif`, a progress bar for cluster-count sweeps, and the
//! `dialoguer` prompts used by the interactive menu.

use std::str::FromStr;
use std::sync::Arc;

use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use landslide_map_source::progress::ProgressCallback;
use log::LevelFilter;

pub use indicatif::MultiProgress;

const SWEEP_TEMPLATE: &str = "{prefix:>24.cyan} [{bar:30.green/dim}] {pos}/{len} {msg}";

/// Renders evaluation sweeps as one bar that is reset at the start of each
/// sweep.
pub struct SweepBar {
    bar: ProgressBar,
}

impl SweepBar {
    /// Adds a sweep bar to `multi`.
    #[must_use]
    pub fn attach(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::with_template(SWEEP_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Arc::new(Self { bar })
    }
}

impl ProgressCallback for SweepBar {
    fn begin(&self, label: &str, steps: u64) {
        self.bar.set_prefix(label.to_string());
        self.bar.set_length(steps);
        self.bar.set_message("");
        self.bar.reset();
    }

    fn advance(&self, k: usize) {
        self.bar.set_message(format!("k = {k}"));
        self.bar.inc(1);
    }

    fn end(&self, summary: &str) {
        self.bar.set_message(summary.to_string());
        self.bar.abandon();
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge`, so log lines
/// print above the progress bars instead of through them.
///
/// `RUST_LOG` is honoured when set; otherwise the level is `info`. Bars must
/// be added to the returned [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    let logger = builder.build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already installed");
    }
    log::set_max_level(max_level);

    multi
}

/// Prompts for a value that may be left blank, which yields `None`.
///
/// # Errors
///
/// Returns an error if the prompt fails or the input does not parse.
pub fn prompt_optional<T>(prompt: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(Into::into)
}

/// Prompts for a value, pre-filled with `default`.
///
/// # Errors
///
/// Returns an error if the prompt fails.
pub fn prompt_with_default<T>(prompt: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: Clone + ToString + FromStr,
    T::Err: ToString,
{
    Ok(Input::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()?)
}
