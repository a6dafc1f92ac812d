mod calc;
mod cmd;
mod data;
mod error;
mod logging;
mod sync;
mod ui;

use clap::{Parser, Subcommand};
use data::AppSettings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wssi", about = "weekly sales, stock & intake planner with open-to-buy")]
struct Cli {
    /// Path to the data directory containing config and data files (default: ./config)
    #[arg(long, default_value = "./config")]
    data_dir: PathBuf,

    /// Planning API base URL; overrides `api_base_url` in config.yaml
    #[arg(long)]
    api_url: Option<String>,

    /// Year to fetch (repeat for several); overrides `years` in config.yaml
    #[arg(long = "year")]
    years: Vec<i32>,

    /// Season to view (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    season: Option<u8>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and a sample row store
    Init,
    /// Print the weekly metrics for each style over a range of weeks
    Report {
        /// Only this style number
        #[arg(short, long)]
        style: Option<String>,
        /// First week to show (default: current week)
        #[arg(long)]
        from_week: Option<u32>,
        /// Number of weeks to show (default: window_size)
        #[arg(short, long)]
        weeks: Option<usize>,
    },
    /// List styles and data warnings
    Styles,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Resolve data_dir to an absolute path so file I/O works
    // regardless of future directory changes within the process.
    let data_dir = if cli.data_dir.is_absolute() {
        cli.data_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.data_dir)
    };
    data::persistence::set_data_dir(data_dir.clone());

    // Auto-init when the data directory is missing or empty and the user did not
    // explicitly invoke the `init` subcommand.
    let is_init_command = matches!(cli.command, Some(Commands::Init));
    if !is_init_command && dir_needs_init(&data_dir) {
        eprintln!(
            "Data directory '{}' is missing or empty, running init...",
            data_dir.display()
        );
        cmd::init::run()?;
    }

    let load_settings = || -> anyhow::Result<AppSettings> {
        let mut settings = AppSettings::load()?;
        apply_overrides(&mut settings, cli.api_url.clone(), &cli.years, cli.season)?;
        Ok(settings)
    };

    match &cli.command {
        None => {
            let settings = load_settings()?;
            logging::init_file(&data_dir.join(&settings.log_file))?;
            cmd::root::run(settings)
        }
        Some(Commands::Init) => {
            logging::init_stderr()?;
            cmd::init::run()
        }
        Some(Commands::Report { style, from_week, weeks }) => {
            logging::init_stderr()?;
            let scope = cmd::report::ReportScope {
                style: style.clone(),
                from_week: *from_week,
                weeks: *weeks,
            };
            cmd::report::run(&load_settings()?, &scope)
        }
        Some(Commands::Styles) => {
            logging::init_stderr()?;
            cmd::styles::run(&load_settings()?)
        }
    }
}

/// Applies command-line values on top of config.yaml and re-validates.
fn apply_overrides(
    settings: &mut AppSettings,
    api_url: Option<String>,
    years: &[i32],
    season: Option<u8>,
) -> anyhow::Result<()> {
    if let Some(url) = api_url {
        settings.api_base_url = Some(url);
    }
    if !years.is_empty() {
        settings.years = years.to_vec();
    }
    if let Some(season) = season {
        settings.season = season;
    }
    settings.validate()
}

/// Returns true when `dir` does not exist or exists but contains no files.
fn dir_needs_init(dir: &std::path::Path) -> bool {
    if !dir.exists() {
        return true;
    }
    dir.read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
