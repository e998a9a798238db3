//! Command line entry point for the web application bundler.
//!
//! Usage: webapp-bundler [OPTIONS] [COMMAND]
//!
//! Without a command a full build is run.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, error};
use serde::Serialize;

use webapp_bundler::config::{DEFAULT_CONFIG_FILE, WebAppConfig};
use webapp_bundler::models::CombinedAsset;
use webapp_bundler::WebAppBuilder;

/// Combine a web application's scripts and stylesheets and package the result.
#[derive(Parser, Debug)]
#[command(name = "webapp-bundler")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory all configured paths are relative to
  #[arg(short, long, default_value = ".")]
  project_dir: PathBuf,

  /// Configuration file, defaults to webapp.config.json in the project directory
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Verbosity level (-v, -vv)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Print the outcome as JSON
  #[arg(long)]
  json: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
  /// Concatenate the combinable scripts into the combined script
  CombineJs,
  /// Concatenate the combinable stylesheets into the combined stylesheet
  CombineCss,
  /// Combine, then copy the web application into the build directory
  Package,
  /// Mirror the build directory into the configured sync directories
  Sync,
  /// Combine, then swap the combined sources in an archive for the combined files
  Repackage {
    /// Archive to rewrite, defaults to the configured one
    archive: Option<PathBuf>,
  },
  /// Run every pass
  Build,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
    .format_timestamp(None)
    .init();
}

fn run(cli: &Cli) -> Result<()> {
  let config_path = cli
    .project_dir
    .join(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE.as_ref()));
  let config = match &cli.config {
    Some(_) => WebAppConfig::from_path(&config_path),
    None => WebAppConfig::discover(&cli.project_dir),
  }
  .with_context(|| format!("failed to load {}", config_path.display()))?;
  let resolved = config
    .resolve(&cli.project_dir)
    .context("failed to resolve configuration")?;
  let builder = WebAppBuilder::new(resolved);

  match cli.command.clone().unwrap_or(Commands::Build) {
    Commands::CombineJs => {
      let combined = builder.combine_javascript()?;
      print_outcome(cli.json, &combined)
    }
    Commands::CombineCss => {
      let combined = builder.combine_css()?;
      print_outcome(cli.json, &combined)
    }
    Commands::Package => {
      let combined = combine_all(&builder)?;
      let report = builder.package(&combined.iter().collect::<Vec<_>>())?;
      print_outcome(cli.json, &report)
    }
    Commands::Sync => {
      let synced = builder.sync()?;
      print_outcome(cli.json, &synced)
    }
    Commands::Repackage { archive } => {
      let archive = archive
        .map(|path| cli.project_dir.join(path))
        .or_else(|| builder.config().archive.clone())
        .context("no archive given and none configured")?;
      let combined = combine_all(&builder)?;
      let entries = builder
        .repackage_archive(&archive, &combined.iter().collect::<Vec<_>>())
        .with_context(|| format!("failed to repackage {}", archive.display()))?;
      print_outcome(cli.json, &entries.paths().collect::<Vec<_>>())
    }
    Commands::Build => {
      let report = builder.build()?;
      print_outcome(cli.json, &report)
    }
  }
}

fn combine_all(builder: &WebAppBuilder) -> Result<Vec<CombinedAsset>> {
  let javascript = builder.combine_javascript()?;
  let css = builder.combine_css()?;
  Ok(javascript.into_iter().chain(css).collect())
}

fn print_outcome<T: Serialize>(json: bool, value: &T) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  }
  Ok(())
}
