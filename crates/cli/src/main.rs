//! Ride Predictor CLI
//!
//! A command-line tool for listing trained models, running fare, airport
//! and duration predictions, and inspecting feature importances.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{importance, models, predict};
use predictor_lib::Task;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ride Predictor CLI
#[derive(Parser)]
#[command(name = "ridepred")]
#[command(author, version, about = "CLI for the Ride Predictor model registry", long_about = None)]
pub struct Cli {
    /// Artifact store directory (overrides config file and RIDEPRED_MODEL_DIR)
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub emit_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discovered models with their headline metric
    Models,

    /// Run a prediction for a task
    Predict {
        /// Task to predict (fare, airport, duration)
        task: Task,

        /// Feature value as name=value (repeatable)
        #[arg(long = "feature", value_name = "NAME=VALUE")]
        features: Vec<String>,

        /// JSON file with one object or an array of objects
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Columns to use for models that record no feature schema
        #[arg(long = "features", value_delimiter = ',', value_name = "A,B")]
        columns: Option<Vec<String>>,
    },

    /// Show ranked feature importances of a tree-ensemble model
    Importance {
        /// Model name as listed by `ridepred models`
        model: String,

        /// Number of features to show
        #[arg(long, default_value_t = importance::DEFAULT_TOP)]
        top: usize,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = config::CliConfig::load()?;

    init_tracing(cli.verbose, cli.log_json || settings.log_json);

    let model_dir = cli.model_dir.clone().unwrap_or_else(|| settings.model_dir.clone());
    let format = match cli.format {
        Some(format) => format,
        None => settings.output_format()?,
    };
    debug!(model_dir = ?model_dir, format = ?format, "Configuration resolved");

    let code = match cli.command {
        Commands::Models => models::list_models(&model_dir, format)?,
        Commands::Predict {
            task,
            features,
            input,
            columns,
        } => {
            let request = predict::PredictRequest {
                task,
                features,
                input,
                columns,
            };
            predict::run_prediction(&model_dir, request, format)?
        }
        Commands::Importance { model, top } => {
            importance::show_importance(&model_dir, &model, top, format)?
        }
    };

    if cli.emit_metrics {
        output::print_metrics()?;
    }

    Ok(code)
}
