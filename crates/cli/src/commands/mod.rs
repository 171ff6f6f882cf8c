//! Subcommand implementations

pub mod importance;
pub mod models;
pub mod predict;

use crate::output::{self, OutputFormat};
use anyhow::Result;
use predictor_lib::RegistryError;
use std::path::Path;
use std::process::ExitCode;

/// Report an artifact store that could not be listed
fn store_unavailable(
    error: &RegistryError,
    model_dir: &Path,
    format: OutputFormat,
) -> Result<ExitCode> {
    let details = format!("{} ({})", error, model_dir.display());
    output::unavailable(error.category(), &details, format)
}
