//! Feature importance command

use anyhow::Result;
use predictor_lib::{FeatureImportance, ImportanceReporter, ModelRegistry};
use std::path::Path;
use std::process::ExitCode;
use tabled::Tabled;

use super::store_unavailable;
use crate::output::{print_json, print_warning, render_table, OutputFormat, UNAVAILABLE_EXIT};

pub const DEFAULT_TOP: usize = 15;

/// Width of the relative-importance bar
const BAR_WIDTH: usize = 20;

#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    score: String,
    #[tabled(rename = "")]
    bar: String,
}

fn bar(score: f64, max: f64) -> String {
    if max <= 0.0 || !score.is_finite() {
        return String::new();
    }
    let filled = ((score / max) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    "█".repeat(filled)
}

fn rows(ranked: &[FeatureImportance]) -> Vec<ImportanceRow> {
    let max = ranked.first().map(|f| f.score).unwrap_or(0.0);
    ranked
        .iter()
        .enumerate()
        .map(|(i, f)| ImportanceRow {
            rank: i + 1,
            feature: f.feature.clone(),
            score: format!("{:.4}", f.score),
            bar: bar(f.score, max),
        })
        .collect()
}

/// Show the top `top` features of a tree-ensemble model
pub fn show_importance(
    model_dir: &Path,
    model: &str,
    top: usize,
    format: OutputFormat,
) -> Result<ExitCode> {
    let registry = match ModelRegistry::discover(model_dir) {
        Ok(registry) => registry,
        Err(e) => return store_unavailable(&e, model_dir, format),
    };

    let Some(mut ranked) = ImportanceReporter::new(&registry).importances(model) else {
        print_warning(&format!("Feature importance is not available for model {}", model));
        return Ok(ExitCode::from(UNAVAILABLE_EXIT));
    };
    ranked.truncate(top);

    match format {
        OutputFormat::Json => print_json(&ranked)?,
        OutputFormat::Table => {
            println!("Top {} features for {}", ranked.len(), model);
            println!("{}", render_table(rows(&ranked)));
        }
    }

    Ok(ExitCode::SUCCESS)
}
