//! Model listing command

use anyhow::Result;
use chrono::Local;
use predictor_lib::{ModelFamily, ModelRegistry, ModelSummary};
use std::path::Path;
use std::process::ExitCode;
use tabled::Tabled;

use super::store_unavailable;
use crate::output::{color_family, print_json, print_warning, render_table, OutputFormat};

/// Row for models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Technology")]
    technology: String,
    #[tabled(rename = "Performance")]
    performance: String,
    #[tabled(rename = "Features")]
    features: String,
    #[tabled(rename = "Modified")]
    modified: String,
}

impl From<&ModelSummary> for ModelRow {
    fn from(s: &ModelSummary) -> Self {
        let features = match (s.required_features, s.has_scaler) {
            (0, _) => "any".to_string(),
            (n, true) => format!("{} (scaled)", n),
            (n, false) => n.to_string(),
        };
        Self {
            name: s.name.clone(),
            task: s.task_label.clone(),
            technology: color_family(&s.technology, s.family == ModelFamily::TreeEnsemble),
            performance: s.performance.clone(),
            features,
            modified: s
                .modified_at
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// List every model in the artifact store
pub fn list_models(model_dir: &Path, format: OutputFormat) -> Result<ExitCode> {
    let registry = match ModelRegistry::discover(model_dir) {
        Ok(registry) => registry,
        Err(e) => return store_unavailable(&e, model_dir, format),
    };
    let summaries = registry.summaries();

    match format {
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Table => {
            if summaries.is_empty() {
                print_warning(&format!("No models found in {}", model_dir.display()));
                return Ok(ExitCode::SUCCESS);
            }
            let rows: Vec<ModelRow> = summaries.iter().map(ModelRow::from).collect();
            println!("{}", render_table(rows));
            println!("\nTotal: {} models", summaries.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}
