//! Prediction command

use anyhow::{Context, Result};
use predictor_lib::{
    Dispatcher, FeatureFrame, ModelRegistry, Prediction, PredictionOutput, StructuredLogger, Task,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::Tabled;

use super::store_unavailable;
use crate::output::{
    color_confidence, format_currency, format_minutes, print_info, print_json, print_success,
    print_warning, render_table, unavailable, OutputFormat,
};

/// Arguments of `ridepred predict`
pub struct PredictRequest {
    pub task: Task,
    /// `name=value` pairs applied to every row
    pub features: Vec<String>,
    pub input: Option<PathBuf>,
    /// Caller-chosen columns for schema-less models
    pub columns: Option<Vec<String>>,
}

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Prediction")]
    value: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Parse one `name=value` argument
fn parse_feature(arg: &str) -> Result<(String, f64)> {
    let (name, value) = arg
        .split_once('=')
        .with_context(|| format!("Feature {:?} is not in name=value form", arg))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Feature {:?} has an empty name", arg);
    }
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Feature {} has a non-numeric value {:?}", name, value))?;
    Ok((name.to_string(), value))
}

/// Rows of a JSON request: one object or an array of objects with numeric
/// values. Keys keep the order they have in the document.
fn parse_records(json: &Value) -> Result<Vec<Vec<(String, f64)>>> {
    let objects = match json {
        Value::Object(_) => vec![json],
        Value::Array(items) => items.iter().collect(),
        _ => anyhow::bail!("Input must be a JSON object or an array of objects"),
    };

    objects
        .into_iter()
        .enumerate()
        .map(|(row, item)| {
            let object = item
                .as_object()
                .with_context(|| format!("Row {} is not a JSON object", row))?;
            object
                .iter()
                .map(|(name, value)| {
                    let number = match value {
                        Value::Number(n) => n.as_f64(),
                        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                        _ => None,
                    }
                    .with_context(|| format!("Row {} column {} is not numeric", row, name))?;
                    Ok((name.clone(), number))
                })
                .collect::<Result<Vec<(String, f64)>>>()
        })
        .collect()
}

/// Merge the input file and `--feature` overrides into a frame
fn build_frame(input: Option<&Value>, features: &[String]) -> Result<FeatureFrame> {
    let mut records = match input {
        Some(json) => parse_records(json)?,
        None => Vec::new(),
    };
    if records.is_empty() {
        records.push(Vec::new());
    }

    // flags replace a column in place or append it in argument order
    for arg in features {
        let (name, value) = parse_feature(arg)?;
        for record in records.iter_mut() {
            match record.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, slot)) => *slot = value,
                None => record.push((name.clone(), value)),
            }
        }
    }

    FeatureFrame::from_records(&records).context("Invalid prediction request")
}

fn read_input(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}

fn render_value(task: Task, value: f64) -> String {
    match task {
        Task::FarePrediction => format_currency(value),
        Task::DurationPrediction => format_minutes(value),
        Task::AirportClassification => value.to_string(),
    }
}

fn rows(prediction: &Prediction) -> Vec<PredictionRow> {
    match &prediction.output {
        PredictionOutput::Regression { values } => values
            .iter()
            .enumerate()
            .map(|(i, v)| PredictionRow {
                row: i + 1,
                value: render_value(prediction.task, *v),
                confidence: "-".to_string(),
            })
            .collect(),
        PredictionOutput::Classification {
            labels,
            probabilities,
        } => labels
            .iter()
            .enumerate()
            .map(|(i, label)| PredictionRow {
                row: i + 1,
                value: if *label == 1 { "Airport trip" } else { "Regular trip" }.to_string(),
                confidence: probabilities
                    .as_ref()
                    .and_then(|p| p.get(i))
                    .map(|p| color_confidence(*p))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect(),
    }
}

/// Run a prediction and print the answer
pub fn run_prediction(
    model_dir: &Path,
    request: PredictRequest,
    format: OutputFormat,
) -> Result<ExitCode> {
    let input = request.input.as_deref().map(read_input).transpose()?;
    let frame = build_frame(input.as_ref(), &request.features)?;

    let registry = match ModelRegistry::discover(model_dir) {
        Ok(registry) => registry,
        Err(e) => return store_unavailable(&e, model_dir, format),
    };
    let dispatcher = Dispatcher::new(&registry).with_logger(StructuredLogger::new("cli"));

    let columns = request.columns.as_deref();
    let prediction = match dispatcher.predict_with(request.task, &frame, columns) {
        Ok(prediction) => prediction,
        Err(e) => return unavailable(e.category(), &e.to_string(), format),
    };

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            print_success(&format!("{} with {}", prediction.task.label(), prediction.model));
            if prediction.fell_back {
                print_warning("Primary model failed; answered by the fallback model");
            }
            println!("{}", render_table(rows(&prediction)));
            print_info(&format!("Features used: {}", prediction.features.join(", ")));
        }
    }

    Ok(ExitCode::SUCCESS)
}
