//! Core data models for the prediction core

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Structural category of a trained artifact; declaration order is preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    TreeEnsemble,
    NeuralNetwork,
}

impl ModelFamily {
    /// File extension of the primary artifact for this family
    pub fn extension(&self) -> &'static str {
        match self {
            ModelFamily::TreeEnsemble => "ensemble",
            ModelFamily::NeuralNetwork => "onnx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ensemble" => Some(ModelFamily::TreeEnsemble),
            "onnx" => Some(ModelFamily::NeuralNetwork),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::TreeEnsemble => "tree_ensemble",
            ModelFamily::NeuralNetwork => "neural_network",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical prediction task served by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    FarePrediction,
    AirportClassification,
    DurationPrediction,
}

impl Task {
    pub const ALL: [Task; 3] = [
        Task::FarePrediction,
        Task::AirportClassification,
        Task::DurationPrediction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::FarePrediction => "fare-prediction",
            Task::AirportClassification => "airport-classification",
            Task::DurationPrediction => "duration-prediction",
        }
    }

    /// Human-readable label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Task::FarePrediction => "Fare prediction",
            Task::AirportClassification => "Airport trip classification",
            Task::DurationPrediction => "Duration prediction",
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Task::AirportClassification)
    }

    /// Guess the task a descriptor serves from its name
    pub fn from_model_name(name: &str) -> Option<Self> {
        if name.contains("driver_pay") {
            Some(Task::FarePrediction)
        } else if name.contains("airport") {
            Some(Task::AirportClassification)
        } else if name.contains("trip_time") {
            Some(Task::DurationPrediction)
        } else {
            None
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fare" | "fare-prediction" => Ok(Task::FarePrediction),
            "airport" | "airport-classification" => Ok(Task::AirportClassification),
            "duration" | "trip-time" | "duration-prediction" => Ok(Task::DurationPrediction),
            other => Err(format!("unknown task: {}", other)),
        }
    }
}

/// In-memory record describing one discovered artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub family: ModelFamily,
    pub artifact_path: PathBuf,
    /// Companion scaler, only ever set for neural networks
    pub companion_path: Option<PathBuf>,
    pub metrics: BTreeMap<String, f64>,
    /// Empty when the artifact does not record its schema
    pub required_features: Vec<String>,
}

impl ModelDescriptor {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn has_schema(&self) -> bool {
        !self.required_features.is_empty()
    }
}

/// Tabular prediction request: named numeric columns of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl FeatureFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from `(name, values)` pairs
    pub fn from_columns<I, S>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut frame = Self::new();
        for (name, values) in columns {
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    /// Build a single-row frame from `(name, value)` pairs
    pub fn single_row<I, S>(values: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::from_columns(values.into_iter().map(|(name, v)| (name, vec![v])))
    }

    /// Build a frame from ordered row records.
    ///
    /// Columns appear in the order they are first seen across the records;
    /// every record must supply every column exactly once.
    pub fn from_records(records: &[Vec<(String, f64)>]) -> Result<Self, FrameError> {
        let mut names: Vec<&str> = Vec::new();
        for record in records {
            for (idx, (name, _)) in record.iter().enumerate() {
                if record[..idx].iter().any(|(earlier, _)| earlier == name) {
                    return Err(FrameError::DuplicateColumn(name.clone()));
                }
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }

        let mut frame = Self::new();
        for name in names {
            let values = records
                .iter()
                .enumerate()
                .map(|(row, record)| {
                    record
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| FrameError::MissingValue {
                            column: name.to_string(),
                            row,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if !self.names.is_empty() && values.len() != self.n_rows {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.n_rows = values.len();
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Project the frame onto `columns` as a row-major matrix
    pub fn select(&self, columns: &[String]) -> Result<FeatureMatrix, FrameError> {
        let selected = columns
            .iter()
            .map(|name| {
                self.column(name)
                    .ok_or_else(|| FrameError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut data = Vec::with_capacity(self.n_rows * selected.len());
        for row in 0..self.n_rows {
            data.extend(selected.iter().map(|col| col[row]));
        }

        Ok(FeatureMatrix {
            columns: columns.to_vec(),
            n_rows: self.n_rows,
            data,
        })
    }
}

/// Row-major numeric matrix handed to predictors
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    n_rows: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        let width = columns.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(FrameError::LengthMismatch {
                    column: format!("row {}", idx),
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            columns,
            n_rows: rows.len(),
            data,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let width = self.n_cols();
        &self.data[idx * width..(idx + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |idx| self.row(idx))
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Same shape, transformed values
    pub fn map_rows<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.rows() {
            data.extend(f(row));
        }
        Self {
            columns: self.columns.clone(),
            n_rows: self.n_rows,
            data,
        }
    }
}

/// Binary classification output for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryOutcome {
    pub label: u8,
    /// Probability of class 1, when the model exposes one
    pub positive_probability: Option<f64>,
}

impl BinaryOutcome {
    /// Probability of the predicted class rather than of class 1
    pub fn predicted_class_probability(&self) -> Option<f64> {
        self.positive_probability
            .map(|p| if self.label == 1 { p } else { 1.0 - p })
    }
}

/// Values produced by a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionOutput {
    Regression {
        values: Vec<f64>,
    },
    Classification {
        labels: Vec<u8>,
        /// Probability of the predicted class, per row
        probabilities: Option<Vec<f64>>,
    },
}

impl PredictionOutput {
    pub fn len(&self) -> usize {
        match self {
            PredictionOutput::Regression { values } => values.len(),
            PredictionOutput::Classification { labels, .. } => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a dispatched prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub task: Task,
    pub model: String,
    pub family: ModelFamily,
    pub features: Vec<String>,
    pub attempts: usize,
    pub fell_back: bool,
    pub output: PredictionOutput,
}

/// One ranked feature-importance entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}
