//! Typed failure signals surfaced to callers

use crate::models::Task;
use std::path::PathBuf;
use thiserror::Error;

/// Discovery errors; only a wholly inaccessible store is fatal
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("artifact store unavailable at {path:?}")]
    ArtifactStoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    pub fn category(&self) -> FailureCategory {
        FailureCategory::NoModel
    }
}

/// Final outcome of a failed dispatch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("no model available for task {task}")]
    NoModelAvailable { task: Task },

    #[error("no usable features for model {model}")]
    NoUsableFeatures { model: String },

    #[error("inference failed for model {model} after {attempts} attempt(s): {message}")]
    InferenceFailure {
        model: String,
        attempts: usize,
        message: String,
    },
}

impl PredictionError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PredictionError::NoModelAvailable { .. } => FailureCategory::NoModel,
            PredictionError::NoUsableFeatures { .. } => FailureCategory::NoUsableData,
            PredictionError::InferenceFailure { .. } => FailureCategory::EngineError,
        }
    }
}

/// Message category shown to users when a prediction is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    NoModel,
    NoUsableData,
    EngineError,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::NoModel => "no_model",
            FailureCategory::NoUsableData => "no_usable_data",
            FailureCategory::EngineError => "engine_error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FailureCategory::NoModel => {
                "No trained model is available for this prediction. Train the models first."
            }
            FailureCategory::NoUsableData => {
                "The supplied data has none of the features the model needs."
            }
            FailureCategory::EngineError => {
                "The prediction engine failed to produce a result."
            }
        }
    }
}

/// Malformed prediction request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("duplicate column {0}")]
    DuplicateColumn(String),

    #[error("column {column} has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("missing value for column {column} in row {row}")]
    MissingValue { column: String, row: usize },

    #[error("unknown column {0}")]
    UnknownColumn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_distinct_category() {
        let errors = [
            PredictionError::NoModelAvailable { task: Task::FarePrediction },
            PredictionError::NoUsableFeatures { model: "m".into() },
            PredictionError::InferenceFailure {
                model: "m".into(),
                attempts: 2,
                message: "boom".into(),
            },
        ];
        let categories: Vec<_> = errors.iter().map(|e| e.category()).collect();
        assert_eq!(
            categories,
            vec![
                FailureCategory::NoModel,
                FailureCategory::NoUsableData,
                FailureCategory::EngineError
            ]
        );
        assert_ne!(categories[0].message(), categories[1].message());
        assert_ne!(categories[1].message(), categories[2].message());
    }

    #[test]
    fn test_store_unavailable_reads_as_no_models() {
        let err = RegistryError::ArtifactStoreUnavailable {
            path: PathBuf::from("/missing"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.category(), FailureCategory::NoModel);
        assert!(err.to_string().contains("/missing"));
    }
}
