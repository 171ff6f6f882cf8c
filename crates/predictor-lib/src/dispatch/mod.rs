//! Prediction dispatch with a single cross-family fallback hop
//!
//! Per call: select candidates for the task, align the request against the
//! candidate's schema, load and invoke it, and on a load or inference
//! error retry the whole sequence once with the next candidate. Nothing
//! low-level escapes: every failure becomes a [`PredictionError`].

mod tasks;


pub use tasks::{binding, FamilyStage, TaskBinding, TASK_BINDINGS};

use crate::aligner::align_with;
use crate::error::PredictionError;
use crate::models::{FeatureFrame, ModelDescriptor, Prediction, PredictionOutput, Task};
use crate::observability::{PredictorMetrics, StructuredLogger};
use crate::predictor::{ArtifactLoader, FileLoader};
use crate::registry::ModelRegistry;
use anyhow::Context;
use std::time::Instant;
use tracing::debug;

/// Primary attempt plus at most one fallback hop
pub const MAX_ATTEMPTS: usize = 2;

/// Why a single attempt did not produce a prediction
enum AttemptError {
    NoUsableFeatures,
    Inference(anyhow::Error),
}

/// Answers task predictions from a registry snapshot
pub struct Dispatcher<'r, L = FileLoader> {
    registry: &'r ModelRegistry,
    loader: L,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
}

impl<'r> Dispatcher<'r, FileLoader> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self::with_loader(registry, FileLoader)
    }
}

impl<'r, L: ArtifactLoader> Dispatcher<'r, L> {
    pub fn with_loader(registry: &'r ModelRegistry, loader: L) -> Self {
        Self {
            registry,
            loader,
            metrics: PredictorMetrics::new(),
            logger: StructuredLogger::new("library"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.registry
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn predict(&self, task: Task, frame: &FeatureFrame) -> Result<Prediction, PredictionError> {
        self.predict_with(task, frame, None)
    }

    /// Predict, using `explicit` columns for models that record no schema
    pub fn predict_with(
        &self,
        task: Task,
        frame: &FeatureFrame,
        explicit: Option<&[String]>,
    ) -> Result<Prediction, PredictionError> {
        let candidates = binding(task).resolve(self.registry);
        if candidates.is_empty() {
            return Err(self.fail(task, PredictionError::NoModelAvailable { task }));
        }

        let mut attempts = 0;
        let mut last: Option<(&ModelDescriptor, anyhow::Error)> = None;

        for (idx, descriptor) in candidates.iter().take(MAX_ATTEMPTS).enumerate() {
            attempts += 1;
            debug!(
                task = %task,
                model = %descriptor.name,
                attempt = attempts,
                "Dispatching prediction"
            );

            match self.attempt(task, descriptor, frame, explicit) {
                Ok((output, features)) => {
                    self.metrics.inc_predictions(task.as_str(), descriptor.family.as_str());
                    self.logger.log_prediction(
                        task.as_str(),
                        &descriptor.name,
                        descriptor.family.as_str(),
                        frame.n_rows(),
                        features.len(),
                        attempts,
                    );
                    return Ok(Prediction {
                        task,
                        model: descriptor.name.clone(),
                        family: descriptor.family,
                        features,
                        attempts,
                        fell_back: idx > 0,
                        output,
                    });
                }
                Err(AttemptError::NoUsableFeatures) => {
                    return Err(self.fail(
                        task,
                        PredictionError::NoUsableFeatures {
                            model: descriptor.name.clone(),
                        },
                    ));
                }
                Err(AttemptError::Inference(e)) => {
                    if let Some(next) = candidates.get(idx + 1).filter(|_| idx + 1 < MAX_ATTEMPTS) {
                        self.metrics.inc_fallbacks(task.as_str());
                        self.logger.log_fallback(
                            task.as_str(),
                            &descriptor.name,
                            &next.name,
                            &format!("{:#}", e),
                        );
                    }
                    last = Some((descriptor, e));
                }
            }
        }

        let (descriptor, e) = last.unwrap_or_else(|| unreachable!("at least one attempt ran"));
        Err(self.fail(
            task,
            PredictionError::InferenceFailure {
                model: descriptor.name.clone(),
                attempts,
                message: format!("{:#}", e),
            },
        ))
    }

    /// Align, then load and invoke one descriptor
    fn attempt(
        &self,
        task: Task,
        descriptor: &ModelDescriptor,
        frame: &FeatureFrame,
        explicit: Option<&[String]>,
    ) -> Result<(PredictionOutput, Vec<String>), AttemptError> {
        let features = align_with(frame.column_names(), &descriptor.required_features, explicit);
        if features.is_empty() {
            return Err(AttemptError::NoUsableFeatures);
        }

        let start = Instant::now();
        let output = self
            .invoke(task, descriptor, frame, &features)
            .map_err(AttemptError::Inference)?;
        self.metrics.observe_inference_latency(
            descriptor.family.as_str(),
            start.elapsed().as_secs_f64(),
        );

        Ok((output, features))
    }

    fn invoke(
        &self,
        task: Task,
        descriptor: &ModelDescriptor,
        frame: &FeatureFrame,
        features: &[String],
    ) -> anyhow::Result<PredictionOutput> {
        let matrix = frame.select(features)?;
        let predictor = self
            .loader
            .load(descriptor)
            .with_context(|| format!("Failed to load model {}", descriptor.name))?;

        let output = if task.is_classification() {
            let outcomes = predictor.classify(&matrix)?;
            let probabilities = outcomes
                .iter()
                .map(|o| o.predicted_class_probability())
                .collect::<Option<Vec<f64>>>();
            PredictionOutput::Classification {
                labels: outcomes.iter().map(|o| o.label).collect(),
                probabilities,
            }
        } else {
            PredictionOutput::Regression {
                values: predictor.infer(&matrix)?,
            }
        };

        if output.len() != frame.n_rows() {
            anyhow::bail!(
                "Model {} returned {} predictions for {} rows",
                descriptor.name,
                output.len(),
                frame.n_rows()
            );
        }
        Ok(output)
    }

    fn fail(&self, task: Task, error: PredictionError) -> PredictionError {
        let category = error.category();
        self.metrics.inc_failures(task.as_str(), category.as_str());
        self.logger
            .log_failure(task.as_str(), category.as_str(), &error.to_string());
        error
    }
}
