//! Invocable predictors and the loaders that build them
//!
//! Tree ensembles and neural networks sit behind one capability so the
//! dispatcher never branches on family. Only the registry and the loader
//! know concrete artifact formats.

mod ensemble;
mod neural;
mod scaler;

pub use ensemble::{
    AggregateFunction, EnsemblePredictor, NodeMode, Objective, Pipeline, PipelineStep,
    PostTransform, TreeArtifact, TreeEnsemble,
};
pub use neural::{Network, NetworkOutput, NeuralPredictor, OnnxNetwork};
pub use scaler::StandardScaler;

use crate::models::{BinaryOutcome, FeatureMatrix, ModelDescriptor, ModelFamily};
use anyhow::Result;

/// Raw importance scores plus the names the embedded preprocessor produces
#[derive(Debug, Clone, PartialEq)]
pub struct RawImportances {
    pub scores: Vec<f64>,
    pub feature_names: Option<Vec<String>>,
}

/// Trait for loaded artifacts that can answer predictions
pub trait InvocablePredictor {
    fn family(&self) -> ModelFamily;

    /// Point predictions, one per row
    fn infer(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Binary labels with the class-1 probability where available
    fn classify(&self, features: &FeatureMatrix) -> Result<Vec<BinaryOutcome>>;

    /// Native importance scores; only tree ensembles expose them
    fn feature_importances(&self) -> Option<RawImportances> {
        None
    }
}

/// Trait for turning a descriptor into an invocable predictor
pub trait ArtifactLoader {
    fn load(&self, descriptor: &ModelDescriptor) -> Result<Box<dyn InvocablePredictor>>;
}

/// Loads artifacts from the files recorded in the descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl ArtifactLoader for FileLoader {
    fn load(&self, descriptor: &ModelDescriptor) -> Result<Box<dyn InvocablePredictor>> {
        match descriptor.family {
            ModelFamily::TreeEnsemble => {
                let artifact = TreeArtifact::from_path(&descriptor.artifact_path)?;
                Ok(Box::new(EnsemblePredictor::new(artifact)?))
            }
            ModelFamily::NeuralNetwork => {
                let network = OnnxNetwork::load(&descriptor.artifact_path)?;
                let scaler = descriptor
                    .companion_path
                    .as_deref()
                    .map(StandardScaler::from_path)
                    .transpose()?;
                Ok(Box::new(NeuralPredictor::new(network, scaler)))
            }
        }
    }
}
