//! Neural-network artifacts run through tract
//!
//! The network is parsed once at load time; the input shape is only known
//! per request, so each call pins it to `[rows, columns]` before
//! optimizing and running the plan.

use super::scaler::StandardScaler;
use super::InvocablePredictor;
use crate::models::{BinaryOutcome, FeatureMatrix, ModelFamily};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::debug;

/// Sigmoid outputs above this are labelled 1
const DECISION_THRESHOLD: f64 = 0.5;

/// Dense output of a forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkOutput {
    pub n_rows: usize,
    pub width: usize,
    pub values: Vec<f64>,
}

/// Trait for anything that maps a feature matrix to a dense output
pub trait Network {
    fn forward(&self, input: &FeatureMatrix) -> Result<NetworkOutput>;
}

/// ONNX network loaded with tract
pub struct OnnxNetwork {
    model: InferenceModel,
}

impl OnnxNetwork {
    pub fn load(path: &Path) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to parse ONNX model {:?}", path))?;
        Ok(Self { model })
    }
}

impl Network for OnnxNetwork {
    fn forward(&self, input: &FeatureMatrix) -> Result<NetworkOutput> {
        let start = Instant::now();
        let (rows, cols) = (input.n_rows(), input.n_cols());

        let plan = self
            .model
            .clone()
            .with_input_fact(0, f32::fact([rows, cols]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        let data: Vec<f32> = input.values().iter().map(|v| *v as f32).collect();
        let tensor: Tensor = tract_ndarray::Array2::from_shape_vec((rows, cols), data)?.into();

        let result = plan.run(tvec!(tensor.into()))?;
        let output = result.get(0).context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        let values: Vec<f64> = view.iter().map(|v| *v as f64).collect();

        let width = if rows == 0 { 0 } else { values.len() / rows };
        if width * rows != values.len() {
            anyhow::bail!(
                "Model output has {} values, not divisible across {} rows",
                values.len(),
                rows
            );
        }

        debug!(elapsed_us = start.elapsed().as_micros(), rows, width, "Forward pass completed");
        Ok(NetworkOutput {
            n_rows: rows,
            width,
            values,
        })
    }
}

/// Neural predictor: optional companion scaler, then the network
pub struct NeuralPredictor<N = OnnxNetwork> {
    network: N,
    scaler: Option<StandardScaler>,
}

impl<N: Network> NeuralPredictor<N> {
    pub fn new(network: N, scaler: Option<StandardScaler>) -> Self {
        Self { network, scaler }
    }

    fn forward(&self, features: &FeatureMatrix) -> Result<NetworkOutput> {
        match &self.scaler {
            Some(scaler) => self.network.forward(&scaler.transform(features)?),
            None => self.network.forward(features),
        }
    }
}

impl<N: Network> InvocablePredictor for NeuralPredictor<N> {
    fn family(&self) -> ModelFamily {
        ModelFamily::NeuralNetwork
    }

    /// Flattened network output
    fn infer(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self.forward(features)?.values)
    }

    fn classify(&self, features: &FeatureMatrix) -> Result<Vec<BinaryOutcome>> {
        let output = self.forward(features)?;
        match output.width {
            // single sigmoid unit
            1 => Ok(output
                .values
                .into_iter()
                .map(|p| BinaryOutcome {
                    label: u8::from(p > DECISION_THRESHOLD),
                    positive_probability: Some(p),
                })
                .collect()),
            // two-column softmax; ties go to class 0
            2 => Ok(output
                .values
                .chunks(2)
                .map(|pair| BinaryOutcome {
                    label: u8::from(pair[1] > pair[0]),
                    positive_probability: Some(pair[1]),
                })
                .collect()),
            0 => Ok(Vec::new()),
            width => anyhow::bail!("Binary classifier output has {} columns", width),
        }
    }
}
