//! Standard scaling shared by neural companions and tree pipelines

use crate::models::FeatureMatrix;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-column standardization: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    /// Columns the scaler was fitted on, in order
    #[serde(default)]
    pub feature_names_in: Vec<String>,
    #[serde(default)]
    pub feature_names_out: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler {:?}", path))?;
        let scaler: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scaler {:?}", path))?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "Scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            );
        }
        if !self.feature_names_in.is_empty() && self.feature_names_in.len() != self.mean.len() {
            anyhow::bail!(
                "Scaler names {} input features but has {} means",
                self.feature_names_in.len(),
                self.mean.len()
            );
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Output column names, if the scaler can produce them
    pub fn feature_names_out(&self) -> Option<Vec<String>> {
        match &self.feature_names_out {
            Some(names) => Some(names.clone()),
            None if !self.feature_names_in.is_empty() => Some(self.feature_names_in.clone()),
            None => None,
        }
    }

    pub fn transform(&self, features: &FeatureMatrix) -> Result<FeatureMatrix> {
        if features.n_cols() != self.n_features() {
            anyhow::bail!(
                "Scaler expects {} features, got {}",
                self.n_features(),
                features.n_cols()
            );
        }

        Ok(features.map_rows(|row| {
            row.iter()
                .zip(self.mean.iter().zip(&self.scale))
                .map(|(x, (mean, scale))| {
                    // zero-variance columns are only centered
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    (x - mean) / scale
                })
                .collect()
        }))
    }
}
