//! Artifact Store naming conventions
//!
//! ```text
//! <name>.ensemble          tree ensemble
//! <name>.onnx              neural network
//! <base>_metrics.json      optional metrics sidecar
//! <base>_scaler.json       optional scaler, neural networks only
//! ```
//!
//! `<base>` is the descriptor name, with a trailing `_nn` stripped for
//! neural networks (`driver_pay_nn.onnx` pairs with `driver_pay_metrics.json`).

use crate::models::ModelFamily;
use std::path::{Path, PathBuf};

pub const NEURAL_SUFFIX: &str = "_nn";
pub const METRICS_SUFFIX: &str = "_metrics.json";
pub const SCALER_SUFFIX: &str = "_scaler.json";

/// Name and family of a primary artifact, or `None` for any other file
pub fn primary_artifact(path: &Path) -> Option<(String, ModelFamily)> {
    let family = ModelFamily::from_extension(path.extension()?.to_str()?)?;
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some((stem.to_string(), family))
}

/// Stem shared by a descriptor's sidecar files
pub fn sidecar_base(name: &str, family: ModelFamily) -> &str {
    match family {
        ModelFamily::NeuralNetwork => name.strip_suffix(NEURAL_SUFFIX).unwrap_or(name),
        ModelFamily::TreeEnsemble => name,
    }
}

pub fn metrics_path(store: &Path, name: &str, family: ModelFamily) -> PathBuf {
    store.join(format!("{}{}", sidecar_base(name, family), METRICS_SUFFIX))
}

/// Scaler location; tree ensembles embed their own preprocessing
pub fn scaler_path(store: &Path, name: &str, family: ModelFamily) -> Option<PathBuf> {
    match family {
        ModelFamily::NeuralNetwork => {
            Some(store.join(format!("{}{}", sidecar_base(name, family), SCALER_SUFFIX)))
        }
        ModelFamily::TreeEnsemble => None,
    }
}
