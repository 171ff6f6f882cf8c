//! Model registry built from the Artifact Store
//!
//! Every `discover()` call rescans the store and builds a fresh, immutable
//! mapping from descriptor name to descriptor. Missing or unreadable
//! sidecars degrade the descriptor (no metrics, no schema) but never fail
//! discovery; only an unlistable store does.

pub mod layout;
mod summary;

pub use summary::{ModelSummary, NO_METRICS};

use crate::error::RegistryError;
use crate::models::{ModelDescriptor, ModelFamily};
use crate::observability::PredictorMetrics;
use crate::predictor::{StandardScaler, TreeArtifact};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Immutable snapshot of the artifacts found in one scan
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    store: PathBuf,
    descriptors: BTreeMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    /// Scan `store` and describe every primary artifact in it
    pub fn discover(store: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let store = store.as_ref();
        let entries =
            fs::read_dir(store).map_err(|source| RegistryError::ArtifactStoreUnavailable {
                path: store.to_path_buf(),
                source,
            })?;

        let mut candidates: Vec<(String, ModelFamily, PathBuf)> = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(store = ?store, error = %e, "Skipping unreadable store entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Some((name, family)) = layout::primary_artifact(&path) {
                candidates.push((name, family, path));
            }
        }

        // deterministic regardless of directory order; tree ensembles win name clashes
        candidates.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

        let mut descriptors: BTreeMap<String, ModelDescriptor> = BTreeMap::new();
        for (name, family, path) in candidates {
            if let Some(existing) = descriptors.get(&name) {
                warn!(
                    model = %name,
                    kept = %existing.family,
                    ignored = ?path,
                    "Duplicate descriptor name in artifact store"
                );
                continue;
            }
            let descriptor = describe(store, name.clone(), family, path);
            descriptors.insert(name, descriptor);
        }

        info!(
            event = "models_discovered",
            store = ?store,
            models = descriptors.len(),
            "Artifact store scanned"
        );
        PredictorMetrics::new().set_models_discovered(descriptors.len() as i64);

        Ok(Self {
            store: store.to_path_buf(),
            descriptors,
        })
    }

    /// Build a registry from already-known descriptors
    pub fn from_descriptors(
        store: impl Into<PathBuf>,
        descriptors: impl IntoIterator<Item = ModelDescriptor>,
    ) -> Self {
        Self {
            store: store.into(),
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Display summaries for every descriptor, in name order
    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.descriptors.values().map(ModelSummary::from_descriptor).collect()
    }
}

fn describe(
    store: &Path,
    name: String,
    family: ModelFamily,
    artifact_path: PathBuf,
) -> ModelDescriptor {
    let metrics = load_metrics(&layout::metrics_path(store, &name, family));
    let companion_path = layout::scaler_path(store, &name, family).filter(|p| p.is_file());
    let required_features = read_schema(family, &artifact_path, companion_path.as_deref());

    debug!(
        model = %name,
        family = %family,
        metrics = metrics.len(),
        features = required_features.len(),
        scaler = companion_path.is_some(),
        "Discovered model"
    );

    ModelDescriptor {
        name,
        family,
        artifact_path,
        companion_path,
        metrics,
        required_features,
    }
}

/// Numeric entries of a metrics sidecar; empty when absent or malformed
fn load_metrics(path: &Path) -> BTreeMap<String, f64> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = ?path, "No metrics sidecar");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to read metrics sidecar");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&content) {
        Ok(raw) => raw
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
            .collect(),
        Err(e) => {
            warn!(path = ?path, error = %e, "Malformed metrics sidecar");
            BTreeMap::new()
        }
    }
}

/// Expected input columns; empty puts the descriptor in schema-less mode
fn read_schema(family: ModelFamily, artifact: &Path, companion: Option<&Path>) -> Vec<String> {
    let schema = match family {
        ModelFamily::TreeEnsemble => {
            TreeArtifact::from_path(artifact).map(|a| a.required_features())
        }
        ModelFamily::NeuralNetwork => match companion {
            Some(path) => StandardScaler::from_path(path).map(|s| s.feature_names_in),
            None => Ok(Vec::new()),
        },
    };

    schema.unwrap_or_else(|e| {
        warn!(artifact = ?artifact, error = %e, "Could not read feature schema");
        Vec::new()
    })
}
