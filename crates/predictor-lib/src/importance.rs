//! Ranked feature importances for tree-ensemble models

use crate::models::{FeatureImportance, ModelFamily};
use crate::predictor::{ArtifactLoader, FileLoader, RawImportances};
use crate::registry::ModelRegistry;
use tracing::{debug, warn};

/// Reads native importances without ever failing the caller
pub struct ImportanceReporter<'r, L = FileLoader> {
    registry: &'r ModelRegistry,
    loader: L,
}

impl<'r> ImportanceReporter<'r, FileLoader> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self::with_loader(registry, FileLoader)
    }
}

impl<'r, L: ArtifactLoader> ImportanceReporter<'r, L> {
    pub fn with_loader(registry: &'r ModelRegistry, loader: L) -> Self {
        Self { registry, loader }
    }

    /// Importances for `name`, highest first.
    ///
    /// `None` means "unavailable": unknown model, a neural network, an
    /// artifact that fails to load, or an estimator without scores.
    pub fn importances(&self, name: &str) -> Option<Vec<FeatureImportance>> {
        let Some(descriptor) = self.registry.get(name) else {
            debug!(model = %name, "Importance requested for unknown model");
            return None;
        };
        if descriptor.family != ModelFamily::TreeEnsemble {
            debug!(model = %name, family = %descriptor.family, "Model has no native importances");
            return None;
        }

        let predictor = match self.loader.load(descriptor) {
            Ok(predictor) => predictor,
            Err(e) => {
                warn!(
                    model = %name,
                    error = %format!("{:#}", e),
                    "Failed to load model for importances"
                );
                return None;
            }
        };

        predictor.feature_importances().map(rank)
    }
}

/// Pair scores with names and sort descending; ties keep input order
pub fn rank(raw: RawImportances) -> Vec<FeatureImportance> {
    let names = match raw.feature_names {
        Some(names) if names.len() == raw.scores.len() => names,
        _ => (0..raw.scores.len()).map(|i| format!("feature_{}", i)).collect(),
    };

    let mut ranked: Vec<FeatureImportance> = names
        .into_iter()
        .zip(raw.scores)
        .map(|(feature, score)| FeatureImportance { feature, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelDescriptor;
    use std::fs;
    use tempfile::TempDir;

    const PIPELINE: &str = r#"{
        "kind": "pipeline",
        "steps": [
            {"step": "preprocessor", "mean": [0.0, 0.0], "scale": [1.0, 1.0],
             "feature_names_in": ["trip_miles", "pickup_hour"],
             "feature_names_out": ["num__trip_miles", "num__pickup_hour"]},
            {"step": "regressor", "objective": "regression", "n_features": 2,
             "feature_importances": [0.25, 0.75],
             "nodes_treeids": [0], "nodes_nodeids": [0], "nodes_featureids": [0],
             "nodes_modes": ["LEAF"], "nodes_values": [0.0],
             "nodes_truenodeids": [0], "nodes_falsenodeids": [0],
             "target_treeids": [0], "target_nodeids": [0], "target_weights": [1.0]}
        ]
    }"#;

    const BARE: &str = r#"{
        "kind": "estimator", "objective": "binary", "n_features": 3,
        "aggregate_function": "AVERAGE",
        "feature_names": ["a", "b", "c"],
        "feature_importances": [0.5, 0.25, 0.25],
        "nodes_treeids": [0], "nodes_nodeids": [0], "nodes_featureids": [0],
        "nodes_modes": ["LEAF"], "nodes_values": [0.0],
        "nodes_truenodeids": [0], "nodes_falsenodeids": [0],
        "target_treeids": [0], "target_nodeids": [0], "target_weights": [0.5]
    }"#;

    /// Splits reference a feature the estimator does not have
    const MALFORMED: &str = r#"{
        "kind": "estimator", "objective": "regression", "n_features": 1,
        "nodes_treeids": [0, 0, 0], "nodes_nodeids": [0, 1, 2],
        "nodes_featureids": [4, 0, 0], "nodes_values": [1.0, 0.0, 0.0],
        "nodes_modes": ["BRANCH_LEQ", "LEAF", "LEAF"],
        "nodes_truenodeids": [1, 0, 0], "nodes_falsenodeids": [2, 0, 0],
        "target_treeids": [0, 0], "target_nodeids": [1, 2], "target_weights": [1.0, 2.0]
    }"#;

    fn store(files: &[(&str, &str)]) -> (TempDir, ModelRegistry) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let registry = ModelRegistry::discover(dir.path()).unwrap();
        (dir, registry)
    }

    fn names(ranked: &[FeatureImportance]) -> Vec<&str> {
        ranked.iter().map(|f| f.feature.as_str()).collect()
    }

    #[test]
    fn test_pipeline_uses_preprocessor_names() {
        let (_dir, registry) = store(&[("driver_pay_predictor.ensemble", PIPELINE)]);
        let reporter = ImportanceReporter::new(&registry);

        let ranked = reporter.importances("driver_pay_predictor").unwrap();
        assert_eq!(names(&ranked), vec!["num__pickup_hour", "num__trip_miles"]);
        assert_eq!(ranked[0].score, 0.75);
    }

    #[test]
    fn test_bare_estimator_gets_positional_names() {
        let (_dir, registry) = store(&[("airport_rf.ensemble", BARE)]);
        let ranked = ImportanceReporter::new(&registry).importances("airport_rf").unwrap();
        assert_eq!(names(&ranked), vec!["feature_0", "feature_1", "feature_2"]);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let (_dir, registry) = store(&[("airport_rf.ensemble", BARE)]);
        let reporter = ImportanceReporter::new(&registry);
        assert_eq!(reporter.importances("airport_rf"), reporter.importances("airport_rf"));
    }

    #[test]
    fn test_unavailable_cases_return_none() {
        let (_dir, registry) = store(&[
            ("driver_pay_nn.onnx", "opaque"),
            ("trip_time_rf.ensemble", "{ not json"),
            ("airport_rf.ensemble", MALFORMED),
        ]);
        let reporter = ImportanceReporter::new(&registry);

        assert!(reporter.importances("driver_pay_nn").is_none());
        assert!(reporter.importances("trip_time_rf").is_none());
        assert!(reporter.importances("airport_rf").is_none());
        assert!(reporter.importances("missing").is_none());
    }

    #[test]
    fn test_neural_model_is_never_loaded() {
        struct Panicking;
        impl ArtifactLoader for Panicking {
            fn load(
                &self,
                descriptor: &ModelDescriptor,
            ) -> anyhow::Result<Box<dyn crate::predictor::InvocablePredictor>> {
                panic!("unexpected load of {}", descriptor.name)
            }
        }

        let registry = ModelRegistry::from_descriptors(
            "/store",
            vec![ModelDescriptor {
                name: "airport_nn".to_string(),
                family: ModelFamily::NeuralNetwork,
                artifact_path: "/store/airport_nn.onnx".into(),
                companion_path: None,
                metrics: Default::default(),
                required_features: vec![],
            }],
        );
        assert!(ImportanceReporter::with_loader(&registry, Panicking)
            .importances("airport_nn")
            .is_none());
    }

    #[test]
    fn test_rank_falls_back_on_name_count_mismatch() {
        let ranked = rank(RawImportances {
            scores: vec![0.1, 0.6, 0.3],
            feature_names: Some(vec!["x".to_string(), "y".to_string()]),
        });
        assert_eq!(names(&ranked), vec!["feature_1", "feature_2", "feature_0"]);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let ranked = rank(RawImportances {
            scores: vec![0.2, 0.4, 0.2, 0.2],
            feature_names: None,
        });
        assert_eq!(
            names(&ranked),
            vec!["feature_1", "feature_0", "feature_2", "feature_3"]
        );
    }

    #[test]
    fn test_rank_orders_nan_scores_without_panicking() {
        let ranked = rank(RawImportances {
            scores: vec![0.3, f64::NAN, 0.5, 0.3, f64::NAN],
            feature_names: None,
        });
        assert_eq!(ranked.len(), 5);
        let finite: Vec<&str> = ranked
            .iter()
            .filter(|f| !f.score.is_nan())
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(finite, vec!["feature_2", "feature_0", "feature_3"]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(RawImportances {
            scores: vec![],
            feature_names: None
        })
        .is_empty());
    }
}
