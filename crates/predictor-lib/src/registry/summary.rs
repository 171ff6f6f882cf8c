//! Display summaries of discovered models

use crate::models::{ModelDescriptor, ModelFamily, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const NO_METRICS: &str = "No metrics available";

/// What a caller shows for one model without loading it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub family: ModelFamily,
    pub task: Option<Task>,
    pub task_label: String,
    pub performance: String,
    pub technology: String,
    pub required_features: usize,
    pub has_scaler: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ModelSummary {
    pub fn from_descriptor(descriptor: &ModelDescriptor) -> Self {
        let task = Task::from_model_name(&descriptor.name);
        let modified_at = std::fs::metadata(&descriptor.artifact_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Self {
            name: descriptor.name.clone(),
            family: descriptor.family,
            task,
            task_label: task.map(|t| t.label()).unwrap_or("Other").to_string(),
            performance: performance(descriptor, task),
            technology: technology(descriptor.family).to_string(),
            required_features: descriptor.required_features.len(),
            has_scaler: descriptor.companion_path.is_some(),
            modified_at,
        }
    }
}

/// Headline metric: RMSE before R² for regressors, accuracy for classifiers
fn performance(descriptor: &ModelDescriptor, task: Option<Task>) -> String {
    let headline = match task {
        Some(Task::AirportClassification) => descriptor
            .metric("accuracy")
            .map(|v| format!("Accuracy: {:.4}", v)),
        Some(Task::FarePrediction) | Some(Task::DurationPrediction) => descriptor
            .metric("rmse")
            .map(|v| format!("RMSE: {:.4}", v))
            .or_else(|| descriptor.metric("r2").map(|v| format!("R²: {:.4}", v))),
        None => return "Metrics not defined".to_string(),
    };
    headline.unwrap_or_else(|| NO_METRICS.to_string())
}

fn technology(family: ModelFamily) -> &'static str {
    match family {
        ModelFamily::TreeEnsemble => "Tree ensemble",
        ModelFamily::NeuralNetwork => "Neural network",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn descriptor(name: &str, family: ModelFamily, metrics: &[(&str, f64)]) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            family,
            artifact_path: PathBuf::from(format!("/nonexistent/{}", name)),
            companion_path: None,
            metrics: metrics
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            required_features: vec![],
        }
    }

    #[test]
    fn test_regression_prefers_rmse() {
        let metrics = [("rmse", 2.5), ("r2", 0.9)];
        let d = descriptor("driver_pay_rf", ModelFamily::TreeEnsemble, &metrics);
        let s = ModelSummary::from_descriptor(&d);
        assert_eq!(s.task, Some(Task::FarePrediction));
        assert_eq!(s.performance, "RMSE: 2.5000");
        assert_eq!(s.technology, "Tree ensemble");
        assert!(s.modified_at.is_none());
    }

    #[test]
    fn test_regression_falls_back_to_r2() {
        let d = descriptor("trip_time_nn", ModelFamily::NeuralNetwork, &[("r2", 0.75)]);
        let s = ModelSummary::from_descriptor(&d);
        assert_eq!(s.performance, "R²: 0.7500");
        assert_eq!(s.technology, "Neural network");
    }

    #[test]
    fn test_classifier_reports_accuracy() {
        let with = descriptor("airport_lgb", ModelFamily::TreeEnsemble, &[("accuracy", 0.5)]);
        assert_eq!(ModelSummary::from_descriptor(&with).performance, "Accuracy: 0.5000");
        let without = descriptor("airport_lgb", ModelFamily::TreeEnsemble, &[("rmse", 1.0)]);
        assert_eq!(ModelSummary::from_descriptor(&without).performance, NO_METRICS);
    }

    #[test]
    fn test_unknown_task() {
        let d = descriptor("tip_model", ModelFamily::TreeEnsemble, &[("rmse", 1.0)]);
        let s = ModelSummary::from_descriptor(&d);
        assert_eq!(s.task, None);
        assert_eq!(s.task_label, "Other");
        assert_eq!(s.performance, "Metrics not defined");
    }
}
