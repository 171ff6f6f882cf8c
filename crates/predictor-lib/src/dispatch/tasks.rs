//! Static task → model preference table
//!
//! Tree ensembles come first for every task: they need no external scaler
//! and are cheaper to invoke. The table is fixed on purpose so the choice
//! of model never depends on which files happen to be on disk beyond
//! presence.

use crate::models::{ModelDescriptor, ModelFamily, Task};
use crate::registry::ModelRegistry;

/// Acceptable descriptor names for one family, most preferred first
#[derive(Debug, Clone, Copy)]
pub struct FamilyStage {
    pub family: ModelFamily,
    pub names: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct TaskBinding {
    pub task: Task,
    pub stages: &'static [FamilyStage],
}

pub static TASK_BINDINGS: [TaskBinding; 3] = [
    TaskBinding {
        task: Task::FarePrediction,
        stages: &[
            FamilyStage {
                family: ModelFamily::TreeEnsemble,
                names: &["driver_pay_predictor", "driver_pay_lgb", "driver_pay_rf"],
            },
            FamilyStage {
                family: ModelFamily::NeuralNetwork,
                names: &["driver_pay_nn"],
            },
        ],
    },
    TaskBinding {
        task: Task::AirportClassification,
        stages: &[
            FamilyStage {
                family: ModelFamily::TreeEnsemble,
                names: &["airport_classifier", "airport_lgb", "airport_rf"],
            },
            FamilyStage {
                family: ModelFamily::NeuralNetwork,
                names: &["airport_nn"],
            },
        ],
    },
    TaskBinding {
        task: Task::DurationPrediction,
        stages: &[
            FamilyStage {
                family: ModelFamily::TreeEnsemble,
                names: &["trip_time_predictor", "trip_time_lgb", "trip_time_rf"],
            },
            FamilyStage {
                family: ModelFamily::NeuralNetwork,
                names: &["trip_time_nn"],
            },
        ],
    },
];

pub fn binding(task: Task) -> &'static TaskBinding {
    TASK_BINDINGS
        .iter()
        .find(|b| b.task == task)
        .unwrap_or_else(|| unreachable!("every task has a binding"))
}

impl TaskBinding {
    /// At most one descriptor per family stage, in preference order
    pub fn resolve<'r>(&self, registry: &'r ModelRegistry) -> Vec<&'r ModelDescriptor> {
        self.stages
            .iter()
            .filter_map(|stage| {
                stage
                    .names
                    .iter()
                    .filter_map(|name| registry.get(name))
                    .find(|d| d.family == stage.family)
            })
            .collect()
    }
}
