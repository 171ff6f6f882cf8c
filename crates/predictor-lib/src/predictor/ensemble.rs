//! Tree-ensemble artifacts
//!
//! A `.ensemble` file is JSON holding either a bare estimator or a
//! pipeline whose steps are an optional preprocessor followed by a final
//! `regressor` or `classifier`. Estimators carry their trees as the flat
//! node and target attributes of the ONNX-ML `TreeEnsembleRegressor`
//! operator, the layout skl2onnx and onnxmltools export, and are scored by
//! tract's tree-ensemble kernel.

use super::scaler::StandardScaler;
use super::{InvocablePredictor, RawImportances};
use crate::models::{BinaryOutcome, FeatureMatrix, ModelFamily};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tract_onnx::prelude::*;
use tract_onnx_opl::ml::tree::{Aggregate, Cmp, TreeEnsemble as Kernel, TreeEnsembleData};

/// Rows whose class-1 probability exceeds this are labelled 1
const DECISION_THRESHOLD: f64 = 0.5;

/// Flag bit marking a branch that sends missing values down the true side
const NAN_IS_TRUE: u32 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Regression,
    Binary,
}

/// How per-tree leaf weights are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFunction {
    #[default]
    Sum,
    Average,
    Min,
    Max,
}

impl From<AggregateFunction> for Aggregate {
    fn from(value: AggregateFunction) -> Self {
        match value {
            AggregateFunction::Sum => Aggregate::Sum,
            AggregateFunction::Average => Aggregate::Avg,
            AggregateFunction::Min => Aggregate::Min,
            AggregateFunction::Max => Aggregate::Max,
        }
    }
}

/// Applied to the aggregated score after the base value is added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostTransform {
    #[default]
    None,
    Logistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeMode {
    #[serde(rename = "BRANCH_LEQ")]
    BranchLeq,
    #[serde(rename = "BRANCH_LT")]
    BranchLt,
    #[serde(rename = "BRANCH_GTE")]
    BranchGte,
    #[serde(rename = "BRANCH_GT")]
    BranchGt,
    #[serde(rename = "BRANCH_EQ")]
    BranchEq,
    #[serde(rename = "BRANCH_NEQ")]
    BranchNeq,
    #[serde(rename = "LEAF")]
    Leaf,
}

impl NodeMode {
    /// Kernel comparison, plus whether the children must be swapped.
    /// The kernel has no `>=`, so it runs as a swapped `<`.
    fn comparison(self) -> Option<(Cmp, bool)> {
        match self {
            NodeMode::BranchLeq => Some((Cmp::LessEqual, false)),
            NodeMode::BranchLt => Some((Cmp::Less, false)),
            NodeMode::BranchGte => Some((Cmp::Less, true)),
            NodeMode::BranchGt => Some((Cmp::Greater, false)),
            NodeMode::BranchEq => Some((Cmp::Equal, false)),
            NodeMode::BranchNeq => Some((Cmp::NotEqual, false)),
            NodeMode::Leaf => None,
        }
    }
}

/// Final estimator of a tree artifact.
///
/// Node `i` of the forest is described by position `i` of every `nodes_*`
/// list; leaf weights are attached through the `target_*` lists. Within a
/// tree, children must carry larger node ids than their parent, which is
/// how scikit-learn and LightGBM number their nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub objective: Objective,
    pub n_features: usize,
    /// Column names seen at fit time, when recorded
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Stored importances; split frequency is used when absent
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
    #[serde(default)]
    pub aggregate_function: AggregateFunction,
    #[serde(default)]
    pub post_transform: PostTransform,
    #[serde(default)]
    pub base_values: Vec<f64>,
    pub nodes_treeids: Vec<u32>,
    pub nodes_nodeids: Vec<u32>,
    pub nodes_featureids: Vec<u32>,
    pub nodes_modes: Vec<NodeMode>,
    pub nodes_values: Vec<f32>,
    pub nodes_truenodeids: Vec<u32>,
    pub nodes_falsenodeids: Vec<u32>,
    #[serde(default)]
    pub nodes_missing_value_tracks_true: Vec<u32>,
    pub target_treeids: Vec<u32>,
    pub target_nodeids: Vec<u32>,
    #[serde(default)]
    pub target_ids: Vec<u32>,
    pub target_weights: Vec<f32>,
}

impl TreeEnsemble {
    fn check_lengths(&self) -> Result<()> {
        let n = self.nodes_nodeids.len();
        let node_lists = [
            ("nodes_treeids", self.nodes_treeids.len()),
            ("nodes_featureids", self.nodes_featureids.len()),
            ("nodes_modes", self.nodes_modes.len()),
            ("nodes_values", self.nodes_values.len()),
            ("nodes_truenodeids", self.nodes_truenodeids.len()),
            ("nodes_falsenodeids", self.nodes_falsenodeids.len()),
        ];
        for (list, len) in node_lists {
            if len != n {
                anyhow::bail!("{} has {} entries, expected {}", list, len, n);
            }
        }
        let tracks = self.nodes_missing_value_tracks_true.len();
        if tracks != 0 && tracks != n {
            anyhow::bail!(
                "nodes_missing_value_tracks_true has {} entries, expected {}",
                tracks,
                n
            );
        }

        let m = self.target_weights.len();
        if self.target_treeids.len() != m || self.target_nodeids.len() != m {
            anyhow::bail!("Target lists disagree on the number of leaf weights");
        }
        if self.target_ids.iter().any(|id| *id != 0) {
            anyhow::bail!("Only single-target ensembles are supported");
        }
        Ok(())
    }

    /// Pack the node attributes into the kernel's row layout.
    ///
    /// Branch rows are `[feature, true_row, false_row, threshold bits,
    /// comparison | NAN_IS_TRUE]`; leaf rows are `[first, end, 0, 0, 0]`
    /// ranges into the `[class, weight bits]` leaf table.
    pub fn compile(&self) -> Result<Kernel> {
        self.check_lengths()?;

        let mut forest: BTreeMap<u32, BTreeMap<u32, usize>> = BTreeMap::new();
        let ids = self.nodes_treeids.iter().zip(&self.nodes_nodeids);
        for (pos, (tree, node)) in ids.enumerate() {
            if forest.entry(*tree).or_default().insert(*node, pos).is_some() {
                anyhow::bail!("Tree {} declares node {} twice", tree, node);
            }
        }
        if forest.is_empty() {
            anyhow::bail!("Ensemble has no trees");
        }

        let mut weights: BTreeMap<(u32, u32), Vec<f32>> = BTreeMap::new();
        for ((tree, node), weight) in self
            .target_treeids
            .iter()
            .zip(&self.target_nodeids)
            .zip(&self.target_weights)
        {
            weights.entry((*tree, *node)).or_default().push(*weight);
        }

        let mut roots: Vec<u32> = Vec::with_capacity(forest.len());
        let mut rows: Vec<u32> = Vec::with_capacity(self.nodes_nodeids.len() * 5);
        let mut leaves: Vec<u32> = Vec::with_capacity(self.target_weights.len() * 2);
        let mut max_feature = 0;

        for (tree, nodes) in &forest {
            let offset = rows.len() / 5;
            let row_of: BTreeMap<u32, u32> = nodes
                .keys()
                .enumerate()
                .map(|(i, node)| (*node, (offset + i) as u32))
                .collect();
            roots.push(offset as u32);

            for (node, &pos) in nodes {
                let Some((cmp, swapped)) = self.nodes_modes[pos].comparison() else {
                    let first = (leaves.len() / 2) as u32;
                    for weight in weights.remove(&(*tree, *node)).unwrap_or_default() {
                        leaves.extend([0, weight.to_bits()]);
                    }
                    let end = (leaves.len() / 2) as u32;
                    rows.extend([first, end, 0, 0, 0]);
                    continue;
                };

                let feature = self.nodes_featureids[pos];
                if feature as usize >= self.n_features {
                    anyhow::bail!(
                        "Tree {} node {} splits on feature {} of {}",
                        tree,
                        node,
                        feature,
                        self.n_features
                    );
                }
                max_feature = max_feature.max(feature as usize);

                let child = |id: u32| -> Result<u32> {
                    if id <= *node {
                        anyhow::bail!("Tree {} node {} points back to node {}", tree, node, id);
                    }
                    row_of
                        .get(&id)
                        .copied()
                        .with_context(|| format!("Tree {} references missing node {}", tree, id))
                };
                let mut on_true = child(self.nodes_truenodeids[pos])?;
                let mut on_false = child(self.nodes_falsenodeids[pos])?;
                let mut nan_is_true = self
                    .nodes_missing_value_tracks_true
                    .get(pos)
                    .is_some_and(|flag| *flag != 0);
                if swapped {
                    std::mem::swap(&mut on_true, &mut on_false);
                    nan_is_true = !nan_is_true;
                }

                let flags = u32::from(cmp.to_u8()) | if nan_is_true { NAN_IS_TRUE } else { 0 };
                rows.extend([feature, on_true, on_false, self.nodes_values[pos].to_bits(), flags]);
            }
        }

        if let Some((tree, node)) = weights.keys().next() {
            anyhow::bail!(
                "Leaf weight attached to tree {} node {}, which is not a leaf",
                tree,
                node
            );
        }

        let n_nodes = rows.len() / 5;
        let n_leaves = leaves.len() / 2;
        let data = TreeEnsembleData {
            trees: tract_ndarray::Array1::from_vec(roots).into_arc_tensor(),
            nodes: tract_ndarray::Array2::from_shape_vec((n_nodes, 5), rows)?.into_arc_tensor(),
            leaves: tract_ndarray::Array2::from_shape_vec((n_leaves, 2), leaves)?
                .into_arc_tensor(),
        };
        Kernel::build(data, max_feature, 1, self.aggregate_function.into())
    }

    fn check_width(&self, features: &FeatureMatrix) -> Result<()> {
        if features.n_cols() != self.n_features {
            anyhow::bail!(
                "Estimator expects {} features, got {}",
                self.n_features,
                features.n_cols()
            );
        }
        Ok(())
    }

    /// Base value and post transform applied to one aggregated score
    fn finish(&self, aggregated: f32) -> f64 {
        let score = f64::from(aggregated) + self.base_values.first().copied().unwrap_or(0.0);
        match self.post_transform {
            PostTransform::None => score,
            PostTransform::Logistic => sigmoid(score),
        }
    }

    pub fn importances(&self) -> Vec<f64> {
        match &self.feature_importances {
            Some(stored) => stored.clone(),
            None => self.split_importances(),
        }
    }

    /// Share of branch nodes splitting on each feature
    fn split_importances(&self) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_features];
        for (mode, feature) in self.nodes_modes.iter().zip(&self.nodes_featureids) {
            if *mode == NodeMode::Leaf {
                continue;
            }
            if let Some(slot) = counts.get_mut(*feature as usize) {
                *slot += 1.0;
            }
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PipelineStep {
    Preprocessor(StandardScaler),
    Regressor(TreeEnsemble),
    Classifier(TreeEnsemble),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn preprocessor(&self) -> Option<&StandardScaler> {
        self.steps.iter().find_map(|step| match step {
            PipelineStep::Preprocessor(scaler) => Some(scaler),
            _ => None,
        })
    }

    /// The `regressor` or `classifier` step, if any
    pub fn estimator(&self) -> Option<&TreeEnsemble> {
        self.steps.iter().find_map(|step| match step {
            PipelineStep::Regressor(model) | PipelineStep::Classifier(model) => Some(model),
            _ => None,
        })
    }
}

/// On-disk tree artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeArtifact {
    Estimator(TreeEnsemble),
    Pipeline(Pipeline),
}

impl TreeArtifact {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tree artifact {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tree artifact {:?}", path))
    }

    pub fn estimator(&self) -> Option<&TreeEnsemble> {
        match self {
            TreeArtifact::Estimator(model) => Some(model),
            TreeArtifact::Pipeline(pipeline) => pipeline.estimator(),
        }
    }

    pub fn preprocessor(&self) -> Option<&StandardScaler> {
        match self {
            TreeArtifact::Estimator(_) => None,
            TreeArtifact::Pipeline(pipeline) => pipeline.preprocessor(),
        }
    }

    /// Columns the artifact expects: the preprocessor's inputs, else the
    /// estimator's fit-time names. Empty when neither is recorded.
    pub fn required_features(&self) -> Vec<String> {
        if let Some(pre) = self.preprocessor() {
            if !pre.feature_names_in.is_empty() {
                return pre.feature_names_in.clone();
            }
        }
        self.estimator()
            .map(|model| model.feature_names.clone())
            .unwrap_or_default()
    }
}

/// Invocable wrapper around a loaded tree artifact
#[derive(Debug)]
pub struct EnsemblePredictor {
    preprocessor: Option<StandardScaler>,
    estimator: TreeEnsemble,
    kernel: Kernel,
}

impl EnsemblePredictor {
    /// Compile the artifact's estimator; a pipeline without one is rejected
    pub fn new(artifact: TreeArtifact) -> Result<Self> {
        let preprocessor = artifact.preprocessor().cloned();
        let estimator = artifact
            .estimator()
            .cloned()
            .context("Pipeline has no final estimator")?;
        let kernel = estimator.compile().context("Invalid tree ensemble")?;
        Ok(Self {
            preprocessor,
            estimator,
            kernel,
        })
    }

    /// Finished ensemble score per row
    fn scores(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        let input = match &self.preprocessor {
            Some(pre) => pre.transform(features)?,
            None => features.clone(),
        };
        self.estimator.check_width(&input)?;

        let data: Vec<f32> = input.values().iter().map(|v| *v as f32).collect();
        let batch = tract_ndarray::Array2::from_shape_vec((input.n_rows(), input.n_cols()), data)?;
        let output = self.kernel.eval(batch.view().into_dyn())?;
        Ok(output.iter().map(|score| self.estimator.finish(*score)).collect())
    }

    /// Class-1 probability per row
    fn probabilities(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if self.estimator.objective != Objective::Binary {
            anyhow::bail!("Regression ensemble has no class probabilities");
        }
        Ok(self
            .scores(features)?
            .into_iter()
            .map(|p| p.clamp(0.0, 1.0))
            .collect())
    }
}

impl InvocablePredictor for EnsemblePredictor {
    fn family(&self) -> ModelFamily {
        ModelFamily::TreeEnsemble
    }

    fn infer(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        match self.estimator.objective {
            Objective::Regression => self.scores(features),
            Objective::Binary => Ok(self
                .classify(features)?
                .into_iter()
                .map(|outcome| f64::from(outcome.label))
                .collect()),
        }
    }

    fn classify(&self, features: &FeatureMatrix) -> Result<Vec<BinaryOutcome>> {
        Ok(self
            .probabilities(features)?
            .into_iter()
            .map(|p| BinaryOutcome {
                label: u8::from(p > DECISION_THRESHOLD),
                positive_probability: Some(p),
            })
            .collect())
    }

    fn feature_importances(&self) -> Option<RawImportances> {
        Some(RawImportances {
            scores: self.estimator.importances(),
            feature_names: self.preprocessor.as_ref().and_then(|p| p.feature_names_out()),
        })
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One tree per entry: a single split on `feature` at `threshold`
    /// with the given left and right leaf weights.
    fn stumps(
        objective: Objective,
        n_features: usize,
        splits: &[(u32, f32, f32, f32)],
    ) -> TreeEnsemble {
        let mut model = TreeEnsemble {
            objective,
            n_features,
            feature_names: vec![],
            feature_importances: None,
            aggregate_function: AggregateFunction::Sum,
            post_transform: PostTransform::None,
            base_values: vec![],
            nodes_treeids: vec![],
            nodes_nodeids: vec![],
            nodes_featureids: vec![],
            nodes_modes: vec![],
            nodes_values: vec![],
            nodes_truenodeids: vec![],
            nodes_falsenodeids: vec![],
            nodes_missing_value_tracks_true: vec![],
            target_treeids: vec![],
            target_nodeids: vec![],
            target_ids: vec![],
            target_weights: vec![],
        };
        for (tree, (feature, threshold, left, right)) in splits.iter().enumerate() {
            let tree = tree as u32;
            model.nodes_treeids.extend([tree; 3]);
            model.nodes_nodeids.extend([0, 1, 2]);
            model.nodes_featureids.extend([*feature, 0, 0]);
            model.nodes_modes.extend([NodeMode::BranchLeq, NodeMode::Leaf, NodeMode::Leaf]);
            model.nodes_values.extend([*threshold, 0.0, 0.0]);
            model.nodes_truenodeids.extend([1, 0, 0]);
            model.nodes_falsenodeids.extend([2, 0, 0]);
            model.target_treeids.extend([tree; 2]);
            model.target_nodeids.extend([1, 2]);
            model.target_weights.extend([*left, *right]);
        }
        model
    }

    fn regressor(aggregate_function: AggregateFunction) -> TreeEnsemble {
        let mut model = stumps(
            Objective::Regression,
            2,
            &[(0, 5.0, 10.0, 20.0), (1, 600.0, 2.0, 4.0)],
        );
        model.feature_names = vec!["trip_miles".into(), "trip_time".into()];
        model.aggregate_function = aggregate_function;
        model
    }

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let width = rows[0].len();
        FeatureMatrix::from_rows((0..width).map(|i| format!("f{}", i)).collect(), rows).unwrap()
    }

    fn predictor(model: TreeEnsemble) -> EnsemblePredictor {
        EnsemblePredictor::new(TreeArtifact::Estimator(model)).unwrap()
    }

    #[test]
    fn test_average_aggregate_means_trees() {
        let model = predictor(regressor(AggregateFunction::Average));
        let out = model.infer(&matrix(vec![vec![3.0, 900.0], vec![8.0, 100.0]])).unwrap();
        assert_eq!(out, vec![(10.0 + 4.0) / 2.0, (20.0 + 2.0) / 2.0]);
    }

    #[test]
    fn test_sum_aggregate_adds_base_value() {
        let mut model = regressor(AggregateFunction::Sum);
        model.base_values = vec![1.0];
        let out = predictor(model).infer(&matrix(vec![vec![5.0, 600.0]])).unwrap();
        // equality goes left on both splits
        assert_eq!(out, vec![1.0 + 10.0 + 2.0]);
    }

    #[test]
    fn test_greater_or_equal_branch_runs_swapped() {
        let mut model = stumps(Objective::Regression, 1, &[(0, 5.0, 10.0, 20.0)]);
        model.nodes_modes[0] = NodeMode::BranchGte;
        let out = predictor(model).infer(&matrix(vec![vec![5.0], vec![4.0]])).unwrap();
        assert_eq!(out, vec![10.0, 20.0]);
    }

    #[test]
    fn test_missing_value_follows_tracking_flag() {
        let mut model = stumps(Objective::Regression, 1, &[(0, 5.0, 10.0, 20.0)]);
        let plain = predictor(model.clone());
        assert_eq!(plain.infer(&matrix(vec![vec![f64::NAN]])).unwrap(), vec![20.0]);

        model.nodes_missing_value_tracks_true = vec![1, 0, 0];
        let tracked = predictor(model);
        assert_eq!(tracked.infer(&matrix(vec![vec![f64::NAN]])).unwrap(), vec![10.0]);
    }

    #[test]
    fn test_width_mismatch_is_an_error() {
        let model = predictor(regressor(AggregateFunction::Average));
        assert!(model.infer(&matrix(vec![vec![1.0]])).is_err());
    }

    #[test]
    fn test_backward_child_is_rejected() {
        let mut model = stumps(Objective::Regression, 1, &[(0, 0.0, 1.0, 2.0)]);
        model.nodes_truenodeids[0] = 0;
        let err = EnsemblePredictor::new(TreeArtifact::Estimator(model)).unwrap_err();
        assert!(format!("{:#}", err).contains("points back"));
    }

    #[test]
    fn test_out_of_range_feature_is_rejected() {
        let model = stumps(Objective::Regression, 1, &[(3, 0.0, 1.0, 2.0)]);
        assert!(model.compile().is_err());
    }

    #[test]
    fn test_weight_on_branch_is_rejected() {
        let mut model = stumps(Objective::Regression, 1, &[(0, 0.0, 1.0, 2.0)]);
        model.target_nodeids[0] = 0;
        assert!(model.compile().is_err());
    }

    #[test]
    fn test_ragged_node_lists_are_rejected() {
        let mut model = stumps(Objective::Regression, 1, &[(0, 0.0, 1.0, 2.0)]);
        model.nodes_values.pop();
        assert!(model.compile().is_err());
    }

    #[test]
    fn test_logistic_post_transform_gives_probabilities() {
        let mut model = stumps(Objective::Binary, 1, &[(0, 0.5, -2.0, 2.0)]);
        model.post_transform = PostTransform::Logistic;
        let model = predictor(model);

        let x = matrix(vec![vec![0.0], vec![1.0]]);
        let outcomes = model.classify(&x).unwrap();
        assert_eq!(outcomes[0].label, 0);
        assert_eq!(outcomes[1].label, 1);
        assert!((outcomes[0].positive_probability.unwrap() - sigmoid(-2.0)).abs() < 1e-12);
        assert!((outcomes[1].positive_probability.unwrap() - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(model.infer(&x).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_averaged_probability_of_one_half_is_class_zero() {
        let mut model = stumps(Objective::Binary, 1, &[(0, 0.5, 0.0, 1.0), (0, 0.5, 1.0, 0.0)]);
        model.aggregate_function = AggregateFunction::Average;
        let outcomes = predictor(model).classify(&matrix(vec![vec![0.0]])).unwrap();
        assert_eq!(outcomes[0].label, 0);
        assert_eq!(outcomes[0].positive_probability, Some(0.5));
    }

    #[test]
    fn test_regression_has_no_probabilities() {
        let model = predictor(regressor(AggregateFunction::Average));
        assert!(model.classify(&matrix(vec![vec![1.0, 2.0]])).is_err());
    }

    #[test]
    fn test_split_importances_are_normalized() {
        let mut model = regressor(AggregateFunction::Sum);
        model.nodes_featureids[3] = 0;
        assert_eq!(model.importances(), vec![1.0, 0.0]);
        assert_eq!(regressor(AggregateFunction::Sum).importances(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_stored_importances_win() {
        let mut model = regressor(AggregateFunction::Sum);
        model.feature_importances = Some(vec![0.1, 0.9]);
        assert_eq!(model.importances(), vec![0.1, 0.9]);
    }

    #[test]
    fn test_pipeline_schema_prefers_preprocessor_inputs() {
        let pipeline = TreeArtifact::Pipeline(Pipeline {
            steps: vec![
                PipelineStep::Preprocessor(StandardScaler {
                    mean: vec![0.0, 0.0],
                    scale: vec![1.0, 1.0],
                    feature_names_in: vec!["distance".into(), "duration".into()],
                    feature_names_out: None,
                }),
                PipelineStep::Regressor(regressor(AggregateFunction::Average)),
            ],
        });
        assert_eq!(pipeline.required_features(), vec!["distance", "duration"]);

        let bare = TreeArtifact::Estimator(regressor(AggregateFunction::Average));
        assert_eq!(bare.required_features(), vec!["trip_miles", "trip_time"]);
    }

    #[test]
    fn test_pipeline_applies_preprocessor_before_estimator() {
        let pipeline = TreeArtifact::Pipeline(Pipeline {
            steps: vec![
                PipelineStep::Preprocessor(StandardScaler {
                    mean: vec![10.0, 0.0],
                    scale: vec![1.0, 1.0],
                    feature_names_in: vec![],
                    feature_names_out: None,
                }),
                PipelineStep::Regressor(regressor(AggregateFunction::Average)),
            ],
        });
        let predictor = EnsemblePredictor::new(pipeline).unwrap();
        // 12 - 10 = 2 <= 5 goes left on the first tree
        let out = predictor.infer(&matrix(vec![vec![12.0, 900.0]])).unwrap();
        assert_eq!(out, vec![(10.0 + 4.0) / 2.0]);
    }

    #[test]
    fn test_pipeline_without_estimator_fails_to_load() {
        let pipeline = TreeArtifact::Pipeline(Pipeline { steps: vec![] });
        assert!(EnsemblePredictor::new(pipeline).is_err());
    }

    #[test]
    fn test_artifact_json_layout() {
        let json = r#"{
            "kind": "pipeline",
            "steps": [
                {"step": "preprocessor", "mean": [0.0], "scale": [1.0],
                 "feature_names_in": ["trip_miles"], "feature_names_out": ["num__trip_miles"]},
                {"step": "classifier", "objective": "binary", "n_features": 1,
                 "aggregate_function": "AVERAGE",
                 "nodes_treeids": [0, 0, 0], "nodes_nodeids": [0, 1, 2],
                 "nodes_featureids": [0, 0, 0], "nodes_values": [10.0, 0.0, 0.0],
                 "nodes_modes": ["BRANCH_LEQ", "LEAF", "LEAF"],
                 "nodes_truenodeids": [1, 0, 0], "nodes_falsenodeids": [2, 0, 0],
                 "target_treeids": [0, 0], "target_nodeids": [1, 2],
                 "target_ids": [0, 0], "target_weights": [0.25, 0.75]}
            ]
        }"#;
        let artifact: TreeArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.required_features(), vec!["trip_miles"]);

        let predictor = EnsemblePredictor::new(artifact).unwrap();
        let outcomes = predictor.classify(&matrix(vec![vec![15.0]])).unwrap();
        assert_eq!(outcomes[0].label, 1);
        assert_eq!(outcomes[0].positive_probability, Some(0.75));

        let raw = predictor.feature_importances().unwrap();
        assert_eq!(raw.feature_names, Some(vec!["num__trip_miles".to_string()]));
        assert_eq!(raw.scores, vec![1.0]);
    }
}
