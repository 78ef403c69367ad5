//! The TNT export model: the target of checkpoint loading and the source of
//! the exported weight file.
//!
//! [`TntModel`] owns its parameters as an explicit [`ParameterSet`] whose order
//! is fixed when the submodules register themselves. Loading is strict: every
//! registered name must be supplied with the registered shape and nothing else
//! may be supplied.

pub mod config;

pub use config::TntConfig;

use crate::nn::{
    AuxMlp, GlobalGraph, Init, Module, MotionEstimation, ParameterSpec, SubGraph, TargetPred,
    TrajScoreSelection,
};
use crate::params::ParameterSet;
use ndarray::{ArrayD, IxDyn};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Seed used by the export script when none is given.
pub const DEFAULT_SEED: u64 = 0;

/// Width of the agent id embedding concatenated to every polyline feature.
const ID_EMBEDDING_WIDTH: usize = 2;

/// Errors raised while building or loading the model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("state dict does not match the model: {0}")]
    NameMismatch(MismatchReport),

    #[error("invalid model config: {0}")]
    Config(String),

    #[error("failed to read model config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model config {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// A tensor whose shape differs from the registered one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub name: String,
    pub expected: Vec<usize>,
    pub actual: Vec<usize>,
}

/// Every difference between a supplied state dict and the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MismatchReport {
    /// Registered names absent from the state dict, in registration order.
    pub missing: Vec<String>,
    /// Supplied names the model does not register, in supplied order.
    pub unexpected: Vec<String>,
    pub shape_mismatches: Vec<ShapeMismatch>,
}

impl MismatchReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.shape_mismatches.is_empty()
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing key(s): {}", self.missing.join(", ")));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected key(s): {}", self.unexpected.join(", ")));
        }
        for m in &self.shape_mismatches {
            parts.push(format!(
                "size mismatch for {}: expected {:?}, got {:?}",
                m.name, m.expected, m.actual
            ));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// TNT with the components needed at inference time.
#[derive(Debug, Clone)]
pub struct TntModel {
    config: TntConfig,
    subgraph: SubGraph,
    global_graph: GlobalGraph,
    target_pred_layer: TargetPred,
    motion_estimator: MotionEstimation,
    traj_score_layer: TrajScoreSelection,
    specs: Vec<ParameterSpec>,
    state: ParameterSet,
}

impl TntModel {
    /// Builds the model and initializes its parameters with [`DEFAULT_SEED`].
    pub fn new(config: TntConfig) -> Result<Self> {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// Builds the model and initializes its parameters from `seed`.
    pub fn with_seed(config: TntConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let subgraph = SubGraph::new(
            config.in_channels,
            config.num_subgraph_layers,
            config.subgraph_width,
        );
        let global_graph = GlobalGraph::new(
            subgraph.out_channels() + ID_EMBEDDING_WIDTH,
            config.global_graph_width,
            config.num_global_graph_layer,
        );
        let target_pred_layer =
            TargetPred::new(config.global_graph_width, config.target_pred_hid, config.m);
        let motion_estimator =
            MotionEstimation::new(config.global_graph_width, config.horizon, config.motion_esti_hid);
        let traj_score_layer =
            TrajScoreSelection::new(config.global_graph_width, config.horizon, config.score_sel_hid);

        let mut model = Self {
            config,
            subgraph,
            global_graph,
            target_pred_layer,
            motion_estimator,
            traj_score_layer,
            specs: Vec::new(),
            state: ParameterSet::new(),
        };
        model.specs = model.parameter_specs("");
        model.state = initialize(&model.specs, seed);
        Ok(model)
    }

    pub fn config(&self) -> &TntConfig {
        &self.config
    }

    /// Registered parameters in registration order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Current parameter values in registration order.
    pub fn parameters(&self) -> &ParameterSet {
        &self.state
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.specs.iter().map(ParameterSpec::numel).sum()
    }

    /// Replaces every parameter with the values in `state_dict`.
    ///
    /// The names and shapes must match the registered parameters exactly. On
    /// failure the model is left untouched and the error lists every problem.
    pub fn load(&mut self, state_dict: ParameterSet) -> Result<()> {
        let mut report = MismatchReport::default();
        for spec in &self.specs {
            match state_dict.get(&spec.name) {
                None => report.missing.push(spec.name.clone()),
                Some(tensor) if tensor.shape() != spec.shape.as_slice() => {
                    report.shape_mismatches.push(ShapeMismatch {
                        name: spec.name.clone(),
                        expected: spec.shape.clone(),
                        actual: tensor.shape().to_vec(),
                    })
                }
                Some(_) => {}
            }
        }
        report.unexpected = state_dict
            .names()
            .filter(|name| !self.state.contains(name))
            .map(str::to_string)
            .collect();

        if !report.is_empty() {
            return Err(ModelError::NameMismatch(report));
        }

        let mut by_name: HashMap<String, ArrayD<f32>> = state_dict.into_iter().collect();
        let mut state = ParameterSet::with_capacity(self.specs.len());
        for spec in &self.specs {
            if let Some(tensor) = by_name.remove(&spec.name) {
                state.insert(spec.name.clone(), tensor);
            }
        }
        debug!(tensors = state.len(), "state dict loaded");
        self.state = state;
        Ok(())
    }
}

impl Module for TntModel {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        use crate::nn::module::join;

        self.subgraph.register(&join(prefix, "subgraph"), specs);
        self.global_graph.register(&join(prefix, "global_graph"), specs);
        self.target_pred_layer.register(&join(prefix, "target_pred_layer"), specs);
        self.motion_estimator.register(&join(prefix, "motion_estimator"), specs);
        self.traj_score_layer.register(&join(prefix, "traj_score_layer"), specs);
    }
}

/// Parameter names and shapes as the training wrapper writes them.
///
/// The feature extractor (and, with `with_aux`, the auxiliary head) sits under
/// `backbone.`; the prediction heads are registered at the top level.
pub fn training_parameter_specs(config: &TntConfig, with_aux: bool) -> Result<Vec<ParameterSpec>> {
    let model = TntModel::with_seed(config.clone(), DEFAULT_SEED)?;
    let mut specs = Vec::new();

    model.subgraph.register("backbone.subgraph", &mut specs);
    model.global_graph.register("backbone.global_graph", &mut specs);
    if with_aux {
        AuxMlp::new(config.global_graph_width, config.subgraph_width, config.aux_width)
            .register("backbone.aux_mlp", &mut specs);
    }
    model.target_pred_layer.register("target_pred_layer", &mut specs);
    model.motion_estimator.register("motion_estimator", &mut specs);
    model.traj_score_layer.register("traj_score_layer", &mut specs);
    Ok(specs)
}

/// Fills a fresh tensor for every spec from a single seeded generator.
pub fn initialize(specs: &[ParameterSpec], seed: u64) -> ParameterSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = ParameterSet::with_capacity(specs.len());
    for spec in specs {
        let shape = IxDyn(&spec.shape);
        let tensor = match spec.init {
            Init::Uniform(bound) => ArrayD::random_using(shape, Uniform::new(-bound, bound), &mut rng),
            Init::Ones => ArrayD::ones(shape),
            Init::Zeros => ArrayD::zeros(shape),
        };
        state.insert(spec.name.clone(), tensor);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CheckpointRemapper;

    fn training_state(config: &TntConfig, with_aux: bool, seed: u64) -> ParameterSet {
        initialize(&training_parameter_specs(config, with_aux).unwrap(), seed)
    }

    #[test]
    fn test_registration_order() {
        let model = TntModel::new(TntConfig::default()).unwrap();
        let names: Vec<&str> = model.parameters().names().collect();

        assert_eq!(names[0], "subgraph.layer_seq.glp_0.linear1.weight");
        let first_global = names.iter().position(|n| n.starts_with("global_graph.")).unwrap();
        let first_target = names.iter().position(|n| n.starts_with("target_pred_layer.")).unwrap();
        let first_motion = names.iter().position(|n| n.starts_with("motion_estimator.")).unwrap();
        let first_score = names.iter().position(|n| n.starts_with("traj_score_layer.")).unwrap();
        assert!(first_global < first_target);
        assert!(first_target < first_motion);
        assert!(first_motion < first_score);
        assert_eq!(*names.last().unwrap(), "traj_score_layer.score_mlp.1.bias");
    }

    #[test]
    fn test_global_graph_sees_id_embedding() {
        let model = TntModel::new(TntConfig::default()).unwrap();
        let q = model.parameters().get("global_graph.layers.glp_0.q_lin.weight").unwrap();
        assert_eq!(q.shape(), &[64, 66]);
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = TntModel::with_seed(TntConfig::default(), 7).unwrap();
        let b = TntModel::with_seed(TntConfig::default(), 7).unwrap();
        let c = TntModel::with_seed(TntConfig::default(), 8).unwrap();
        assert_eq!(a.parameters(), b.parameters());
        assert_ne!(a.parameters(), c.parameters());
    }

    #[test]
    fn test_layer_norm_init() {
        let model = TntModel::new(TntConfig::default()).unwrap();
        let gamma = model.parameters().get("subgraph.layer_seq.glp_0.norm1.weight").unwrap();
        let beta = model.parameters().get("subgraph.layer_seq.glp_0.norm1.bias").unwrap();
        assert!(gamma.iter().all(|&v| v == 1.0));
        assert!(beta.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_load_remapped_training_checkpoint() {
        let config = TntConfig::default();
        let checkpoint = training_state(&config, true, 42);
        let expected_q = checkpoint
            .get("backbone.global_graph.layers.glp_0.q_lin.weight")
            .cloned()
            .unwrap();

        let remapped = CheckpointRemapper::default().remap(checkpoint);
        let mut model = TntModel::new(config).unwrap();
        model.load(remapped).unwrap();

        assert_eq!(
            model.parameters().get("global_graph.layers.glp_0.q_lin.weight"),
            Some(&expected_q)
        );
        assert_eq!(model.parameters().len(), model.specs().len());
    }

    #[test]
    fn test_load_restores_registration_order() {
        let mut model = TntModel::new(TntConfig::default()).unwrap();
        let expected: Vec<String> = model.parameters().names().map(String::from).collect();

        let reversed: ParameterSet = model
            .parameters()
            .clone()
            .into_iter()
            .rev()
            .collect();
        model.load(reversed).unwrap();

        let names: Vec<String> = model.parameters().names().map(String::from).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_load_reports_every_mismatch() {
        let config = TntConfig::default();
        let mut model = TntModel::new(config.clone()).unwrap();
        let before = model.parameters().clone();

        // Not remapped: every backbone name is unexpected and missing.
        let mut state = training_state(&config, true, 1);
        state.insert(
            "traj_score_layer.score_mlp.1.bias",
            ArrayD::zeros(IxDyn(&[3])),
        );

        let err = model.load(state).unwrap_err();
        match err {
            ModelError::NameMismatch(report) => {
                assert!(report.missing.contains(&"subgraph.linear.weight".to_string()));
                assert!(report
                    .unexpected
                    .contains(&"backbone.aux_mlp.0.linear1.weight".to_string()));
                assert_eq!(report.shape_mismatches.len(), 1);
                assert_eq!(report.shape_mismatches[0].expected, vec![1]);
                assert_eq!(report.shape_mismatches[0].actual, vec![3]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(model.parameters(), &before);
    }

    #[test]
    fn test_mismatch_message_names_keys() {
        let mut model = TntModel::new(TntConfig::default()).unwrap();
        let mut state = model.parameters().clone();
        state.insert("extra.weight", ArrayD::zeros(IxDyn(&[1])));

        let message = model.load(state).unwrap_err().to_string();
        assert!(message.contains("unexpected key(s): extra.weight"));
    }

    #[test]
    fn test_training_specs_without_aux() {
        let config = TntConfig::default();
        let with_aux = training_parameter_specs(&config, true).unwrap();
        let without_aux = training_parameter_specs(&config, false).unwrap();
        assert!(with_aux.iter().any(|s| s.name.starts_with("backbone.aux_mlp.")));
        assert!(without_aux.iter().all(|s| !s.name.contains("aux_mlp")));
        assert_eq!(without_aux.len(), TntModel::new(config).unwrap().specs().len());
    }

    #[test]
    fn test_num_parameters_matches_state() {
        let model = TntModel::new(TntConfig::default().with_in_channels(10)).unwrap();
        assert_eq!(model.num_parameters(), model.parameters().total_elements());
    }
}
