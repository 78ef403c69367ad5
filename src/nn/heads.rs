//! Prediction heads of TNT.
//!
//! Every head is an [`Mlp`] followed by a plain [`Linear`] output layer,
//! registered as the `0` and `1` children of a sequential container.

use crate::nn::module::{join, Module, ParameterSpec};
use crate::nn::{Linear, Mlp};

/// Registers `Mlp(in, hidden, hidden)` then `Linear(hidden, out)` under `prefix`.
fn register_mlp_head(
    prefix: &str,
    in_channels: usize,
    hidden: usize,
    out_channels: usize,
    specs: &mut Vec<ParameterSpec>,
) {
    Mlp::new(in_channels, hidden, hidden).register(&join(prefix, "0"), specs);
    Linear::new(hidden, out_channels).register(&join(prefix, "1"), specs);
}

/// Target candidate scoring (`prob_mlp`) and offset regression (`mean_mlp`).
///
/// Both take the target feature concatenated with a 2-D candidate location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPred {
    pub in_channels: usize,
    pub hidden: usize,
    pub m: usize,
}

impl TargetPred {
    pub fn new(in_channels: usize, hidden: usize, m: usize) -> Self {
        Self { in_channels, hidden, m }
    }
}

impl Module for TargetPred {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        register_mlp_head(&join(prefix, "prob_mlp"), self.in_channels + 2, self.hidden, 1, specs);
        register_mlp_head(&join(prefix, "mean_mlp"), self.in_channels + 2, self.hidden, 2, specs);
    }
}

/// Regresses a `horizon`-step trajectory towards a selected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEstimation {
    pub in_channels: usize,
    pub horizon: usize,
    pub hidden: usize,
}

impl MotionEstimation {
    pub fn new(in_channels: usize, horizon: usize, hidden: usize) -> Self {
        Self {
            in_channels,
            horizon,
            hidden,
        }
    }
}

impl Module for MotionEstimation {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        register_mlp_head(
            &join(prefix, "traj_pred"),
            self.in_channels + 2,
            self.hidden,
            self.horizon * 2,
            specs,
        );
    }
}

/// Scores candidate trajectories given the target feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajScoreSelection {
    pub feat_channels: usize,
    pub horizon: usize,
    pub hidden: usize,
}

impl TrajScoreSelection {
    pub fn new(feat_channels: usize, horizon: usize, hidden: usize) -> Self {
        Self {
            feat_channels,
            horizon,
            hidden,
        }
    }
}

impl Module for TrajScoreSelection {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        register_mlp_head(
            &join(prefix, "score_mlp"),
            self.feat_channels + self.horizon * 2,
            self.hidden,
            1,
            specs,
        );
    }
}

/// Training-only node-feature recovery head. Never part of the export model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxMlp {
    pub in_channels: usize,
    pub out_channels: usize,
    pub hidden: usize,
}

impl AuxMlp {
    pub fn new(in_channels: usize, out_channels: usize, hidden: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            hidden,
        }
    }
}

impl Module for AuxMlp {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        Mlp::new(self.in_channels, self.out_channels, self.hidden).register(&join(prefix, "0"), specs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_pred_heads() {
        let specs = TargetPred::new(64, 64, 50).parameter_specs("target_pred_layer");

        // Mlp(66 -> 64) has a shortcut: 12 tensors, plus the output linear
        assert_eq!(specs.len(), 2 * (12 + 2));
        assert_eq!(specs[0].name, "target_pred_layer.prob_mlp.0.linear1.weight");
        assert_eq!(specs[0].shape, vec![64, 66]);
        assert_eq!(specs[12].name, "target_pred_layer.prob_mlp.1.weight");
        assert_eq!(specs[12].shape, vec![1, 64]);
        assert_eq!(specs[26].name, "target_pred_layer.mean_mlp.1.weight");
        assert_eq!(specs[26].shape, vec![2, 64]);
    }

    #[test]
    fn test_motion_estimation_output_width() {
        let specs = MotionEstimation::new(64, 30, 64).parameter_specs("motion_estimator");
        let out = specs
            .iter()
            .find(|s| s.name == "motion_estimator.traj_pred.1.weight")
            .unwrap();
        assert_eq!(out.shape, vec![60, 64]);
    }

    #[test]
    fn test_score_head_input_width() {
        let specs = TrajScoreSelection::new(64, 30, 64).parameter_specs("traj_score_layer");
        assert_eq!(specs[0].name, "traj_score_layer.score_mlp.0.linear1.weight");
        assert_eq!(specs[0].shape, vec![64, 124]);
    }
}
