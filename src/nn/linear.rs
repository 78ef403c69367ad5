//! Fully connected (linear) layer.

use crate::nn::module::{join, Init, Module, ParameterSpec};

/// Fully connected layer `y = x Wᵀ + b`.
///
/// The weight is stored `[out_features, in_features]`, the layout the training
/// framework writes to its checkpoints and the inference engine reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
    pub bias: bool,
}

impl Linear {
    /// Creates a new linear layer with bias.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
            bias: true,
        }
    }

    /// Initialization bound `1 / sqrt(in_features)` used for weight and bias.
    fn bound(&self) -> f32 {
        1.0 / (self.in_features.max(1) as f32).sqrt()
    }
}

impl Module for Linear {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        let init = Init::Uniform(self.bound());
        specs.push(ParameterSpec::new(
            join(prefix, "weight"),
            vec![self.out_features, self.in_features],
            init,
        ));
        if self.bias {
            specs.push(ParameterSpec::new(
                join(prefix, "bias"),
                vec![self.out_features],
                init,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_names_and_shapes() {
        let specs = Linear::new(8, 3).parameter_specs("fc");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "fc.weight");
        assert_eq!(specs[0].shape, vec![3, 8]);
        assert_eq!(specs[1].name, "fc.bias");
        assert_eq!(specs[1].shape, vec![3]);
    }

    #[test]
    fn test_linear_bound() {
        let specs = Linear::new(16, 2).parameter_specs("");
        assert_eq!(specs[0].name, "weight");
        assert_eq!(specs[0].init, Init::Uniform(0.25));
    }
}
