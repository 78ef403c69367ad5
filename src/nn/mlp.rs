//! Residual two-layer perceptron, the basic block of every TNT component.

use crate::nn::module::{join, Module, ParameterSpec};
use crate::nn::{LayerNorm, Linear};

/// `linear1 → norm1 → relu → linear2 → norm2 (+ shortcut) → relu`.
///
/// When the input and output widths differ, the residual path is projected by
/// `shortcut`, a `Linear` followed by a `LayerNorm` registered as `shortcut.0`
/// and `shortcut.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mlp {
    pub in_channels: usize,
    pub out_channels: usize,
    pub hidden: usize,
}

impl Mlp {
    pub fn new(in_channels: usize, out_channels: usize, hidden: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            hidden,
        }
    }

    pub fn has_shortcut(&self) -> bool {
        self.in_channels != self.out_channels
    }
}

impl Module for Mlp {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        Linear::new(self.in_channels, self.hidden).register(&join(prefix, "linear1"), specs);
        Linear::new(self.hidden, self.out_channels).register(&join(prefix, "linear2"), specs);
        LayerNorm::new(self.hidden).register(&join(prefix, "norm1"), specs);
        LayerNorm::new(self.out_channels).register(&join(prefix, "norm2"), specs);
        if self.has_shortcut() {
            let shortcut = join(prefix, "shortcut");
            Linear::new(self.in_channels, self.out_channels).register(&join(&shortcut, "0"), specs);
            LayerNorm::new(self.out_channels).register(&join(&shortcut, "1"), specs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(specs: &[ParameterSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_mlp_without_shortcut() {
        let specs = Mlp::new(64, 64, 64).parameter_specs("mlp");
        assert_eq!(
            names(&specs),
            vec![
                "mlp.linear1.weight",
                "mlp.linear1.bias",
                "mlp.linear2.weight",
                "mlp.linear2.bias",
                "mlp.norm1.weight",
                "mlp.norm1.bias",
                "mlp.norm2.weight",
                "mlp.norm2.bias",
            ]
        );
    }

    #[test]
    fn test_mlp_with_shortcut() {
        let mlp = Mlp::new(6, 64, 32);
        let specs = mlp.parameter_specs("glp_0");
        assert_eq!(specs.len(), 12);
        assert_eq!(specs[0].shape, vec![32, 6]);
        assert_eq!(specs[2].shape, vec![64, 32]);
        assert_eq!(specs[8].name, "glp_0.shortcut.0.weight");
        assert_eq!(specs[8].shape, vec![64, 6]);
        assert_eq!(specs[11].name, "glp_0.shortcut.1.bias");
    }
}
