//! Polyline subgraph encoder.
//!
//! Each layer is an [`Mlp`] whose output is concatenated with its max-pooled
//! aggregate, so every layer after the first sees `2 * hidden` input channels.
//! A final linear projection maps the last concatenation back to `hidden`.

use crate::nn::module::{join, Module, ParameterSpec};
use crate::nn::{Linear, Mlp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubGraph {
    pub in_channels: usize,
    pub num_layers: usize,
    pub hidden: usize,
}

impl SubGraph {
    pub fn new(in_channels: usize, num_layers: usize, hidden: usize) -> Self {
        Self {
            in_channels,
            num_layers,
            hidden,
        }
    }

    /// Width of the polyline feature this encoder produces.
    pub fn out_channels(&self) -> usize {
        self.hidden
    }
}

impl Module for SubGraph {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        let layer_seq = join(prefix, "layer_seq");
        let mut in_channels = self.in_channels;
        for i in 0..self.num_layers {
            Mlp::new(in_channels, self.hidden, self.hidden)
                .register(&join(&layer_seq, &format!("glp_{}", i)), specs);
            in_channels = self.hidden * 2;
        }
        Linear::new(self.hidden * 2, self.hidden).register(&join(prefix, "linear"), specs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subgraph_layers() {
        let specs = SubGraph::new(6, 3, 64).parameter_specs("subgraph");

        // first layer projects 6 -> 64 (shortcut), later ones 128 -> 64 (shortcut)
        assert_eq!(specs.len(), 12 * 3 + 2);
        assert_eq!(specs[0].name, "subgraph.layer_seq.glp_0.linear1.weight");
        assert_eq!(specs[0].shape, vec![64, 6]);
        assert_eq!(specs[12].name, "subgraph.layer_seq.glp_1.linear1.weight");
        assert_eq!(specs[12].shape, vec![64, 128]);

        let last = &specs[specs.len() - 2];
        assert_eq!(last.name, "subgraph.linear.weight");
        assert_eq!(last.shape, vec![64, 128]);
    }
}
