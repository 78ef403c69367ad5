//! Global interaction graph: stacked single-head self-attention over polylines.

use crate::nn::module::{join, Module, ParameterSpec};
use crate::nn::Linear;

/// One self-attention layer with query/key/value projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfAttentionFcLayer {
    pub in_channels: usize,
    pub graph_width: usize,
}

impl SelfAttentionFcLayer {
    pub fn new(in_channels: usize, graph_width: usize) -> Self {
        Self {
            in_channels,
            graph_width,
        }
    }
}

impl Module for SelfAttentionFcLayer {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        for proj in ["q_lin", "k_lin", "v_lin"] {
            Linear::new(self.in_channels, self.graph_width).register(&join(prefix, proj), specs);
        }
    }
}

/// Attention layers registered as `layers.glp_{i}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalGraph {
    pub in_channels: usize,
    pub graph_width: usize,
    pub num_layers: usize,
}

impl GlobalGraph {
    pub fn new(in_channels: usize, graph_width: usize, num_layers: usize) -> Self {
        Self {
            in_channels,
            graph_width,
            num_layers,
        }
    }
}

impl Module for GlobalGraph {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        let layers = join(prefix, "layers");
        let mut in_channels = self.in_channels;
        for i in 0..self.num_layers {
            SelfAttentionFcLayer::new(in_channels, self.graph_width)
                .register(&join(&layers, &format!("glp_{}", i)), specs);
            in_channels = self.graph_width;
        }
    }
}
