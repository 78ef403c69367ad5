use crate::nn::module::{join, Init, Module, ParameterSpec};

/// Layer normalization over the last dimension with learnable affine terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerNorm {
    pub dim: usize,
}

impl LayerNorm {
    pub fn new(dim: usize) -> Self {
        LayerNorm { dim }
    }
}

impl Module for LayerNorm {
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>) {
        specs.push(ParameterSpec::new(join(prefix, "weight"), vec![self.dim], Init::Ones));
        specs.push(ParameterSpec::new(join(prefix, "bias"), vec![self.dim], Init::Zeros));
    }
}
