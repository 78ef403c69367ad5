//! Module defining the core `Module` trait for all TNT building blocks.

/// Shape of a parameter tensor.
pub type Shape = Vec<usize>;

/// How a freshly constructed parameter is filled before a checkpoint is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Uniform in `[-bound, bound)`.
    Uniform(f32),
    Ones,
    Zeros,
}

/// A registered parameter: full dotted name, shape and initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub shape: Shape,
    pub init: Init,
}

impl ParameterSpec {
    pub fn new(name: String, shape: Shape, init: Init) -> Self {
        Self { name, shape, init }
    }

    /// Number of elements in a tensor of this shape.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Trait defining the common interface for all layers/modules.
///
/// Layers here only describe their parameters; the forward computation lives in
/// the inference engine that consumes the exported weight file. Registration
/// order is significant and mirrors the order in which the training framework
/// declares submodules, since the weight file is consumed positionally.
pub trait Module {
    /// Appends this module's parameters to `specs`, each name prefixed with `prefix`.
    fn register(&self, prefix: &str, specs: &mut Vec<ParameterSpec>);

    /// Collects the parameters of this module under `prefix`.
    fn parameter_specs(&self, prefix: &str) -> Vec<ParameterSpec> {
        let mut specs = Vec::new();
        self.register(prefix, &mut specs);
        specs
    }
}

/// Joins a parent prefix and a child name with a dot.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}
