//! # Neural Network Layers Module
//!
//! Building blocks of the TNT model, described by the parameters they own.
//!
//! Each layer knows the dotted names, shapes and initializers of its learnable
//! tensors and registers them in the same order as the training framework, so a
//! composed model yields a parameter list that matches a training checkpoint
//! name-for-name once the checkpoint has been remapped.
//!
//! ## Available Layers
//!
//! ### Core Layers
//! - [`Linear`]: Fully connected layer
//! - [`LayerNorm`]: Layer normalization
//! - [`Mlp`]: Residual two-layer perceptron
//!
//! ### TNT Components
//! - [`SubGraph`]: Polyline subgraph encoder
//! - [`GlobalGraph`]: Self-attention interaction graph
//! - [`TargetPred`], [`MotionEstimation`], [`TrajScoreSelection`]: Prediction heads
//! - [`AuxMlp`]: Training-only auxiliary head
//!
//! ## Example
//!
//! ```
//! use tnt_export::nn::{Linear, Module};
//!
//! let specs = Linear::new(64, 2).parameter_specs("head");
//! assert_eq!(specs[0].name, "head.weight");
//! assert_eq!(specs[0].shape, vec![2, 64]);
//! ```

pub mod global_graph;
pub mod heads;
pub mod linear;
pub mod mlp;
pub mod module;
pub mod norm;
pub mod subgraph;

pub use global_graph::{GlobalGraph, SelfAttentionFcLayer};
pub use heads::{AuxMlp, MotionEstimation, TargetPred, TrajScoreSelection};
pub use linear::Linear;
pub use mlp::Mlp;
pub use norm::LayerNorm;
pub use subgraph::SubGraph;

// Base trait
pub use module::{Init, Module, ParameterSpec, Shape};
