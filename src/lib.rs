//! # tnt-export: TNT weight export for TensorRT
//!
//! Turns a checkpoint of the TNT (Target-driven Trajectory Prediction) model,
//! as saved by the training harness, into the `.wts` text file the TensorRT
//! inference engine loads its weights from.
//!
//! The training harness wraps the feature extractor in a `backbone.` module
//! and trains an auxiliary head (`aux_mlp`) the inference model does not have,
//! so the checkpoint is first remapped to the export model's names, then loaded
//! strictly into [`model::TntModel`], and finally written parameter by
//! parameter in registration order.
//!
//! ## Usage Example
//!
//! ```no_run
//! use tnt_export::export::{run_export, ExportOptions};
//!
//! let options = ExportOptions::new("weights/sg_best_TNT", "tensorrt_deploy/tnt_trt/tnt.wts");
//! let summary = run_export(&options)?;
//! println!("wrote {} tensors", summary.written.entries);
//! # Ok::<(), tnt_export::export::ExportError>(())
//! ```

pub mod export;
pub mod model;
pub mod nn;
pub mod params;
pub mod serialization;
