//! Serialization of model parameters.
//!
//! Supported formats:
//! - **SafeTensors**: Training checkpoints, read as an ordered [`ParameterSet`](crate::params::ParameterSet)
//! - **Checkpoint**: A SafeTensors file plus an optional `config.json`
//! - **WTS**: The hex text format consumed by the inference engine
//!
//! # Examples
//!
//! ```rust,ignore
//! use tnt_export::serialization::{load_checkpoint, save_weights, WriteOptions};
//!
//! let checkpoint = load_checkpoint("weights/sg_best_TNT")?;
//! save_weights("tnt.wts", &checkpoint.weights, WriteOptions::default())?;
//! ```

pub mod checkpoint;
pub mod safetensors_io;
pub mod wts;

pub use checkpoint::{load_checkpoint, save_checkpoint, Checkpoint, CheckpointError};
pub use safetensors_io::{load_safetensors, save_safetensors, SafeTensorsError};
pub use wts::{
    encode_f32, encoded_len, read_weights, save_weights, write_weights, NonFinitePolicy,
    WeightsError, WriteOptions, WriteSummary,
};
