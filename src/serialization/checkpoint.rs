//! Training checkpoints as consumed by the exporter.
//!
//! A checkpoint is either a bare SafeTensors file or a directory:
//!
//! ```text
//! checkpoint_dir/
//! ├── config.json          # TntConfig the model was trained with (optional)
//! └── model.safetensors    # state_dict of the training model
//! ```

use super::safetensors_io::{load_safetensors, save_safetensors, SafeTensorsError};
use crate::model::{ModelError, TntConfig};
use crate::params::ParameterSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File holding the weights inside a checkpoint directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// File holding the model config inside a checkpoint directory.
pub const CONFIG_FILE: &str = "config.json";

/// Errors while loading or saving checkpoints.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SafeTensors(#[from] SafeTensorsError),

    #[error("checkpoint config: {0}")]
    Config(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint not found: {0}")]
    NotFound(PathBuf),
}

type Result<T> = std::result::Result<T, CheckpointError>;

/// Weights of a training run plus, when available, its model config.
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    pub config: Option<TntConfig>,
    pub weights: ParameterSet,
}

impl Checkpoint {
    pub fn new(weights: ParameterSet) -> Self {
        Self {
            config: None,
            weights,
        }
    }

    pub fn with_config(mut self, config: TntConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Loads a checkpoint from a SafeTensors file or a checkpoint directory.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Checkpoint> {
    let path = path.as_ref();

    if path.is_dir() {
        let weights_path = path.join(WEIGHTS_FILE);
        if !weights_path.is_file() {
            return Err(CheckpointError::NotFound(weights_path));
        }
        let config_path = path.join(CONFIG_FILE);
        let config = if config_path.is_file() {
            Some(TntConfig::from_json_file(&config_path)?)
        } else {
            None
        };
        return Ok(Checkpoint {
            config,
            weights: load_safetensors(&weights_path)?,
        });
    }

    if !path.exists() {
        return Err(CheckpointError::NotFound(path.to_path_buf()));
    }
    Ok(Checkpoint::new(load_safetensors(path)?))
}

/// Saves `checkpoint` as a checkpoint directory, creating it if needed.
pub fn save_checkpoint<P: AsRef<Path>>(path: P, checkpoint: &Checkpoint) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|source| CheckpointError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    if let Some(ref config) = checkpoint.config {
        let config_path = dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&config_path, json).map_err(|source| CheckpointError::Io {
            path: config_path.clone(),
            source,
        })?;
    }

    save_safetensors(dir.join(WEIGHTS_FILE), &checkpoint.weights)?;
    Ok(())
}
