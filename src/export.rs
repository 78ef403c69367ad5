//! End-to-end export: training checkpoint → remap → strict load → `.wts`.

use crate::model::{
    initialize, training_parameter_specs, ModelError, TntConfig, TntModel, DEFAULT_SEED,
};
use crate::params::{CheckpointRemapper, RemapReport};
use crate::serialization::{
    load_checkpoint, save_checkpoint, save_weights, Checkpoint, CheckpointError, WeightsError,
    WriteOptions, WriteSummary,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to load checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to export weights: {0}")]
    Weights(#[from] WeightsError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Individual dimensions forced on top of whichever config is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub in_channels: Option<usize>,
    pub horizon: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: TntConfig) -> TntConfig {
        if let Some(in_channels) = self.in_channels {
            config.in_channels = in_channels;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        config
    }
}

/// Everything one export run needs.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub checkpoint: PathBuf,
    pub output: PathBuf,
    /// Explicit model config. Falls back to the checkpoint's `config.json`,
    /// then to [`TntConfig::default`].
    pub config: Option<TntConfig>,
    pub overrides: ConfigOverrides,
    pub seed: u64,
    pub remapper: CheckpointRemapper,
    pub write: WriteOptions,
}

impl ExportOptions {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(checkpoint: P, output: Q) -> Self {
        Self {
            checkpoint: checkpoint.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            config: None,
            overrides: ConfigOverrides::default(),
            seed: DEFAULT_SEED,
            remapper: CheckpointRemapper::default(),
            write: WriteOptions::default(),
        }
    }

    pub fn with_config(mut self, config: TntConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_write_options(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }

    /// Picks the config for `checkpoint` following the documented precedence.
    pub fn resolve_config(&self, checkpoint: &Checkpoint) -> TntConfig {
        let base = self
            .config
            .clone()
            .or_else(|| checkpoint.config.clone())
            .unwrap_or_default();
        self.overrides.apply(base)
    }
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub config: TntConfig,
    pub remap: RemapReport,
    pub written: WriteSummary,
}

/// Builds the export model and loads the remapped `checkpoint` into it.
pub fn load_tnt(
    checkpoint: Checkpoint,
    config: TntConfig,
    remapper: &CheckpointRemapper,
    seed: u64,
) -> Result<(TntModel, RemapReport)> {
    let mut model = TntModel::with_seed(config, seed)?;
    let (state_dict, report) = remapper.remap_with_report(checkpoint.weights);
    info!(
        dropped = report.dropped.len(),
        renamed = report.renamed.len(),
        unchanged = report.unchanged,
        collisions = report.collisions.len(),
        "remapped checkpoint"
    );
    model.load(state_dict)?;
    Ok((model, report))
}

/// Runs the whole export described by `options`.
pub fn run_export(options: &ExportOptions) -> Result<ExportSummary> {
    let checkpoint = load_checkpoint(&options.checkpoint)?;
    let config = options.resolve_config(&checkpoint);

    let (model, remap) = load_tnt(checkpoint, config.clone(), &options.remapper, options.seed)?;
    info!("Success load state dict from: {}", options.checkpoint.display());

    let written = save_weights(&options.output, model.parameters(), options.write)?;
    info!(
        entries = written.entries,
        elements = written.elements,
        bytes = written.bytes,
        "exported {}",
        options.output.display()
    );

    Ok(ExportSummary {
        config,
        remap,
        written,
    })
}

/// Writes a randomly initialized checkpoint directory in the training layout.
///
/// The names carry the `backbone.` wrapper and, with `with_aux`, the auxiliary
/// head, exactly like a checkpoint saved by the training harness.
pub fn write_synthetic_checkpoint<P: AsRef<Path>>(
    dir: P,
    config: TntConfig,
    seed: u64,
    with_aux: bool,
) -> Result<Checkpoint> {
    let specs = training_parameter_specs(&config, with_aux)?;
    let checkpoint = Checkpoint::new(initialize(&specs, seed)).with_config(config);
    save_checkpoint(dir.as_ref(), &checkpoint)?;
    info!(
        tensors = checkpoint.weights.len(),
        "wrote synthetic checkpoint to {}",
        dir.as_ref().display()
    );
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_precedence() {
        let from_checkpoint = TntConfig::default().with_in_channels(10);
        let checkpoint = Checkpoint::default().with_config(from_checkpoint.clone());

        let options = ExportOptions::new("ckpt", "out.wts");
        assert_eq!(options.resolve_config(&checkpoint), from_checkpoint);
        assert_eq!(options.resolve_config(&Checkpoint::default()), TntConfig::default());

        let explicit = TntConfig::default().with_horizon(50);
        let options = options.with_config(explicit.clone());
        assert_eq!(options.resolve_config(&checkpoint), explicit);
    }

    #[test]
    fn test_overrides_apply_last() {
        let checkpoint = Checkpoint::default().with_config(TntConfig::default().with_in_channels(10));
        let options = ExportOptions::new("ckpt", "out.wts").with_overrides(ConfigOverrides {
            in_channels: None,
            horizon: Some(12),
        });

        let config = options.resolve_config(&checkpoint);
        assert_eq!(config.in_channels, 10);
        assert_eq!(config.horizon, 12);
    }
}
