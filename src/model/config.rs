//! Hyperparameters of the TNT export model.

use super::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Model dimensions. Every field falls back to the value the reference
/// training recipe uses, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TntConfig {
    /// Number of predicted future steps.
    pub horizon: usize,
    /// Feature width of each polyline vector.
    pub in_channels: usize,
    /// Number of final trajectories.
    pub k: usize,
    /// Number of selected targets.
    pub m: usize,
    pub num_subgraph_layers: usize,
    pub num_global_graph_layer: usize,
    pub subgraph_width: usize,
    pub global_graph_width: usize,
    pub target_pred_hid: usize,
    pub motion_esti_hid: usize,
    pub score_sel_hid: usize,
    /// Hidden width of the training-only auxiliary head.
    pub aux_width: usize,
}

impl Default for TntConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            in_channels: 6,
            k: 6,
            m: 50,
            num_subgraph_layers: 3,
            num_global_graph_layer: 1,
            subgraph_width: 64,
            global_graph_width: 64,
            target_pred_hid: 64,
            motion_esti_hid: 64,
            score_sel_hid: 64,
            aux_width: 64,
        }
    }
}

impl TntConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the polyline feature width.
    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Sets the prediction horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ModelError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TntConfig =
            serde_json::from_str(&text).map_err(|source| ModelError::ConfigJson {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects dimensions that cannot produce a well-formed model.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("horizon", self.horizon),
            ("in_channels", self.in_channels),
            ("k", self.k),
            ("m", self.m),
            ("num_subgraph_layers", self.num_subgraph_layers),
            ("num_global_graph_layer", self.num_global_graph_layer),
            ("subgraph_width", self.subgraph_width),
            ("global_graph_width", self.global_graph_width),
            ("target_pred_hid", self.target_pred_hid),
            ("motion_esti_hid", self.motion_esti_hid),
            ("score_sel_hid", self.score_sel_hid),
            ("aux_width", self.aux_width),
        ];
        if let Some((field, _)) = dims.iter().find(|(_, value)| *value == 0) {
            return Err(ModelError::Config(format!("{} must be positive", field)));
        }
        if self.k > self.m {
            return Err(ModelError::Config(format!(
                "k ({}) cannot exceed m ({})",
                self.k, self.m
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TntConfig = serde_json::from_str(r#"{"in_channels": 10, "horizon": 50}"#).unwrap();
        assert_eq!(config.in_channels, 10);
        assert_eq!(config.horizon, 50);
        assert_eq!(config.subgraph_width, 64);
        assert_eq!(config.m, 50);
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let mut config = TntConfig::default();
        config.global_graph_width = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("global_graph_width"));
    }

    #[test]
    fn test_validate_rejects_k_above_m() {
        let mut config = TntConfig::default();
        config.k = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = TntConfig::new().with_in_channels(10).with_horizon(50);
        assert_eq!(config.in_channels, 10);
        assert_eq!(config.horizon, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json_file_names_path() {
        let path = std::env::temp_dir().join(format!("tnt_export_bad_config_{}.json", std::process::id()));
        fs::write(&path, "{not json").unwrap();

        let err = TntConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ModelError::ConfigJson { .. }));
        assert!(err.to_string().contains("tnt_export_bad_config_"));

        fs::remove_file(&path).ok();
    }
}
