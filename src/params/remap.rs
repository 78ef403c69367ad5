//! Translation of training-harness checkpoint names into export-model names.
//!
//! The training wrapper nests the feature extractor under `backbone.` and adds
//! an auxiliary recovery head (`aux_mlp`) that the exported model does not have.
//! [`CheckpointRemapper`] applies three rules to every entry, first match wins:
//!
//! 1. the name contains the drop marker: the entry is discarded;
//! 2. the name starts with the strip prefix: the prefix is removed once;
//! 3. otherwise the entry is copied unchanged.
//!
//! Tensor values are never touched and the relative order of retained entries
//! is preserved.

use super::{ParameterSet, AUX_MARKER, BACKBONE_PREFIX};
use tracing::{debug, warn};

/// Name rewriting rules for loading a training checkpoint into the export model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRemapper {
    drop_marker: String,
    strip_prefix: String,
}

impl Default for CheckpointRemapper {
    fn default() -> Self {
        Self {
            drop_marker: AUX_MARKER.to_string(),
            strip_prefix: BACKBONE_PREFIX.to_string(),
        }
    }
}

/// What [`CheckpointRemapper::remap_with_report`] did to each entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapReport {
    /// Names discarded by the drop rule, in input order.
    pub dropped: Vec<String>,
    /// `(from, to)` pairs produced by the prefix rule, in input order.
    pub renamed: Vec<(String, String)>,
    /// Number of entries copied unchanged.
    pub unchanged: usize,
    /// Output names written more than once; the later entry replaced the
    /// earlier one in place.
    pub collisions: Vec<String>,
}

impl RemapReport {
    fn collide(&mut self, name: &str) {
        warn!(name, "remapped name already present, overwriting earlier entry");
        self.collisions.push(name.to_string());
    }
}

/// Outcome of the rule chain for a single name.
#[derive(Debug, PartialEq, Eq)]
enum Rule<'a> {
    Drop,
    Strip(&'a str),
    Keep,
}

impl CheckpointRemapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `marker` instead of `aux_mlp` for the drop rule.
    pub fn with_drop_marker(mut self, marker: &str) -> Self {
        self.drop_marker = marker.to_string();
        self
    }

    /// Uses `prefix` instead of `backbone.` for the strip rule.
    pub fn with_strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_prefix = prefix.to_string();
        self
    }

    fn classify<'a>(&self, name: &'a str) -> Rule<'a> {
        if !self.drop_marker.is_empty() && name.contains(self.drop_marker.as_str()) {
            Rule::Drop
        } else if let Some(rest) = name.strip_prefix(self.strip_prefix.as_str()) {
            if self.strip_prefix.is_empty() {
                Rule::Keep
            } else {
                Rule::Strip(rest)
            }
        } else {
            Rule::Keep
        }
    }

    /// Returns the export-model name for `name`, or `None` if it is dropped.
    pub fn map_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.classify(name) {
            Rule::Drop => None,
            Rule::Strip(rest) => Some(rest),
            Rule::Keep => Some(name),
        }
    }

    /// Applies the rules to every entry of `checkpoint`.
    pub fn remap(&self, checkpoint: ParameterSet) -> ParameterSet {
        self.remap_with_report(checkpoint).0
    }

    /// Same as [`remap`](Self::remap), also reporting which rule fired per entry.
    pub fn remap_with_report(&self, checkpoint: ParameterSet) -> (ParameterSet, RemapReport) {
        let mut remapped = ParameterSet::with_capacity(checkpoint.len());
        let mut report = RemapReport::default();

        for (name, tensor) in checkpoint {
            match self.classify(&name) {
                Rule::Drop => {
                    debug!(name = %name, "dropping auxiliary parameter");
                    report.dropped.push(name);
                }
                Rule::Strip(rest) => {
                    let new_name = rest.to_string();
                    if remapped.insert(new_name.clone(), tensor).is_some() {
                        report.collide(&new_name);
                    }
                    report.renamed.push((name, new_name));
                }
                Rule::Keep => {
                    if remapped.insert(name.clone(), tensor).is_some() {
                        report.collide(&name);
                    }
                    report.unchanged += 1;
                }
            }
        }

        (remapped, report)
    }
}
