//! Ordered name → tensor mapping shared by every stage of the export.
//!
//! A [`ParameterSet`] keeps entries in the order they were inserted. That order
//! is part of the contract: the weight file lists parameters positionally, so a
//! checkpoint read from disk, a remapped copy of it and the model's own state all
//! carry an explicit, inspectable order instead of relying on hash iteration.

pub mod remap;

pub use remap::{CheckpointRemapper, RemapReport};

use ndarray::ArrayD;
use std::collections::HashMap;

/// Path segment used by the training harness for its auxiliary recovery head.
pub const AUX_MARKER: &str = "aux_mlp";

/// Prefix the training harness puts in front of the shared feature extractor.
pub const BACKBONE_PREFIX: &str = "backbone.";

/// Returns `true` for parameters of the training-only auxiliary head.
pub fn is_auxiliary(name: &str) -> bool {
    name.contains(AUX_MARKER)
}

/// An ordered collection of named `f32` tensors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, ArrayD<f32>)>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Appends a tensor under `name`.
    ///
    /// If the name is already present the value is replaced in place, the entry
    /// keeps its original position and the previous tensor is returned.
    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) -> Option<ArrayD<f32>> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, tensor)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, tensor));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Removes `name`, shifting the entries after it down by one.
    pub fn remove(&mut self, name: &str) -> Option<ArrayD<f32>> {
        let pos = self.index.remove(name)?;
        let (_, tensor) = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(tensor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, tensor)` pairs in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Sum of the element counts of every tensor.
    pub fn total_elements(&self) -> usize {
        self.entries.iter().map(|(_, tensor)| tensor.len()).sum()
    }
}

impl FromIterator<(String, ArrayD<f32>)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, ArrayD<f32>)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (name, tensor) in iter {
            set.insert(name, tensor);
        }
        set
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, ArrayD<f32>);
    type IntoIter = std::vec::IntoIter<(String, ArrayD<f32>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a str, &'a ArrayD<f32>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`ParameterSet`].
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, ArrayD<f32>)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a ArrayD<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, tensor)| (name.as_str(), tensor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}
