//! Reading and writing checkpoints in the SafeTensors format.
//!
//! SafeTensors is the portable container the training side exports its
//! `state_dict` to. Tensors come back as an ordered [`ParameterSet`] in the
//! order their data is laid out in the file, and every floating-point dtype is
//! converted to `f32`, the precision of the exported weight file.

use crate::params::ParameterSet;
use ndarray::{ArrayD, IxDyn};
use safetensors::serialize_to_file;
use safetensors::tensor::{Dtype, SafeTensors, TensorView};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while reading or writing SafeTensors files.
#[derive(Error, Debug)]
pub enum SafeTensorsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: safetensors::SafeTensorError,
    },

    #[error("SafeTensors error: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("tensor '{name}' has unsupported dtype {dtype}")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("tensor '{name}': shape {shape:?} does not hold {len} values")]
    ShapeMismatch {
        name: String,
        shape: Vec<usize>,
        len: usize,
    },
}

type Result<T> = std::result::Result<T, SafeTensorsError>;

/// Saves `tensors` as little-endian `F32` SafeTensors.
pub fn save_safetensors<P: AsRef<Path>>(path: P, tensors: &ParameterSet) -> Result<()> {
    // The views borrow these buffers, so they must all exist first.
    let buffers: Vec<Vec<u8>> = tensors
        .iter()
        .map(|(_, tensor)| tensor.iter().flat_map(|&x| x.to_le_bytes()).collect())
        .collect();

    let mut views: Vec<(&str, TensorView<'_>)> = Vec::with_capacity(tensors.len());
    for ((name, tensor), data) in tensors.iter().zip(&buffers) {
        views.push((name, TensorView::new(Dtype::F32, tensor.shape().to_vec(), data)?));
    }

    serialize_to_file(views, &None, path.as_ref())?;
    Ok(())
}

/// Loads every tensor of a SafeTensors file, in file storage order.
pub fn load_safetensors<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    let path = path.as_ref();
    let buffer = fs::read(path).map_err(|source| SafeTensorsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tensors = SafeTensors::deserialize(&buffer).map_err(|source| SafeTensorsError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    // The header is a JSON object and carries no order of its own; the data
    // offsets are the order the writer laid the tensors out in.
    let base = buffer.as_ptr() as usize;
    let offset = |view: &TensorView<'_>| (view.data().as_ptr() as usize).saturating_sub(base);
    let mut views = tensors.tensors();
    views.sort_by(|(a_name, a), (b_name, b)| offset(a).cmp(&offset(b)).then_with(|| a_name.cmp(b_name)));

    let mut result = ParameterSet::with_capacity(views.len());
    for (name, view) in views {
        let values = to_f32(&name, &view)?;
        let shape = view.shape().to_vec();
        let len = values.len();
        let tensor = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| {
            SafeTensorsError::ShapeMismatch {
                name: name.clone(),
                shape: shape.clone(),
                len,
            }
        })?;
        result.insert(name, tensor);
    }

    Ok(result)
}

/// Decodes a tensor's little-endian payload into `f32` values.
fn to_f32(name: &str, view: &TensorView<'_>) -> Result<Vec<f32>> {
    let data = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|b| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(b);
                f64::from_le_bytes(bytes) as f32
            })
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| half::bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => {
            return Err(SafeTensorsError::UnsupportedDtype {
                name: name.to_string(),
                dtype: format!("{:?}", other),
            })
        }
    };
    Ok(values)
}
