//! The `.wts` weight file read by the TensorRT inference engine.
//!
//! ```text
//! <entry_count>\n
//! <name> <count> <sp><hex><sp><hex>...<sp><hex>\n     (entry_count times)
//! ```
//!
//! `<count>` is followed by one space, and every element token carries its own
//! leading space, so the first token is preceded by two spaces. Each token is
//! the 8 lowercase hex digits of the big-endian IEEE-754 single-precision bit
//! pattern of one element, in row-major order. Non-finite values are ordinary
//! bit patterns and are written unchanged unless the caller asks to reject them.

use crate::params::ParameterSet;
use ndarray::{ArrayD, IxDyn};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Hex digits per element.
pub const HEX_DIGITS: usize = 8;

/// Bytes per element on disk: a space plus the hex digits.
const TOKEN_LEN: usize = HEX_DIGITS + 1;

#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parameter name {0:?} cannot be written: names must be non-empty and contain no whitespace")]
    InvalidName(String),

    #[error("non-finite value {value} at element {index} of '{name}'")]
    NonFinite { name: String, index: usize, value: f32 },

    #[error("hex encoding error: {0}")]
    Encoding(#[from] hex::FromHexError),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, WeightsError>;

/// What to do with NaN and infinite elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonFinitePolicy {
    /// Write the bit pattern unchanged.
    #[default]
    PassThrough,
    /// Fail before anything is written.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub non_finite: NonFinitePolicy,
}

/// Totals reported after a successful write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub entries: usize,
    pub elements: usize,
    pub bytes: usize,
    /// NaN or infinite elements written (always 0 under `Reject`).
    pub non_finite: usize,
}

/// Hex token for one element: `1.0` encodes as `3f800000`.
pub fn encode_f32(value: f32) -> String {
    hex::encode(value.to_be_bytes())
}

/// Inverse of [`encode_f32`]; the token must be exactly 8 hex digits.
pub fn decode_f32(token: &str) -> std::result::Result<f32, hex::FromHexError> {
    let mut bytes = [0u8; 4];
    hex::decode_to_slice(token, &mut bytes)?;
    Ok(f32::from_be_bytes(bytes))
}

/// Exact size in bytes of the file [`write_weights`] produces for `params`.
pub fn encoded_len(params: &ParameterSet) -> usize {
    let header = params.len().to_string().len() + 1;
    params.iter().fold(header, |total, (name, tensor)| {
        let count = tensor.len();
        total + name.len() + 1 + count.to_string().len() + 1 + count * TOKEN_LEN + 1
    })
}

/// Checks everything that would make the file malformed or violate `options`.
pub fn validate(params: &ParameterSet, options: WriteOptions) -> Result<()> {
    for (name, tensor) in params {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(WeightsError::InvalidName(name.to_string()));
        }
        if options.non_finite == NonFinitePolicy::Reject {
            if let Some((index, &value)) = tensor.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(WeightsError::NonFinite {
                    name: name.to_string(),
                    index,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Writes `params` in `.wts` format to `writer`, in iteration order.
///
/// Validation runs before the first byte is written.
pub fn write_weights<W: Write>(
    writer: &mut W,
    params: &ParameterSet,
    options: WriteOptions,
) -> Result<WriteSummary> {
    validate(params, options)?;
    write_entries(writer, params)
}

/// Creates (or truncates) `path` and writes `params` to it.
///
/// Nothing is created when validation fails. An I/O error part-way through
/// leaves a truncated file behind.
pub fn save_weights<P: AsRef<Path>>(
    path: P,
    params: &ParameterSet,
    options: WriteOptions,
) -> Result<WriteSummary> {
    let path = path.as_ref();
    validate(params, options)?;

    info!("Writing into {}", path.display());
    let with_path = |err: WeightsError| match err {
        WeightsError::Io(source) => WeightsError::Write {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    };

    let file = File::create(path).map_err(WeightsError::from).map_err(with_path)?;
    let mut writer = BufWriter::new(file);
    let summary = write_entries(&mut writer, params).map_err(with_path)?;
    writer.flush().map_err(WeightsError::from).map_err(with_path)?;

    if summary.non_finite > 0 {
        warn!(
            count = summary.non_finite,
            "non-finite values written unchanged to {}",
            path.display()
        );
    }
    Ok(summary)
}

/// Contiguous row-major view of `tensor`'s elements.
///
/// Borrowed when the tensor already has standard layout; otherwise a staging
/// copy is made, which is dropped as soon as the entry has been written.
fn host_values(tensor: &ArrayD<f32>) -> Cow<'_, [f32]> {
    match tensor.as_slice() {
        Some(values) => Cow::Borrowed(values),
        None => Cow::Owned(tensor.iter().copied().collect()),
    }
}

fn write_entries<W: Write>(writer: &mut W, params: &ParameterSet) -> Result<WriteSummary> {
    let mut summary = WriteSummary::default();

    let header = format!("{}\n", params.len());
    writer.write_all(header.as_bytes())?;
    summary.bytes += header.len();

    let mut token = [b' '; TOKEN_LEN];
    for (name, tensor) in params {
        let values = host_values(tensor);

        let prefix = format!("{} {} ", name, values.len());
        writer.write_all(prefix.as_bytes())?;

        for &value in values.iter() {
            if !value.is_finite() {
                summary.non_finite += 1;
            }
            hex::encode_to_slice(value.to_be_bytes(), &mut token[1..])?;
            writer.write_all(&token)?;
        }
        writer.write_all(b"\n")?;

        debug!(name, elements = values.len(), "wrote tensor");
        summary.entries += 1;
        summary.elements += values.len();
        summary.bytes += prefix.len() + values.len() * TOKEN_LEN + 1;
    }

    Ok(summary)
}

/// Reads a `.wts` file back into a set of flattened (1-D) tensors.
pub fn read_weights<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| WeightsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_weights(BufReader::new(file)).map_err(|err| match err {
        WeightsError::Io(source) => WeightsError::Read {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn parse_error(line: usize, message: impl Into<String>) -> WeightsError {
    WeightsError::Parse {
        line,
        message: message.into(),
    }
}

/// Parses `.wts` content. Shapes are not stored, so every tensor is 1-D.
pub fn parse_weights<R: BufRead>(reader: R) -> Result<ParameterSet> {
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| parse_error(1, "empty file, expected an entry count"))??;
    let count: usize = header
        .parse()
        .map_err(|_| parse_error(1, format!("invalid entry count {:?}", header)))?;

    // The header is untrusted; entries are only allocated as they are read.
    let mut params = ParameterSet::new();
    for entry in 0..count {
        let line_no = entry + 2;
        let line = lines.next().ok_or_else(|| {
            parse_error(line_no, format!("expected {} entries, found {}", count, entry))
        })??;

        let mut tokens = line.split_ascii_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| parse_error(line_no, "missing parameter name"))?;
        let len: usize = tokens
            .next()
            .ok_or_else(|| parse_error(line_no, "missing element count"))?
            .parse()
            .map_err(|_| parse_error(line_no, "invalid element count"))?;

        let values = tokens
            .map(|token| {
                decode_f32(token)
                    .map_err(|err| parse_error(line_no, format!("bad token {:?}: {}", token, err)))
            })
            .collect::<Result<Vec<f32>>>()?;
        if values.len() != len {
            return Err(parse_error(
                line_no,
                format!("'{}' declares {} elements but has {}", name, len, values.len()),
            ));
        }
        if params.contains(name) {
            return Err(parse_error(line_no, format!("duplicate parameter '{}'", name)));
        }

        let tensor = ArrayD::from_shape_vec(IxDyn(&[len]), values)
            .map_err(|err| parse_error(line_no, err.to_string()))?;
        params.insert(name, tensor);
    }

    if let Some(extra) = lines.next() {
        extra?;
        return Err(parse_error(count + 2, "trailing data after the last entry"));
    }

    Ok(params)
}
