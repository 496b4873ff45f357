//! File-to-value encoding.
//!
//! Most files pass through as opaque bytes. NumPy `.npy` array files are the
//! exception: their elements are converted to 32-bit floats and flattened in
//! row-major order, with the header (shape, dtype) discarded. Consumers must
//! know shape and dtype out of band to reinterpret the payload.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use npyz::{DType, Order, TypeChar};
use thiserror::Error;

/// How a file's contents become record bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Verbatim byte passthrough.
    RawBytes,
    /// NumPy array, re-encoded as flat f32.
    NumericArray,
}

/// Classify a path by extension. Pure; never touches the filesystem.
pub fn classify(path: &Path) -> FileKind {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("npy") => FileKind::NumericArray,
        _ => FileKind::RawBytes,
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid array file: {0}")]
    Decode(String),
}

/// Encode a file into its record value bytes.
///
/// Deterministic and side-effect free: the same file contents always produce
/// the same bytes.
pub fn encode_file(path: &Path) -> Result<Vec<u8>, EncodeError> {
    match classify(path) {
        FileKind::RawBytes => Ok(fs::read(path)?),
        FileKind::NumericArray => encode_array(path),
    }
}

/// Decode a `.npy` file and re-encode its elements as native-endian f32.
///
/// Failure to open the file is an I/O error; everything past that (bad
/// magic, truncated payload, unsupported dtype) is a decode error.
fn encode_array(path: &Path) -> Result<Vec<u8>, EncodeError> {
    let file = File::open(path)?;
    let npy = npyz::NpyFile::new(BufReader::new(file))
        .map_err(|err| EncodeError::Decode(err.to_string()))?;

    let shape: Vec<usize> = npy.shape().iter().map(|&dim| dim as usize).collect();
    let order = npy.order();
    let dtype = npy.dtype();

    let elements = match &dtype {
        DType::Plain(ty) => match (ty.type_char(), ty.size_field()) {
            (TypeChar::Float, 4) => collect_f32::<f32, _>(npy)?,
            (TypeChar::Float, 8) => collect_f32::<f64, _>(npy)?,
            (TypeChar::Int, 1) => collect_f32::<i8, _>(npy)?,
            (TypeChar::Int, 2) => collect_f32::<i16, _>(npy)?,
            (TypeChar::Int, 4) => collect_f32::<i32, _>(npy)?,
            (TypeChar::Int, 8) => collect_f32::<i64, _>(npy)?,
            (TypeChar::Uint, 1) => collect_f32::<u8, _>(npy)?,
            (TypeChar::Uint, 2) => collect_f32::<u16, _>(npy)?,
            (TypeChar::Uint, 4) => collect_f32::<u32, _>(npy)?,
            (TypeChar::Uint, 8) => collect_f32::<u64, _>(npy)?,
            (TypeChar::Bool, _) => collect_f32::<bool, _>(npy)?,
            _ => {
                return Err(EncodeError::Decode(format!("unsupported dtype {ty}")));
            }
        },
        other => {
            return Err(EncodeError::Decode(format!("unsupported dtype {other:?}")));
        }
    };

    let elements = match order {
        Order::C => elements,
        Order::Fortran => {
            let expected: usize = shape.iter().product();
            if expected != elements.len() {
                return Err(EncodeError::Decode(format!(
                    "element count {} does not match shape {:?}",
                    elements.len(),
                    shape
                )));
            }
            to_row_major(&elements, &shape)
        }
    };

    let mut bytes = Vec::with_capacity(elements.len() * 4);
    for value in elements {
        bytes.extend_from_slice(&value.to_ne_bytes());
    }
    Ok(bytes)
}

/// Lossy cast to f32, matching a NumPy `astype(float32)`.
trait ToF32: Copy {
    fn to_f32(self) -> f32;
}

macro_rules! impl_to_f32 {
    ($($ty:ty),* $(,)?) => {
        $(impl ToF32 for $ty {
            fn to_f32(self) -> f32 {
                self as f32
            }
        })*
    };
}

impl_to_f32!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl ToF32 for bool {
    fn to_f32(self) -> f32 {
        if self { 1.0 } else { 0.0 }
    }
}

fn collect_f32<T, R>(npy: npyz::NpyFile<R>) -> Result<Vec<f32>, EncodeError>
where
    T: npyz::Deserialize + ToF32,
    R: io::Read,
{
    let values = npy
        .into_vec::<T>()
        .map_err(|err| EncodeError::Decode(err.to_string()))?;
    Ok(values.into_iter().map(ToF32::to_f32).collect())
}

/// Reorder a column-major element buffer into row-major.
fn to_row_major(elements: &[f32], shape: &[usize]) -> Vec<f32> {
    if shape.len() < 2 {
        return elements.to_vec();
    }
    // Column-major strides: the first axis varies fastest on disk.
    let mut strides = vec![1usize; shape.len()];
    for axis in 1..shape.len() {
        strides[axis] = strides[axis - 1] * shape[axis - 1];
    }

    let mut out = Vec::with_capacity(elements.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..elements.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(elements[offset]);
        // Advance the multi-index with the last axis fastest.
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}
