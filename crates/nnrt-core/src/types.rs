//! Element types, memory layouts and shapes of boundary tensors.
//!
//! The numeric codes of [`DType`] and [`Format`] are part of the boundary
//! contract: they are what crosses into the engine and out through the C API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum number of dimensions a tensor may carry.
pub const MAX_DIMS: usize = 8;

/// Tensor element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// Unset element type.
    Undefined,
    /// 32-bit float.
    Float32,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Variable-width string.
    String,
    /// Boolean stored as one byte.
    Bool,
    /// IEEE half precision float.
    Float16,
    /// 64-bit float.
    Float64,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Complex number of two f32.
    Complex64,
    /// Complex number of two f64.
    Complex128,
    /// Brain float 16.
    Bfloat16,
}

impl DType {
    /// Every dtype in code order.
    pub const ALL: [DType; 17] = [
        DType::Undefined,
        DType::Float32,
        DType::Uint8,
        DType::Int8,
        DType::Uint16,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::String,
        DType::Bool,
        DType::Float16,
        DType::Float64,
        DType::Uint32,
        DType::Uint64,
        DType::Complex64,
        DType::Complex128,
        DType::Bfloat16,
    ];

    /// Boundary code of this dtype.
    pub const fn code(self) -> u32 {
        match self {
            DType::Undefined => 0,
            DType::Float32 => 1,
            DType::Uint8 => 2,
            DType::Int8 => 3,
            DType::Uint16 => 4,
            DType::Int16 => 5,
            DType::Int32 => 6,
            DType::Int64 => 7,
            DType::String => 8,
            DType::Bool => 9,
            DType::Float16 => 10,
            DType::Float64 => 11,
            DType::Uint32 => 12,
            DType::Uint64 => 13,
            DType::Complex64 => 14,
            DType::Complex128 => 15,
            DType::Bfloat16 => 16,
        }
    }

    /// Look a dtype up by its boundary code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.code() == code)
            .ok_or(CoreError::UnknownDType(code))
    }

    /// Size of one element in bytes, `None` for undefined or variable-width types.
    pub const fn size_of(self) -> Option<usize> {
        match self {
            DType::Uint8 | DType::Int8 | DType::Bool => Some(1),
            DType::Uint16 | DType::Int16 | DType::Float16 | DType::Bfloat16 => Some(2),
            DType::Float32 | DType::Int32 | DType::Uint32 => Some(4),
            DType::Float64 | DType::Int64 | DType::Uint64 | DType::Complex64 => Some(8),
            DType::Complex128 => Some(16),
            DType::Undefined | DType::String => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Tensor memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Format {
    /// Batch, channel, height, width.
    #[default]
    NCHW,
    /// Batch, height, width, channel.
    NHWC,
    /// Channel, height, width, batch.
    CHWN,
    /// Height, width, channel, batch.
    HWCN,
    /// Batch, depth, height, width, channel.
    NDHWC,
    /// Batch, channel, depth, height, width.
    NCDHW,
}

impl Format {
    /// Every format in code order.
    pub const ALL: [Format; 6] = [
        Format::NCHW,
        Format::NHWC,
        Format::CHWN,
        Format::HWCN,
        Format::NDHWC,
        Format::NCDHW,
    ];

    /// Boundary code of this layout.
    pub const fn code(self) -> u32 {
        match self {
            Format::NCHW => 1,
            Format::NHWC => 2,
            Format::CHWN => 3,
            Format::HWCN => 4,
            Format::NDHWC => 5,
            Format::NCDHW => 6,
        }
    }

    /// Look a layout up by its boundary code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.code() == code)
            .ok_or(CoreError::UnknownFormat(code))
    }
}

/// Ordered tensor dimensions, between 1 and [`MAX_DIMS`] of them, whose
/// product fits in `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    dim: usize,
    data: [u32; MAX_DIMS],
}

impl Shape {
    /// Build a shape from its dimensions.
    pub fn new(dims: &[u32]) -> Result<Self> {
        if dims.is_empty() {
            return Err(CoreError::invalid_shape("<shape>", "a shape needs at least one dim"));
        }
        if dims.len() > MAX_DIMS {
            return Err(CoreError::invalid_shape(
                "<shape>",
                format!("{} dims requested, at most {} allowed", dims.len(), MAX_DIMS),
            ));
        }
        if checked_product(dims).is_none() {
            return Err(CoreError::invalid_shape(
                "<shape>",
                format!("element count of {:?} overflows", dims),
            ));
        }
        let mut data = [0; MAX_DIMS];
        data[..dims.len()].copy_from_slice(dims);
        Ok(Self {
            dim: dims.len(),
            data,
        })
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The dimensions in order.
    pub fn dims(&self) -> &[u32] {
        &self.data[..self.dim]
    }

    /// Product of the dimensions.
    pub fn element_count(&self) -> usize {
        // Checked in `new`.
        checked_product(self.dims()).unwrap_or(usize::MAX)
    }
}

fn checked_product(dims: &[u32]) -> Option<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims())
    }
}
