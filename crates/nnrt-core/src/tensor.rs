//! Boundary tensor: a named, shaped, typed value with optional host data.

use std::fmt;

use crate::buffer::HostBuffer;
use crate::error::{CoreError, Result};
use crate::types::{DType, Format, Shape};

/// Tensor as seen by the consumer.
///
/// A tensor without data is a variable whose value is supplied at run time.
#[derive(Debug, Clone)]
pub struct Tensor {
    name: String,
    shape: Shape,
    format: Format,
    dtype: DType,
    data: Option<HostBuffer>,
}

impl Tensor {
    /// Create a variable tensor.
    pub fn new(name: impl Into<String>, shape: Shape, format: Format, dtype: DType) -> Self {
        Self {
            name: name.into(),
            shape,
            format,
            dtype,
            data: None,
        }
    }

    /// Create a variable tensor from a dimension slice.
    pub fn new_with_shape(
        name: impl Into<String>,
        dims: &[u32],
        format: Format,
        dtype: DType,
    ) -> Result<Self> {
        let name = name.into();
        let shape = Shape::new(dims).map_err(|e| match e {
            CoreError::InvalidTensorShape { reason, .. } => {
                CoreError::invalid_shape(name.clone(), reason)
            }
            other => other,
        })?;
        Ok(Self::new(name, shape, format, dtype))
    }

    /// Create a float32 constant in native byte order.
    pub fn from_f32(name: impl Into<String>, dims: &[u32], format: Format, values: &[f32]) -> Result<Self> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        Self::from_bytes(name, dims, format, DType::Float32, bytes)
    }

    /// Create a constant tensor that owns `bytes`.
    ///
    /// The byte length is checked against the shape for fixed-width dtypes.
    pub fn from_bytes(
        name: impl Into<String>,
        dims: &[u32],
        format: Format,
        dtype: DType,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let mut tensor = Self::new_with_shape(name, dims, format, dtype)?;
        tensor.set_data(HostBuffer::from_vec(bytes))?;
        Ok(tensor)
    }

    /// Attach data, replacing any previous buffer.
    pub fn set_data(&mut self, data: HostBuffer) -> Result<()> {
        self.check_len(data.len())?;
        self.data = Some(data);
        Ok(())
    }

    /// Attach a zero-copy view of caller memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`HostBuffer::external`]: the memory must outlive every
    /// use of this tensor and of anything converted from it, and must not be
    /// modified in the meantime.
    pub unsafe fn set_external_data(&mut self, ptr: *const u8, len: usize) -> Result<()> {
        let buffer = HostBuffer::external(ptr, len).ok_or_else(|| {
            CoreError::InvalidArgument(format!("null data pointer for tensor '{}'", self.name))
        })?;
        self.set_data(buffer)
    }

    /// Drop the data, turning the tensor back into a variable.
    pub fn clear_data(&mut self) {
        self.data = None;
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Memory layout.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The attached buffer, if any.
    pub fn buffer(&self) -> Option<&HostBuffer> {
        self.data.as_ref()
    }

    /// The attached bytes, empty for a variable.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref().map(HostBuffer::as_slice).unwrap_or(&[])
    }

    /// Whether data is attached.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Product of the shape.
    pub fn element_count(&self) -> usize {
        self.shape.element_count()
    }

    /// Bytes a buffer must hold, `None` for variable-width dtypes.
    ///
    /// Fails when the byte length does not fit in `usize`.
    pub fn expected_byte_len(&self) -> Result<Option<usize>> {
        let Some(size) = self.dtype.size_of() else {
            return Ok(None);
        };
        size.checked_mul(self.element_count()).map(Some).ok_or_else(|| {
            CoreError::invalid_shape(
                self.name.clone(),
                format!("byte length of shape {} of {} overflows", self.shape, self.dtype),
            )
        })
    }

    fn check_len(&self, len: usize) -> Result<()> {
        match self.expected_byte_len()? {
            Some(expected) if expected != len => Err(CoreError::invalid_shape(
                self.name.clone(),
                format!(
                    "shape {} of {} needs {} bytes, buffer holds {}",
                    self.shape, self.dtype, expected, len
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor({}, shape={}, format={:?}, dtype={}, bytes={})",
            self.name,
            self.shape,
            self.format,
            self.dtype,
            self.data().len()
        )
    }
}
