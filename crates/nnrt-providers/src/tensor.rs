//! Engine tensors.

use std::ptr::NonNull;
use std::sync::Arc;

use crate::types::{ElementType, Layout};

/// Raw view of memory the engine does not own.
#[derive(Debug, Clone, Copy)]
pub struct BufferView {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: views are created only through `BufferView::new`, whose caller
// guarantees the memory is readable and unchanged while the view is in use.
unsafe impl Send for BufferView {}
unsafe impl Sync for BufferView {}

impl BufferView {
    /// Wrap foreign memory. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must address `len` readable bytes that outlive the view and are
    /// not mutated while it exists.
    pub unsafe fn new(ptr: *const u8, len: usize) -> Option<Self> {
        NonNull::new(ptr as *mut u8).map(|ptr| Self { ptr, len })
    }

    /// The viewed bytes.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: upheld by the contract of `BufferView::new`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

/// Bytes backing a constant tensor.
#[derive(Debug, Clone)]
pub enum Buffer {
    /// Reference-counted bytes, possibly shared with the caller.
    Shared(Arc<[u8]>),
    /// Foreign memory.
    View(BufferView),
}

impl Buffer {
    /// The bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Shared(bytes) => bytes,
            Buffer::View(view) => view.as_slice(),
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a tensor carries data.
#[derive(Debug, Clone)]
pub enum TensorData {
    /// Value bound at execution time.
    Variable,
    /// Fixed value.
    Constant(Buffer),
}

/// Engine tensor.
#[derive(Debug, Clone)]
pub struct Tensor {
    /// Name.
    pub name: String,
    /// Dimensions in order.
    pub dims: Vec<u32>,
    /// Memory layout.
    pub layout: Layout,
    /// Element type.
    pub element_type: ElementType,
    /// Data, if constant.
    pub data: TensorData,
}

impl Tensor {
    /// Variable tensor.
    pub fn variable(name: impl Into<String>, dims: Vec<u32>, layout: Layout, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            dims,
            layout,
            element_type,
            data: TensorData::Variable,
        }
    }

    /// Constant tensor over `buffer`.
    pub fn constant(
        name: impl Into<String>,
        dims: Vec<u32>,
        layout: Layout,
        element_type: ElementType,
        buffer: Buffer,
    ) -> Self {
        Self {
            name: name.into(),
            dims,
            layout,
            element_type,
            data: TensorData::Constant(buffer),
        }
    }

    /// Bytes of a constant, empty for a variable.
    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            TensorData::Constant(buffer) => buffer.as_slice(),
            TensorData::Variable => &[],
        }
    }

    /// Whether the tensor carries data.
    pub fn is_constant(&self) -> bool {
        matches!(self.data, TensorData::Constant(_))
    }

    /// Product of the dimensions, zero when there are none. Saturates
    /// rather than overflowing.
    pub fn element_count(&self) -> usize {
        if self.dims.is_empty() {
            return 0;
        }
        self.dims
            .iter()
            .fold(1usize, |acc, &d| acc.saturating_mul(d as usize))
    }
}
