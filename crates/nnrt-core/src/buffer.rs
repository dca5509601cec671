//! Host memory backing constant tensors.
//!
//! A buffer is either shared, reference-counted bytes or a zero-copy view of
//! memory owned by a foreign caller. Neither form is ever deep-copied when a
//! tensor crosses into the engine.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

/// Bytes attached to a constant tensor.
#[derive(Clone)]
pub enum HostBuffer {
    /// Reference-counted bytes; clones share the allocation.
    Owned(Arc<[u8]>),
    /// View of memory owned elsewhere.
    External(ExternalBuffer),
}

/// Pointer and length of caller-owned memory.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ExternalBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: an ExternalBuffer is only created through `HostBuffer::external`,
// whose contract requires the memory to stay valid and unmodified while any
// copy of the view is in use. Reads from several threads are then sound.
unsafe impl Send for ExternalBuffer {}
unsafe impl Sync for ExternalBuffer {}

impl HostBuffer {
    /// Take ownership of a byte vector.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        HostBuffer::Owned(Arc::from(bytes))
    }

    /// Wrap caller memory without copying it. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` readable bytes that stay valid and are not
    /// written to for as long as this buffer, or any tensor or engine object
    /// built from it, is alive.
    pub unsafe fn external(ptr: *const u8, len: usize) -> Option<Self> {
        NonNull::new(ptr as *mut u8).map(|ptr| HostBuffer::External(ExternalBuffer { ptr, len }))
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        match self {
            HostBuffer::Owned(bytes) => bytes.len(),
            HostBuffer::External(view) => view.len,
        }
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            HostBuffer::Owned(bytes) => bytes,
            // SAFETY: upheld by the contract of `HostBuffer::external`.
            HostBuffer::External(view) => unsafe {
                std::slice::from_raw_parts(view.ptr.as_ptr(), view.len)
            },
        }
    }

    /// Address of the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// The shared allocation, if this buffer owns one.
    pub fn shared(&self) -> Option<&Arc<[u8]>> {
        match self {
            HostBuffer::Owned(bytes) => Some(bytes),
            HostBuffer::External(_) => None,
        }
    }

    /// Whether the bytes live outside Rust-managed memory.
    pub fn is_external(&self) -> bool {
        matches!(self, HostBuffer::External(_))
    }
}

impl From<Vec<u8>> for HostBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        HostBuffer::from_vec(bytes)
    }
}

impl From<Arc<[u8]>> for HostBuffer {
    fn from(bytes: Arc<[u8]>) -> Self {
        HostBuffer::Owned(bytes)
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_external() { "external" } else { "owned" };
        write!(f, "HostBuffer {{ {}, ptr: {:p}, len: {} }}", kind, self.as_ptr(), self.len())
    }
}
