//! Engine-native element types and layouts.

/// Element type as the engine understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ElementType {
    /// Unset.
    Undefined = 0,
    /// f32
    F32 = 1,
    /// u8
    U8 = 2,
    /// i8
    I8 = 3,
    /// u16
    U16 = 4,
    /// i16
    I16 = 5,
    /// i32
    I32 = 6,
    /// i64
    I64 = 7,
    /// Variable-width string.
    Str = 8,
    /// One-byte boolean.
    Bool = 9,
    /// f16
    F16 = 10,
    /// f64
    F64 = 11,
    /// u32
    U32 = 12,
    /// u64
    U64 = 13,
    /// Two f32.
    C64 = 14,
    /// Two f64.
    C128 = 15,
    /// bf16
    BF16 = 16,
}

impl ElementType {
    const ALL: [ElementType; 17] = [
        ElementType::Undefined,
        ElementType::F32,
        ElementType::U8,
        ElementType::I8,
        ElementType::U16,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::Str,
        ElementType::Bool,
        ElementType::F16,
        ElementType::F64,
        ElementType::U32,
        ElementType::U64,
        ElementType::C64,
        ElementType::C128,
        ElementType::BF16,
    ];

    /// Numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Element type for a numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Bytes per element, `None` when variable or undefined.
    pub fn byte_width(self) -> Option<usize> {
        match self {
            ElementType::U8 | ElementType::I8 | ElementType::Bool => Some(1),
            ElementType::U16 | ElementType::I16 | ElementType::F16 | ElementType::BF16 => Some(2),
            ElementType::F32 | ElementType::I32 | ElementType::U32 => Some(4),
            ElementType::F64 | ElementType::I64 | ElementType::U64 | ElementType::C64 => Some(8),
            ElementType::C128 => Some(16),
            ElementType::Undefined | ElementType::Str => None,
        }
    }
}

/// Memory layout as the engine understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
#[allow(clippy::upper_case_acronyms)]
pub enum Layout {
    /// Batch, channel, height, width.
    #[default]
    NCHW = 1,
    /// Batch, height, width, channel.
    NHWC = 2,
    /// Channel, height, width, batch.
    CHWN = 3,
    /// Height, width, channel, batch.
    HWCN = 4,
    /// Batch, depth, height, width, channel.
    NDHWC = 5,
    /// Batch, channel, depth, height, width.
    NCDHW = 6,
}

impl Layout {
    /// Numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Layout for a numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Layout::NCHW),
            2 => Some(Layout::NHWC),
            3 => Some(Layout::CHWN),
            4 => Some(Layout::HWCN),
            5 => Some(Layout::NDHWC),
            6 => Some(Layout::NCDHW),
            _ => None,
        }
    }
}
