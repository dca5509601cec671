//! Operator attributes as they cross the boundary.
//!
//! An attribute is a tagged record: the tag says which payload field is
//! meaningful. Records built through the typed constructors always carry a
//! known tag, records coming from loaders or foreign callers may not, so the
//! tag stays a plain integer until someone reads it.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Known attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttType {
    /// Single f32.
    Float,
    /// Single i64.
    Int,
    /// Single string.
    String,
    /// List of f32.
    Floats,
    /// List of i64.
    Ints,
    /// List of strings.
    Strings,
}

impl AttType {
    /// Every known tag.
    pub const ALL: [AttType; 6] = [
        AttType::Float,
        AttType::Int,
        AttType::String,
        AttType::Floats,
        AttType::Ints,
        AttType::Strings,
    ];

    /// Numeric tag as it crosses the boundary.
    pub const fn code(self) -> u32 {
        match self {
            AttType::Float => 1,
            AttType::Int => 2,
            AttType::String => 3,
            AttType::Floats => 4,
            AttType::Ints => 7,
            AttType::Strings => 8,
        }
    }

    /// Look a tag up by code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    const fn label(self) -> &'static str {
        match self {
            AttType::Float => "float",
            AttType::Int => "int",
            AttType::String => "string",
            AttType::Floats => "floats",
            AttType::Ints => "ints",
            AttType::Strings => "strings",
        }
    }
}

/// Raw attribute record, one payload field per tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Attribute name.
    pub name: String,
    /// Tag selecting the meaningful payload.
    pub type_code: u32,
    /// Payload for `Int`.
    #[serde(default)]
    pub int: i64,
    /// Payload for `Float`.
    #[serde(default)]
    pub float: f32,
    /// Payload for `String`.
    #[serde(default)]
    pub string: String,
    /// Payload for `Ints`.
    #[serde(default)]
    pub ints: Vec<i64>,
    /// Payload for `Floats`.
    #[serde(default)]
    pub floats: Vec<f32>,
    /// Payload for `Strings`.
    #[serde(default)]
    pub strings: Vec<String>,
}

/// Named operator parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    record: AttributeRecord,
}

impl Attribute {
    fn tagged(name: impl Into<String>, tag: AttType) -> AttributeRecord {
        AttributeRecord {
            name: name.into(),
            type_code: tag.code(),
            ..AttributeRecord::default()
        }
    }

    /// Integer attribute.
    pub fn int(name: impl Into<String>, value: i64) -> Self {
        let mut record = Self::tagged(name, AttType::Int);
        record.int = value;
        Self { record }
    }

    /// Float attribute.
    pub fn float(name: impl Into<String>, value: f32) -> Self {
        let mut record = Self::tagged(name, AttType::Float);
        record.float = value;
        Self { record }
    }

    /// String attribute.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut record = Self::tagged(name, AttType::String);
        record.string = value.into();
        Self { record }
    }

    /// Integer list attribute.
    pub fn ints(name: impl Into<String>, values: Vec<i64>) -> Self {
        let mut record = Self::tagged(name, AttType::Ints);
        record.ints = values;
        Self { record }
    }

    /// Float list attribute.
    pub fn floats(name: impl Into<String>, values: Vec<f32>) -> Self {
        let mut record = Self::tagged(name, AttType::Floats);
        record.floats = values;
        Self { record }
    }

    /// String list attribute.
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        let mut record = Self::tagged(name, AttType::Strings);
        record.strings = values;
        Self { record }
    }

    /// Accept a record as-is, whatever its tag.
    pub fn from_raw(record: AttributeRecord) -> Self {
        Self { record }
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Numeric tag.
    pub fn type_code(&self) -> u32 {
        self.record.type_code
    }

    /// Known tag, `None` if the record carries an unsupported one.
    pub fn att_type(&self) -> Option<AttType> {
        AttType::from_code(self.record.type_code)
    }

    /// Underlying record.
    pub fn record(&self) -> &AttributeRecord {
        &self.record
    }

    /// Take the underlying record.
    pub fn into_record(self) -> AttributeRecord {
        self.record
    }

    fn expect(&self, tag: AttType) -> Result<()> {
        match self.att_type() {
            Some(actual) if actual == tag => Ok(()),
            Some(actual) => Err(CoreError::AttributeTypeMismatch {
                name: self.record.name.clone(),
                expected: tag.label(),
                actual: actual.label(),
            }),
            None => Err(CoreError::UnsupportedAttributeType {
                name: self.record.name.clone(),
                code: self.record.type_code,
            }),
        }
    }

    /// Integer payload.
    pub fn as_int(&self) -> Result<i64> {
        self.expect(AttType::Int)?;
        Ok(self.record.int)
    }

    /// Float payload.
    pub fn as_float(&self) -> Result<f32> {
        self.expect(AttType::Float)?;
        Ok(self.record.float)
    }

    /// String payload.
    pub fn as_str(&self) -> Result<&str> {
        self.expect(AttType::String)?;
        Ok(&self.record.string)
    }

    /// Integer list payload.
    pub fn as_ints(&self) -> Result<&[i64]> {
        self.expect(AttType::Ints)?;
        Ok(&self.record.ints)
    }

    /// Float list payload.
    pub fn as_floats(&self) -> Result<&[f32]> {
        self.expect(AttType::Floats)?;
        Ok(&self.record.floats)
    }

    /// String list payload.
    pub fn as_strings(&self) -> Result<&[String]> {
        self.expect(AttType::Strings)?;
        Ok(&self.record.strings)
    }
}
