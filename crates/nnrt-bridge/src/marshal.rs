//! Type marshaller.
//!
//! Converts boundary graphs, operators, tensors and attributes into their
//! engine counterparts, and exposes engine result tensors back to the
//! boundary. Tensor data is never deep-copied on the way in: owned buffers
//! are shared by reference count, external buffers become raw views.

use std::collections::HashSet;

use nnrt_core::{
    AttType, Attribute, DType, Format, Graph, HostBuffer, Operator, Tensor,
};
use nnrt_providers as engine;
use nnrt_providers::{AttrValue, Buffer, BufferView, ElementType, Layout, TensorData};
use tracing::trace;

use crate::error::{BridgeError, Result};

fn element_type(dtype: DType) -> Result<ElementType> {
    ElementType::from_code(dtype.code()).ok_or_else(|| {
        BridgeError::InvalidArgument(format!("dtype {} has no engine element type", dtype))
    })
}

fn layout(format: Format) -> Result<Layout> {
    Layout::from_code(format.code()).ok_or_else(|| {
        BridgeError::InvalidArgument(format!("format {:?} has no engine layout", format))
    })
}

/// Convert a boundary tensor.
///
/// A tensor with a non-empty buffer becomes a constant sharing that buffer;
/// anything else becomes a variable. For fixed-width dtypes the buffer length
/// must equal the shape product times the element size.
pub fn convert_tensor(tensor: &Tensor) -> Result<engine::Tensor> {
    let element_type = element_type(tensor.dtype())?;
    let layout = layout(tensor.format())?;
    let dims = tensor.shape().dims().to_vec();

    let data = match tensor.buffer() {
        Some(buffer) if !buffer.is_empty() => {
            if let Some(expected) = tensor.expected_byte_len()? {
                if buffer.len() != expected {
                    return Err(BridgeError::InvalidTensorShape {
                        name: tensor.name().to_string(),
                        reason: format!(
                            "shape {} needs {} bytes, buffer holds {}",
                            tensor.shape(),
                            expected,
                            buffer.len()
                        ),
                    });
                }
            }
            TensorData::Constant(share(buffer)?)
        }
        _ => TensorData::Variable,
    };

    Ok(engine::Tensor {
        name: tensor.name().to_string(),
        dims,
        layout,
        element_type,
        data,
    })
}

fn share(buffer: &HostBuffer) -> Result<Buffer> {
    match buffer {
        HostBuffer::Owned(bytes) => Ok(Buffer::Shared(bytes.clone())),
        HostBuffer::External(_) => {
            // SAFETY: an external HostBuffer already carries the contract that
            // its memory outlives every engine object built from it.
            let view = unsafe { BufferView::new(buffer.as_ptr(), buffer.len()) };
            view.map(Buffer::View)
                .ok_or_else(|| BridgeError::InvalidArgument("null external buffer".to_string()))
        }
    }
}

/// Convert a list of input tensors.
pub fn convert_inputs(inputs: &[&Tensor]) -> Result<Vec<engine::Tensor>> {
    inputs.iter().map(|t| convert_tensor(t)).collect()
}

/// Convert a boundary attribute into exactly one engine variant.
pub fn convert_attribute(attribute: &Attribute) -> Result<engine::Attribute> {
    let record = attribute.record();
    let value = match attribute.att_type() {
        Some(AttType::Int) => AttrValue::Int(record.int),
        Some(AttType::Ints) => AttrValue::Ints(record.ints.clone()),
        Some(AttType::Float) => AttrValue::Float(record.float),
        Some(AttType::Floats) => AttrValue::Floats(record.floats.clone()),
        Some(AttType::String) => AttrValue::Str(record.string.clone()),
        Some(AttType::Strings) => AttrValue::Strs(record.strings.clone()),
        None => {
            return Err(BridgeError::UnsupportedAttributeType {
                name: record.name.clone(),
                code: record.type_code,
            })
        }
    };
    Ok(engine::Attribute::new(record.name.clone(), value))
}

/// Convert an engine attribute back to a boundary record.
pub fn attribute_to_boundary(attribute: &engine::Attribute) -> Attribute {
    let name = attribute.name.clone();
    match &attribute.value {
        AttrValue::Int(v) => Attribute::int(name, *v),
        AttrValue::Ints(v) => Attribute::ints(name, v.clone()),
        AttrValue::Float(v) => Attribute::float(name, *v),
        AttrValue::Floats(v) => Attribute::floats(name, v.clone()),
        AttrValue::Str(v) => Attribute::string(name, v.clone()),
        AttrValue::Strs(v) => Attribute::strings(name, v.clone()),
    }
}

/// Convert an operator, keeping slot and attribute order.
pub fn convert_operator(operator: &Operator) -> Result<engine::Operator> {
    let mut converted = engine::Operator::create(operator.name(), operator.op_type());

    for (slot, pairs) in [("input", operator.inputs()), ("output", operator.outputs())] {
        let mut seen = HashSet::with_capacity(pairs.len());
        for (tag, tensor) in pairs {
            if !seen.insert(tag.as_str()) {
                return Err(BridgeError::DuplicateTag {
                    operator: operator.name().to_string(),
                    slot,
                    tag: tag.clone(),
                });
            }
            let tensor = convert_tensor(tensor)?;
            let added = if slot == "input" {
                converted.add_input(tag.as_str(), tensor)
            } else {
                converted.add_output(tag.as_str(), tensor)
            };
            added.map_err(|e| BridgeError::InvalidArgument(e.to_string()))?;
        }
    }

    for attribute in operator.attributes() {
        converted.add_attribute(convert_attribute(attribute)?);
    }
    Ok(converted)
}

/// Convert a graph, keeping operator order.
pub fn convert_graph(graph: &Graph) -> Result<engine::Graph> {
    let mut converted = engine::Graph::new(graph.name());
    for operator in graph.operators() {
        converted.add_operator(convert_operator(operator)?);
    }
    trace!(
        "Marshalled graph '{}' with {} operators",
        graph.name(),
        converted.operators.len()
    );
    Ok(converted)
}

/// Boundary view of an engine result tensor.
///
/// Borrows the tensor, so it cannot outlive the [`TensorVec`] it came from.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    tensor: &'a engine::Tensor,
}

/// Expose an engine tensor to the boundary without copying.
pub fn convert_result_tensor(tensor: &engine::Tensor) -> TensorView<'_> {
    TensorView { tensor }
}

impl<'a> TensorView<'a> {
    /// Name.
    pub fn name(&self) -> &'a str {
        &self.tensor.name
    }

    /// Boundary dtype code.
    pub fn dtype_code(&self) -> u32 {
        self.tensor.element_type.code()
    }

    /// Boundary format code.
    pub fn format_code(&self) -> u32 {
        self.tensor.layout.code()
    }

    /// Dimensions in order.
    pub fn shape(&self) -> &'a [u32] {
        &self.tensor.dims
    }

    /// Product of the dimensions.
    pub fn element_count(&self) -> usize {
        self.tensor.element_count()
    }

    /// Bytes of the result, empty if the engine returned a variable.
    pub fn data(&self) -> &'a [u8] {
        self.tensor.bytes()
    }

    /// Build an owned boundary tensor.
    ///
    /// Shares the engine buffer when it is reference-counted, copies it when it
    /// is a view of foreign memory.
    pub fn to_tensor(&self) -> Result<Tensor> {
        let dtype = DType::from_code(self.dtype_code())?;
        let format = Format::from_code(self.format_code())?;
        let mut tensor = Tensor::new_with_shape(self.name(), self.shape(), format, dtype)?;
        match &self.tensor.data {
            TensorData::Variable => {}
            TensorData::Constant(Buffer::Shared(bytes)) => {
                tensor.set_data(HostBuffer::Owned(bytes.clone()))?
            }
            TensorData::Constant(Buffer::View(view)) => {
                tensor.set_data(HostBuffer::from_vec(view.as_slice().to_vec()))?
            }
        }
        Ok(tensor)
    }
}

/// Result tensors delivered by an execution.
#[derive(Debug, Clone, Default)]
pub struct TensorVec {
    tensors: Vec<engine::Tensor>,
}

impl TensorVec {
    /// Wrap engine tensors.
    pub fn new(tensors: Vec<engine::Tensor>) -> Self {
        Self { tensors }
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether there are no tensors.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// View of the tensor at `index`.
    pub fn get(&self, index: usize) -> Option<TensorView<'_>> {
        self.tensors.get(index).map(convert_result_tensor)
    }

    /// Views in order.
    pub fn iter(&self) -> impl Iterator<Item = TensorView<'_>> {
        self.tensors.iter().map(convert_result_tensor)
    }

    /// Owned boundary copies of every tensor.
    pub fn to_tensors(&self) -> Result<Vec<Tensor>> {
        self.iter().map(|view| view.to_tensor()).collect()
    }

    /// Take the engine tensors.
    pub fn into_tensors(self) -> Vec<engine::Tensor> {
        self.tensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nnrt_core::AttributeRecord;
    use std::sync::Arc;

    #[test]
    fn test_owned_buffer_is_shared_not_copied() -> Result<()> {
        let tensor = Tensor::from_f32("w", &[2, 2], Format::NHWC, &[1.0, 2.0, 3.0, 4.0])?;
        let converted = convert_tensor(&tensor)?;

        assert_eq!(converted.dims, [2, 2]);
        assert_eq!(converted.layout, Layout::NHWC);
        assert_eq!(converted.element_type, ElementType::F32);
        assert_eq!(converted.bytes().as_ptr(), tensor.data().as_ptr());
        match (&converted.data, tensor.buffer()) {
            (TensorData::Constant(Buffer::Shared(a)), Some(HostBuffer::Owned(b))) => {
                assert!(Arc::ptr_eq(a, b))
            }
            other => panic!("unexpected data: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_external_buffer_becomes_view() -> Result<()> {
        let backing = [1_u8, 2, 3, 4];
        let mut tensor = Tensor::new_with_shape("ext", &[4], Format::NCHW, DType::Uint8)?;
        unsafe { tensor.set_external_data(backing.as_ptr(), backing.len())? };

        let converted = convert_tensor(&tensor)?;
        assert!(matches!(converted.data, TensorData::Constant(Buffer::View(_))));
        assert_eq!(converted.bytes().as_ptr(), backing.as_ptr());
        Ok(())
    }

    #[test]
    fn test_tensor_without_data_is_variable() -> Result<()> {
        let tensor = Tensor::new_with_shape("x", &[1, 3], Format::NCHW, DType::Int64)?;
        let converted = convert_tensor(&tensor)?;
        assert!(matches!(converted.data, TensorData::Variable));
        assert_eq!(converted.element_type, ElementType::I64);
        Ok(())
    }

    #[test]
    fn test_float_list_record_uses_tag_four() -> Result<()> {
        let attribute = Attribute::from_raw(AttributeRecord {
            name: "scales".into(),
            type_code: 4,
            floats: vec![1.0, 2.0],
            ..AttributeRecord::default()
        });
        let converted = convert_attribute(&attribute)?;
        assert_eq!(converted.value, AttrValue::Floats(vec![1.0, 2.0]));
        assert_eq!(Attribute::floats("scales", vec![1.0]).type_code(), 4);
        Ok(())
    }

    #[test]
    fn test_unknown_attribute_tag_is_rejected() {
        let attribute = Attribute::from_raw(AttributeRecord {
            name: "body".into(),
            type_code: 5,
            ..AttributeRecord::default()
        });
        assert_eq!(
            convert_attribute(&attribute).unwrap_err(),
            BridgeError::UnsupportedAttributeType {
                name: "body".into(),
                code: 5
            }
        );
    }

    #[test]
    fn test_duplicate_tags_are_rejected() -> Result<()> {
        let x = Tensor::new_with_shape("x", &[1], Format::NCHW, DType::Float32)?;
        let op = Operator::new("add", "Add")
            .with_input("A", x.clone())
            .with_input("A", x.clone());
        assert!(matches!(
            convert_operator(&op),
            Err(BridgeError::DuplicateTag { slot: "input", .. })
        ));

        let op = Operator::new("add", "Add")
            .with_input("A", x.clone())
            .with_output("A", x.clone())
            .with_output("A", x);
        assert!(matches!(
            convert_operator(&op),
            Err(BridgeError::DuplicateTag { slot: "output", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_result_view_and_owned_copy() -> Result<()> {
        let bytes: Arc<[u8]> = Arc::from(vec![7_u8; 8]);
        let results = TensorVec::new(vec![engine::Tensor::constant(
            "out",
            vec![2, 4],
            Layout::NCHW,
            ElementType::U8,
            Buffer::Shared(bytes.clone()),
        )]);

        let view = results.get(0).ok_or_else(|| BridgeError::InvalidArgument("empty".into()))?;
        assert_eq!(view.name(), "out");
        assert_eq!(view.dtype_code(), DType::Uint8.code());
        assert_eq!(view.format_code(), Format::NCHW.code());
        assert_eq!(view.shape(), &[2, 4]);
        assert_eq!(view.data().as_ptr(), bytes.as_ptr());
        assert!(results.get(1).is_none());

        let owned = view.to_tensor()?;
        assert_eq!(owned.data().as_ptr(), bytes.as_ptr());
        assert_eq!(owned.shape().dims(), &[2, 4]);
        Ok(())
    }
}
