//! Boundary operator: a typed node with tagged tensor slots and attributes.

use crate::attribute::Attribute;
use crate::tensor::Tensor;

/// One node of a boundary graph.
///
/// Slots are kept in insertion order. Tags are not checked for uniqueness
/// here; the marshaller rejects duplicates when the operator crosses into the
/// engine.
#[derive(Debug, Clone)]
pub struct Operator {
    name: String,
    op_type: String,
    inputs: Vec<(String, Tensor)>,
    outputs: Vec<(String, Tensor)>,
    attributes: Vec<Attribute>,
}

impl Operator {
    /// Start an operator with no slots or attributes.
    pub fn new(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Append an input slot.
    pub fn with_input(mut self, tag: impl Into<String>, tensor: Tensor) -> Self {
        self.inputs.push((tag.into(), tensor));
        self
    }

    /// Append an output slot.
    pub fn with_output(mut self, tag: impl Into<String>, tensor: Tensor) -> Self {
        self.outputs.push((tag.into(), tensor));
        self
    }

    /// Append an attribute.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append an input slot in place.
    pub fn push_input(&mut self, tag: impl Into<String>, tensor: Tensor) {
        self.inputs.push((tag.into(), tensor));
    }

    /// Append an output slot in place.
    pub fn push_output(&mut self, tag: impl Into<String>, tensor: Tensor) {
        self.outputs.push((tag.into(), tensor));
    }

    /// Append an attribute in place.
    pub fn push_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type identifier, e.g. `"Conv"`.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// Input slots in order.
    pub fn inputs(&self) -> &[(String, Tensor)] {
        &self.inputs
    }

    /// Output slots in order.
    pub fn outputs(&self) -> &[(String, Tensor)] {
        &self.outputs
    }

    /// Attributes in order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look an attribute up by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DType, Format};

    #[test]
    fn test_builder_keeps_order_and_duplicates() -> crate::Result<()> {
        let x = Tensor::new_with_shape("x", &[1, 4], Format::NCHW, DType::Float32)?;
        let y = Tensor::new_with_shape("y", &[1, 4], Format::NCHW, DType::Float32)?;
        let op = Operator::new("relu_0", "Relu")
            .with_input("X", x.clone())
            .with_input("X", x)
            .with_output("Y", y)
            .with_attribute(Attribute::float("alpha", 0.1));

        let tags: Vec<&str> = op.inputs().iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tags, ["X", "X"]);
        assert_eq!(op.outputs()[0].1.name(), "y");
        assert_eq!(op.attribute("alpha").map(|a| a.type_code()), Some(1));
        assert!(op.attribute("beta").is_none());
        Ok(())
    }
}
