//! Engine attributes, operators and graphs.

use crate::error::{EngineError, Result};
use crate::tensor::Tensor;

/// Attribute payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integer.
    Int(i64),
    /// Integer list.
    Ints(Vec<i64>),
    /// Float.
    Float(f32),
    /// Float list.
    Floats(Vec<f32>),
    /// String.
    Str(String),
    /// String list.
    Strs(Vec<String>),
}

/// Named attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Name.
    pub name: String,
    /// Payload.
    pub value: AttrValue,
}

impl Attribute {
    /// Build an attribute.
    pub fn new(name: impl Into<String>, value: AttrValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Engine operator.
///
/// Tags are unique within the inputs and within the outputs.
#[derive(Debug, Clone)]
pub struct Operator {
    name: String,
    op_type: String,
    inputs: Vec<(String, Tensor)>,
    outputs: Vec<(String, Tensor)>,
    attributes: Vec<Attribute>,
}

impl Operator {
    /// Create an operator with no slots.
    pub fn create(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Attach an input; fails if `tag` is already used by an input.
    pub fn add_input(&mut self, tag: impl Into<String>, tensor: Tensor) -> Result<()> {
        let tag = tag.into();
        if self.inputs.iter().any(|(t, _)| *t == tag) {
            return Err(EngineError::InvalidParam(format!(
                "duplicate input tag '{}' on operator '{}'",
                tag, self.name
            )));
        }
        self.inputs.push((tag, tensor));
        Ok(())
    }

    /// Attach an output; fails if `tag` is already used by an output.
    pub fn add_output(&mut self, tag: impl Into<String>, tensor: Tensor) -> Result<()> {
        let tag = tag.into();
        if self.outputs.iter().any(|(t, _)| *t == tag) {
            return Err(EngineError::InvalidParam(format!(
                "duplicate output tag '{}' on operator '{}'",
                tag, self.name
            )));
        }
        self.outputs.push((tag, tensor));
        Ok(())
    }

    /// Attach an attribute.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type identifier.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// Inputs in order.
    pub fn inputs(&self) -> &[(String, Tensor)] {
        &self.inputs
    }

    /// Outputs in order.
    pub fn outputs(&self) -> &[(String, Tensor)] {
        &self.outputs
    }

    /// Attributes in order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

/// Engine graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Name.
    pub name: String,
    /// Operators in insertion order.
    pub operators: Vec<Operator>,
}

impl Graph {
    /// Empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: Vec::new(),
        }
    }

    /// Append an operator.
    pub fn add_operator(&mut self, operator: Operator) {
        self.operators.push(operator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementType, Layout};

    fn scalar(name: &str) -> Tensor {
        Tensor::variable(name, vec![1], Layout::NCHW, ElementType::F32)
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let mut op = Operator::create("add_0", "Add");
        assert!(op.add_input("A", scalar("a")).is_ok());
        assert!(op.add_input("B", scalar("b")).is_ok());
        assert!(matches!(
            op.add_input("A", scalar("c")),
            Err(EngineError::InvalidParam(_))
        ));
        assert!(op.add_output("A", scalar("out")).is_ok());
        assert!(op.add_output("A", scalar("out2")).is_err());
        assert_eq!(op.inputs().len(), 2);
        assert_eq!(op.outputs().len(), 1);
    }

    #[test]
    fn test_graph_keeps_order() {
        let mut graph = Graph::new("g");
        for i in 0..4 {
            graph.add_operator(Operator::create(format!("op{i}"), "Identity"));
        }
        let names: Vec<_> = graph.operators.iter().map(Operator::name).collect();
        assert_eq!(names, ["op0", "op1", "op2", "op3"]);
    }
}
