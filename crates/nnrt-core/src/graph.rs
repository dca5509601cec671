//! Boundary graph: a named, ordered list of operators.

use crate::operator::Operator;

/// Computation graph submitted for compilation.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    operators: Vec<Operator>,
}

impl Graph {
    /// Empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: Vec::new(),
        }
    }

    /// Append an operator, builder style.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operators.push(operator);
        self
    }

    /// Append an operator.
    pub fn add_operator(&mut self, operator: Operator) {
        self.operators.push(operator);
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operators in submission order.
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether the graph has no operators.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}
