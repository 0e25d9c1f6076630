use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::FunctionExpression;

use super::Value;

/// A function written in the checked language.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub node: Arc<FunctionExpression>,
    pub parameters: Vec<Value>,
    pub parameter_names: Vec<String>,
    pub variadic: bool,
    /// Declared return type, if any.
    pub return_type: Option<Value>,
    /// Return value inferred when the function expression was checked.
    pub inferred_return: Value,
    pub captured: BTreeMap<String, Value>,
    /// Receiver the function was created with, when it is a method.
    pub receiver: Option<Value>,
}

impl FunctionValue {
    pub fn result(&self) -> &Value {
        self.return_type.as_ref().unwrap_or(&self.inferred_return)
    }

    pub fn non_variadic_parameter_count(&self) -> usize {
        if self.variadic {
            self.parameters.len().saturating_sub(1)
        } else {
            self.parameters.len()
        }
    }

    pub(crate) fn captures_mutable_values(&self) -> bool {
        self.captured.values().any(Value::is_mutable)
    }
}

/// Two function values are equal when they come from the same function node and agree on
/// everything inferred for it.
impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.node.id == other.node.id
            && self.parameters == other.parameters
            && self.parameter_names == other.parameter_names
            && self.variadic == other.variadic
            && self.return_type == other.return_type
            && self.inferred_return == other.inferred_return
            && self.captured == other.captured
            && self.receiver == other.receiver
    }
}

impl fmt::Display for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (index, (name, parameter)) in self
            .parameter_names
            .iter()
            .zip(self.parameters.iter())
            .enumerate()
        {
            if index > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && index + 1 == self.parameters.len() {
                f.write_str("...")?;
            }
            write!(f, "{name} {parameter}")?;
        }
        write!(f, ") {}", self.result())
    }
}

/// A function provided by the host, known only through its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct HostFunction {
    pub name: String,
    pub parameters: Vec<Value>,
    /// Type of the elements accepted after the fixed parameters.
    pub variadic: Option<Value>,
    pub result: Value,
}

impl HostFunction {
    pub fn new(name: impl Into<String>, parameters: Vec<Value>, result: Value) -> Self {
        Self {
            name: name.into(),
            parameters,
            variadic: None,
            result,
        }
    }

    pub fn variadic(mut self, element: Value) -> Self {
        self.variadic = Some(element);
        self
    }
}

impl fmt::Display for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut parameters = self.parameters.iter().map(ToString::to_string).collect::<Vec<_>>();
        if let Some(element) = &self.variadic {
            parameters.push(format!("...{element}"));
        }
        write!(f, "{}) {}", parameters.join(", "), self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExpressionKind;
    use crate::builder::AstBuilder;
    use crate::value::ANY_INT;

    fn function_value(b: &AstBuilder) -> FunctionValue {
        let expression = b.function(vec![("n", None)], None, vec![]);
        let ExpressionKind::Function(node) = expression.kind else {
            unreachable!("builder returns a function expression");
        };
        FunctionValue {
            node,
            parameters: vec![ANY_INT],
            parameter_names: vec!["n".to_string()],
            variadic: false,
            return_type: None,
            inferred_return: Value::Nil,
            captured: BTreeMap::new(),
            receiver: None,
        }
    }

    #[test]
    fn equality_follows_the_function_node_and_its_inferred_parts() {
        let b = AstBuilder::new();
        let function = function_value(&b);
        assert_eq!(function, function.clone());

        let mut bound = function.clone();
        bound.receiver = Some(Value::Int(Some(1)));
        assert_ne!(function, bound);

        let other_node = function_value(&b);
        assert_ne!(function, other_node);
    }
}
