//! Algorithm implementations, declarative rules and parameters.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::circuit::CircuitLanguage;

/// Unique identifier for an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationId(pub Uuid);

impl ImplementationId {
    /// Create a new random implementation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImplementationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque rule consumed by the external logic evaluator.
///
/// qsel never interprets rule semantics; it only parses the head signature
/// to extract variables and bind them positionally (see `qsel-facts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Predicate name, e.g. `executable`.
    pub name: String,

    /// Full rule text, e.g. `executable(N, shor) :- N > 4.`.
    pub text: String,
}

impl Rule {
    /// Create a rule from its predicate name and full text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Declared type of an implementation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Free text.
    String,
}

/// A parameter declared by an implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name; matches a rule variable when rules reference it.
    pub name: String,

    /// Declared type.
    pub parameter_type: ParameterType,

    /// Optional free-text restriction, e.g. `N > 2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restriction: Option<String>,
}

impl Parameter {
    /// Create a parameter declaration.
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            restriction: None,
        }
    }

    /// Attach a restriction.
    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restriction = Some(restriction.into());
        self
    }
}

/// A supplied value for a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// Name of the parameter being bound.
    pub name: String,

    /// Value as text; the evaluator interprets it per the declared type.
    pub value: String,
}

impl ParameterValue {
    /// Create a parameter value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Name → value bindings used when evaluating rules.
pub type ParameterBindings = FxHashMap<String, String>;

/// An executable implementation of a quantum algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    /// Unique implementation identifier.
    pub id: ImplementationId,

    /// Human-readable name.
    pub name: String,

    /// Identifier of the algorithm this implements.
    pub algorithm_id: Uuid,

    /// Language the implementation's circuit is written in.
    pub language: CircuitLanguage,

    /// SDK the implementation requires for execution.
    pub required_sdk: String,

    /// Rule deciding whether the implementation suits a given input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_rule: Option<Rule>,

    /// Estimator rule for circuit width as a function of the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_rule: Option<Rule>,

    /// Estimator rule for circuit depth as a function of the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_rule: Option<Rule>,

    /// Declared input parameters.
    pub parameters: Vec<Parameter>,
}

impl Implementation {
    /// Create an implementation descriptor.
    pub fn new(
        name: impl Into<String>,
        algorithm_id: Uuid,
        language: CircuitLanguage,
        required_sdk: impl Into<String>,
    ) -> Self {
        Self {
            id: ImplementationId::new(),
            name: name.into(),
            algorithm_id,
            language,
            required_sdk: required_sdk.into(),
            selection_rule: None,
            width_rule: None,
            depth_rule: None,
            parameters: Vec::new(),
        }
    }

    /// Set the selection rule.
    pub fn with_selection_rule(mut self, rule: Rule) -> Self {
        self.selection_rule = Some(rule);
        self
    }

    /// Set the width estimator rule.
    pub fn with_width_rule(mut self, rule: Rule) -> Self {
        self.width_rule = Some(rule);
        self
    }

    /// Set the depth estimator rule.
    pub fn with_depth_rule(mut self, rule: Rule) -> Self {
        self.depth_rule = Some(rule);
        self
    }

    /// Declare a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implementation_builder() {
        let implementation = Implementation::new(
            "shor-general",
            Uuid::new_v4(),
            CircuitLanguage::OpenQasm2,
            "qiskit",
        )
        .with_selection_rule(Rule::new("executable", "executable(N, shor) :- N > 4."))
        .with_parameter(Parameter::new("N", ParameterType::Integer).with_restriction("N > 2"));

        assert_eq!(implementation.required_sdk, "qiskit");
        assert!(implementation.selection_rule.is_some());
        assert_eq!(implementation.parameters.len(), 1);
        assert_eq!(
            implementation.parameters[0].restriction.as_deref(),
            Some("N > 2")
        );
    }
}
