//! Plan-time attribute modifiers.
//!
//! Modifiers run while the provider computes a plan, before any create or
//! update reaches put.io. They only ever touch attributes whose planned value
//! is unset (JSON `null` or absent): a value the practitioner wrote is left
//! alone.
//!
//! Attributes carrying a [`PlanModifier::Default`] must be optional and
//! computed. The same literal then flows into the create payload, so the
//! state returned by create agrees with the plan unless put.io normalizes the
//! value, in which case put.io's value wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::schema::{AttributeType, Diagnostic, Schema};
use crate::validation::{matches_type, value_type_name};

/// A literal default for one primitive attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// A 64-bit integer default.
    Int64(i64),
    /// A boolean default.
    Bool(bool),
    /// A string default.
    String(String),
}

impl DefaultValue {
    /// The attribute type this default applies to.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Int64(_) => AttributeType::Int64,
            Self::Bool(_) => AttributeType::Bool,
            Self::String(_) => AttributeType::String,
        }
    }

    /// The default as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int64(v) => Value::from(*v),
            Self::Bool(v) => Value::Bool(*v),
            Self::String(v) => Value::String(v.clone()),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
        }
    }
}

/// A plan modifier attached to a schema attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlanModifier {
    /// Keep the prior state's value when the attribute is not configured.
    UseStateForUnknown,
    /// Substitute a literal when the attribute is not configured.
    Default(DefaultValue),
}

impl PlanModifier {
    /// Shorthand for an int64 default.
    pub fn int64_default(value: i64) -> Self {
        Self::Default(DefaultValue::Int64(value))
    }

    /// Shorthand for a bool default.
    pub fn bool_default(value: bool) -> Self {
        Self::Default(DefaultValue::Bool(value))
    }

    /// Shorthand for a string default.
    pub fn string_default(value: impl Into<String>) -> Self {
        Self::Default(DefaultValue::String(value.into()))
    }

    /// Plain text description, suitable for a practitioner.
    pub fn description(&self) -> String {
        match self {
            Self::UseStateForUnknown => {
                "Once set, the value of this attribute in state will not change.".to_string()
            }
            Self::Default(value) => format!("If value is not configured, defaults to {}", value),
        }
    }

    /// Markdown formatted description.
    pub fn markdown_description(&self) -> String {
        match self {
            Self::UseStateForUnknown => self.description(),
            Self::Default(value) => format!("If value is not configured, defaults to `{}`", value),
        }
    }

    /// Run this modifier against one attribute.
    ///
    /// `planned` is the value computed so far (`Value::Null` when unset) and
    /// `prior` the attribute's value in prior state, if any. Returns the new
    /// planned value, or an error diagnostic when a configured value does not
    /// decode as the default's type.
    pub fn modify(
        &self,
        attribute: &str,
        prior: Option<&Value>,
        planned: Value,
    ) -> Result<Value, Diagnostic> {
        match self {
            Self::UseStateForUnknown => match (planned, prior) {
                (Value::Null, Some(prior)) if !prior.is_null() => Ok(prior.clone()),
                (planned, _) => Ok(planned),
            },
            Self::Default(default) => {
                if planned.is_null() {
                    return Ok(default.to_json());
                }
                let expected = default.attribute_type();
                if !matches_type(expected, &planned) {
                    return Err(Diagnostic::error(format!(
                        "Invalid planned value for attribute '{}'",
                        attribute
                    ))
                    .with_detail(format!(
                        "Expected {}, got {}",
                        expected.name(),
                        value_type_name(&planned)
                    ))
                    .with_attribute(attribute));
                }
                Ok(planned)
            }
        }
    }
}

/// Run every attribute's modifier chain over a planned object.
///
/// Attributes are visited in schema order and their modifiers in declaration
/// order. Returns the error diagnostics of every failed modifier; the planned
/// value of a failed attribute is left as it was.
pub fn apply_plan_modifiers(
    schema: &Schema,
    prior_state: Option<&Map<String, Value>>,
    planned: &mut Map<String, Value>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (name, attr) in &schema.block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let prior = prior_state.and_then(|state| state.get(name));
        let mut value = planned.get(name).cloned().unwrap_or(Value::Null);

        for modifier in &attr.plan_modifiers {
            match modifier.modify(name, prior, value.clone()) {
                Ok(next) => value = next,
                Err(diag) => {
                    diagnostics.push(diag);
                    break;
                }
            }
        }

        planned.insert(name.clone(), value);
    }

    diagnostics
}
