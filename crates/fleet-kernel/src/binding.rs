//! Bindings: named value providers.
//!
//! A binding gives a name whose value may be mentioned elsewhere as
//! `$(name)`. The value is either a literal (itself subject to expansion) or
//! a field extracted from some other object.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A name and where its value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    #[serde(flatten)]
    pub source: BindingSource,
}

/// Union of the places a value can come from. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_field_ref: Option<ObjectFieldSelector>,
}

/// Points at a field of an object in the binding's namespace.
///
/// Every field is expanded before the lookup, so a selector may mention other
/// bindings (e.g. `name: $(CLUSTER_NAME)-config`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFieldSelector {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    /// JSON pointer into the object, e.g. `/data/region`.
    pub field_path: String,
}

/// The validated form of a [`BindingSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Literal(&'a str),
    ObjectField(&'a ObjectFieldSelector),
}

impl Binding {
    /// A literal binding.
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: BindingSource {
                value: Some(value.into()),
                object_field_ref: None,
            },
        }
    }

    /// A binding that reads `field_path` from the named object.
    pub fn object_field(name: impl Into<String>, selector: ObjectFieldSelector) -> Self {
        Self {
            name: name.into(),
            source: BindingSource {
                value: None,
                object_field_ref: Some(selector),
            },
        }
    }

    /// Which variant this binding uses, or an error when neither or both are set.
    pub fn source_kind(&self) -> Result<SourceKind<'_>, KernelError> {
        match (&self.source.value, &self.source.object_field_ref) {
            (Some(value), None) => Ok(SourceKind::Literal(value)),
            (None, Some(selector)) => Ok(SourceKind::ObjectField(selector)),
            _ => Err(KernelError::UnknownBindingForm {
                name: self.name.clone(),
            }),
        }
    }
}

/// Check every binding in a list has a usable source.
pub fn validate(bindings: &[Binding]) -> Result<(), KernelError> {
    for binding in bindings {
        binding.source_kind()?;
    }
    Ok(())
}

/// Extract the value at `path` from `object`.
///
/// `path` is an RFC 6901 pointer; the empty path selects the whole object.
/// Strings come back verbatim; anything else is rendered as JSON text.
/// Returns `Ok(None)` when the pointer is well formed but nothing is there.
pub fn eval_field_path(object: &Value, path: &str) -> Result<Option<String>, KernelError> {
    if !path.is_empty() && !path.starts_with('/') {
        return Err(KernelError::InvalidFieldPath {
            path: path.to_string(),
            reason: "JSON pointer must be empty or start with '/'".to_string(),
        });
    }
    Ok(object.pointer(path).map(render_value))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
