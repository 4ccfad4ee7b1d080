//! Label selectors and cluster selection.
//!
//! A module's selector is optional. Absent selects nothing; present but empty
//! selects everything; otherwise every `matchLabels` entry and every
//! `matchExpressions` requirement must hold.

use crate::error::KernelError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// What a selector picks out, before looking at any labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Nothing,
    Everything,
    Matching(&'a LabelSelector),
}

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Check keys, values and operator/value combinations are well formed.
    pub fn validate(&self) -> Result<(), KernelError> {
        for (key, value) in &self.match_labels {
            validate_key(key)?;
            validate_value(value)?;
        }
        for requirement in &self.match_expressions {
            validate_key(&requirement.key)?;
            match requirement.operator {
                Operator::In | Operator::NotIn if requirement.values.is_empty() => {
                    return Err(KernelError::InvalidSelector(format!(
                        "{:?} requirement on {:?} needs at least one value",
                        requirement.operator, requirement.key
                    )));
                }
                Operator::Exists | Operator::DoesNotExist if !requirement.values.is_empty() => {
                    return Err(KernelError::InvalidSelector(format!(
                        "{:?} requirement on {:?} must not have values",
                        requirement.operator, requirement.key
                    )));
                }
                _ => {}
            }
            for value in &requirement.values {
                validate_value(value)?;
            }
        }
        Ok(())
    }

    /// Whether `labels` satisfies every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
            && self
                .match_expressions
                .iter()
                .all(|requirement| requirement.matches(labels))
    }
}

impl LabelSelectorRequirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let current = labels.get(&self.key);
        match self.operator {
            Operator::In => current.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => current.is_none_or(|v| !self.values.contains(v)),
            Operator::Exists => current.is_some(),
            Operator::DoesNotExist => current.is_none(),
        }
    }
}

/// Validate an optional selector and classify it.
pub fn selection(selector: Option<&LabelSelector>) -> Result<Selection<'_>, KernelError> {
    match selector {
        None => Ok(Selection::Nothing),
        Some(selector) if selector.is_empty() => Ok(Selection::Everything),
        Some(selector) => {
            selector.validate()?;
            Ok(Selection::Matching(selector))
        }
    }
}

/// Whether a set of labels is selected by an optional selector.
pub fn matches(
    selector: Option<&LabelSelector>,
    labels: &BTreeMap<String, String>,
) -> Result<bool, KernelError> {
    Ok(match selection(selector)? {
        Selection::Nothing => false,
        Selection::Everything => true,
        Selection::Matching(selector) => selector.matches(labels),
    })
}

/// Pick the items whose labels are selected, preserving order.
pub fn select<'c, T>(
    selector: Option<&LabelSelector>,
    items: &'c [T],
    labels: impl Fn(&T) -> &BTreeMap<String, String>,
) -> Result<Vec<&'c T>, KernelError> {
    let selection = selection(selector)?;
    Ok(items
        .iter()
        .filter(|item| match selection {
            Selection::Nothing => false,
            Selection::Everything => true,
            Selection::Matching(selector) => selector.matches(labels(item)),
        })
        .collect())
}

fn validate_key(key: &str) -> Result<(), KernelError> {
    static KEY: OnceLock<Regex> = OnceLock::new();
    let re = KEY.get_or_init(|| {
        Regex::new(
            r"^([a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*/)?[A-Za-z0-9]([-A-Za-z0-9_.]{0,61}[A-Za-z0-9])?$",
        )
        .unwrap_or_else(|e| unreachable!("label key pattern is valid: {e}"))
    });
    if key.len() > 317 || !re.is_match(key) {
        return Err(KernelError::InvalidSelector(format!(
            "invalid label key {key:?}"
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), KernelError> {
    static VALUE: OnceLock<Regex> = OnceLock::new();
    let re = VALUE.get_or_init(|| {
        Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]{0,61})?[A-Za-z0-9])?$")
            .unwrap_or_else(|e| unreachable!("label value pattern is valid: {e}"))
    });
    if !re.is_match(value) {
        return Err(KernelError::InvalidSelector(format!(
            "invalid label value {value:?}"
        )));
    }
    Ok(())
}
