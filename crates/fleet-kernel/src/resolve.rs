//! Memoized, cycle-checked resolution of a binding list.
//!
//! A [`Resolver`] holds the definitions, a memo of names already evaluated
//! and the stack of names currently being evaluated. Names are resolved on
//! demand: a binding that nothing references is never evaluated, which
//! matters when the lookup behind an object-field binding is remote.
//!
//! Failures are local to a name. A circular reference or a failed lookup
//! resolves that name to the empty string, records a [`Diagnostic`], and the
//! rest of the batch carries on.

use crate::binding::{Binding, SourceKind, eval_field_path};
use crate::error::{KernelError, LookupError};
use crate::expansion::{Segment, parse, syntax_wrap};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;

/// Fetches objects named by object-field bindings.
///
/// Implementations are scoped to the namespace of the object that owns the
/// bindings. `Ok(None)` means the object does not exist.
#[async_trait]
pub trait FieldSource: Send + Sync {
    async fn lookup(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
    ) -> Result<Option<Value>, LookupError>;
}

/// A source with no objects. Object-field bindings against it resolve empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObjects;

#[async_trait]
impl FieldSource for NoObjects {
    async fn lookup(&self, _: &str, _: &str, _: &str) -> Result<Option<Value>, LookupError> {
        Ok(None)
    }
}

/// Something that went wrong resolving one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The name was reached again while it was being evaluated.
    Circular { name: String },
    /// An object-field binding could not produce a value.
    Unresolvable { name: String, reason: String },
}

impl Diagnostic {
    pub fn name(&self) -> &str {
        match self {
            Diagnostic::Circular { name } | Diagnostic::Unresolvable { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Circular { name } => write!(f, "circular definition of binding {name:?}"),
            Diagnostic::Unresolvable { name, reason } => {
                write!(f, "unable to resolve binding {name:?}: {reason}")
            }
        }
    }
}

/// A binding name with its evaluated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub name: String,
    pub value: String,
}

impl ResolvedBinding {
    /// Materialize as a literal binding.
    pub fn into_literal(self) -> Binding {
        Binding::literal(self.name, self.value)
    }
}

pub struct Resolver<'a, S: FieldSource + ?Sized> {
    definitions: &'a [Binding],
    source: &'a S,
    memo: BTreeMap<String, String>,
    stack: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, S: FieldSource + ?Sized> Resolver<'a, S> {
    pub fn new(definitions: &'a [Binding], source: &'a S) -> Self {
        Self {
            definitions,
            source,
            memo: BTreeMap::new(),
            stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Seed an ambient value, e.g. the cluster's own name.
    ///
    /// A seeded name is treated as already resolved, so it takes precedence
    /// over any definition of the same name.
    pub fn seed(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.memo.insert(name.into(), value.into());
        self
    }

    /// Definitions are well-formed (exactly one source each).
    pub fn validate(&self) -> Result<(), KernelError> {
        crate::binding::validate(self.definitions)
    }

    /// Diagnostics recorded so far, in the order they happened.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Value of `name` if it has been resolved or seeded.
    pub fn memoized(&self, name: &str) -> Option<&str> {
        self.memo.get(name).map(String::as_str)
    }

    /// Resolve `name`. `None` means nothing defines it.
    pub fn resolve<'s>(&'s mut self, name: &'s str) -> BoxFuture<'s, Option<String>> {
        Box::pin(async move {
            if let Some(value) = self.memo.get(name) {
                return Some(value.clone());
            }
            let defs = self.definitions;
            let binding = defs.iter().find(|b| b.name == name)?;

            if self.stack.iter().any(|entry| entry == name) {
                let diagnostic = Diagnostic::Circular {
                    name: name.to_string(),
                };
                tracing::debug!(binding = name, stack = ?self.stack, "{diagnostic}");
                self.diagnostics.push(diagnostic);
                self.memo.insert(name.to_string(), String::new());
                return Some(String::new());
            }

            self.stack.push(name.to_string());
            let value = match self.evaluate(binding).await {
                Ok(value) => value,
                Err(reason) => {
                    let diagnostic = Diagnostic::Unresolvable {
                        name: name.to_string(),
                        reason,
                    };
                    tracing::debug!(binding = name, "{diagnostic}; using empty string");
                    self.diagnostics.push(diagnostic);
                    String::new()
                }
            };
            self.stack.pop();

            self.memo.insert(name.to_string(), value.clone());
            Some(value)
        })
    }

    /// Resolve every definition, in definition order.
    pub async fn resolve_all(&mut self) -> Vec<ResolvedBinding> {
        let defs = self.definitions;
        let mut resolved = Vec::with_capacity(defs.len());
        for binding in defs {
            if resolved
                .iter()
                .any(|r: &ResolvedBinding| r.name == binding.name)
            {
                continue;
            }
            let value = self.resolve(&binding.name).await.unwrap_or_default();
            resolved.push(ResolvedBinding {
                name: binding.name.clone(),
                value,
            });
        }
        resolved
    }

    /// Expand `template`, resolving each reference through this resolver.
    ///
    /// Names nothing defines are passed through as `$(name)`.
    pub async fn expand(&mut self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        for segment in parse(template) {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Reference(name) => match self.resolve(&name).await {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&syntax_wrap(&name)),
                },
            }
        }
        out
    }

    /// A snapshot of the memo as a synchronous mapping for [`crate::expand`].
    pub fn mapping(&self) -> impl Fn(&str) -> String + '_ {
        move |name| {
            self.memo
                .get(name)
                .cloned()
                .unwrap_or_else(|| syntax_wrap(name))
        }
    }

    async fn evaluate(&mut self, binding: &'a Binding) -> Result<String, String> {
        match binding.source_kind().map_err(|e| e.to_string())? {
            SourceKind::Literal(value) => Ok(self.expand(value).await),
            SourceKind::ObjectField(selector) => {
                let api_version = self.expand(&selector.api_version).await;
                let kind = self.expand(&selector.kind).await;
                let name = self.expand(&selector.name).await;
                let field_path = self.expand(&selector.field_path).await;

                let object = self
                    .source
                    .lookup(&api_version, &kind, &name)
                    .await
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("{kind} {name:?} not found"))?;
                eval_field_path(&object, &field_path)
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("no value at {field_path:?} in {kind} {name:?}"))
            }
        }
    }
}
