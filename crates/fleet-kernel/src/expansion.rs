//! Variable expansion over `$(name)` references.
//!
//! Syntax:
//! - `$(name)` is replaced by the value the mapping gives for `name`
//! - `$$` is an escaped `$`
//! - a `$` that starts neither form (including an unterminated `$(`, or a
//!   trailing `$`) is copied through verbatim
//!
//! Expansion is a single pass. A mapping may return text that itself contains
//! references; those are left as they are, which is how a value is deferred to
//! a later evaluator (for instance one running inside the target cluster).

use std::collections::BTreeMap;

const OPERATOR: u8 = b'$';
const OPENER: u8 = b'(';
const CLOSER: u8 = b')';

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied to the output as-is.
    Literal(String),
    /// A `$(name)` reference; holds the name.
    Reference(String),
}

/// Wrap a name in reference syntax, i.e. `name` → `$(name)`.
pub fn syntax_wrap(name: &str) -> String {
    format!("$({name})")
}

/// Split `input` into literal text and references.
///
/// Adjacent literal text is coalesced, so rendering the segments back with an
/// identity mapping for references reproduces the expansion of `input`.
pub fn parse(input: &str) -> Vec<Segment> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut checkpoint = 0;
    let mut cursor = 0;

    while cursor < bytes.len() {
        if bytes[cursor] != OPERATOR || cursor + 1 >= bytes.len() {
            cursor += 1;
            continue;
        }

        text.push_str(&input[checkpoint..cursor]);
        match bytes[cursor + 1] {
            OPERATOR => {
                text.push('$');
                cursor += 2;
            }
            OPENER => match input[cursor + 2..].bytes().position(|b| b == CLOSER) {
                Some(offset) => {
                    let close = cursor + 2 + offset;
                    if !text.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Reference(input[cursor + 2..close].to_string()));
                    cursor = close + 1;
                }
                None => {
                    text.push_str("$(");
                    cursor += 2;
                }
            },
            _ => {
                // Not an expression; the following character is copied on
                // the next checkpoint.
                text.push('$');
                cursor += 1;
            }
        }
        checkpoint = cursor;
    }

    text.push_str(&input[checkpoint..]);
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
    segments
}

/// Names referenced by `input`, in order of first appearance.
pub fn references(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in parse(input) {
        if let Segment::Reference(name) = segment
            && !names.contains(&name)
        {
            names.push(name);
        }
    }
    names
}

/// Expand `input`, replacing each reference with `mapping(name)`.
pub fn expand(input: &str, mut mapping: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    for segment in parse(input) {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Reference(name) => out.push_str(&mapping(&name)),
        }
    }
    out
}

/// A mapping that looks names up in each map in turn, and passes unknown
/// names through in reference syntax.
pub fn mapping_for<'a>(
    maps: &'a [&'a BTreeMap<String, String>],
) -> impl FnMut(&str) -> String + 'a {
    move |name| {
        maps.iter()
            .find_map(|vars| vars.get(name).cloned())
            .unwrap_or_else(|| syntax_wrap(name))
    }
}
