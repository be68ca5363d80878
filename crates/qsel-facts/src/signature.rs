//! Rule-signature parsing: variable extraction and query assembly.
//!
//! A rule looks like `executable(N, Impl) :- body...`. Only the head is
//! parsed here; the body stays opaque. Variables follow the usual logic
//! convention: a parameter segment whose first character is an uppercase
//! ASCII letter or `_`.

use qsel_model::ParameterBindings;

use crate::error::{FactError, FactResult};

/// Extract the variable names of a rule head, left to right.
///
/// Order is significant: positional binding in [`assemble_query`] relies
/// on it.
pub fn extract_variables(rule_text: &str) -> FactResult<Vec<String>> {
    let (_, segments) = split_signature(head_of(rule_text))?;
    Ok(segments
        .into_iter()
        .filter(|s| is_variable(s))
        .collect())
}

/// Assemble a ground query from a rule and parameter bindings.
///
/// The head is rebuilt structurally: each parameter segment is either kept
/// verbatim (literals) or replaced wholesale by its bound value
/// (variables). Rebuilding instead of substring substitution makes
/// variables whose names prefix one another (`A` vs `AB`) impossible to
/// corrupt. The result carries the statement terminator.
///
/// With `skip_first`, the first variable is left unbound; estimator rules
/// solve for it rather than take it as input.
pub fn assemble_query(
    rule_text: &str,
    bindings: &ParameterBindings,
    skip_first: bool,
) -> FactResult<String> {
    let (name, segments) = split_signature(head_of(rule_text))?;

    let mut seen_variables = 0usize;
    let mut rebuilt = Vec::with_capacity(segments.len());
    for segment in &segments {
        if !is_variable(segment) {
            rebuilt.push(segment.clone());
            continue;
        }
        seen_variables += 1;
        if skip_first && seen_variables == 1 {
            rebuilt.push(segment.clone());
            continue;
        }
        match bindings.get(segment.as_str()) {
            Some(value) => rebuilt.push(value.clone()),
            None => {
                return Err(FactError::UnboundVariable {
                    rule: name,
                    variable: segment.clone(),
                });
            }
        }
    }

    Ok(format!("{}({}).", name, rebuilt.join(",")))
}

/// Head of a rule: everything before `:-`, or the whole text for facts.
fn head_of(rule_text: &str) -> &str {
    rule_text
        .split_once(":-")
        .map_or(rule_text, |(head, _)| head)
        .trim()
}

/// Split a head into predicate name and top-level parameter segments.
///
/// Commas inside nested parentheses do not split; `foo(bar(X, Y), Z)` has
/// the two segments `bar(X, Y)` and `Z`.
fn split_signature(head: &str) -> FactResult<(String, Vec<String>)> {
    let open = head
        .find('(')
        .ok_or_else(|| FactError::MalformedSignature(head.to_string()))?;
    let close = head
        .rfind(')')
        .filter(|&c| c > open)
        .ok_or_else(|| FactError::MalformedSignature(head.to_string()))?;

    let name = head[..open].trim();
    if name.is_empty() {
        return Err(FactError::MalformedSignature(head.to_string()));
    }

    let params = &head[open + 1..close];
    if params.trim().is_empty() {
        return Ok((name.to_string(), Vec::new()));
    }

    let mut segments = Vec::new();
    let mut depth = 0u32;
    let mut start = 0usize;
    for (i, c) in params.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(params[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(params[start..].trim().to_string());

    Ok((name.to_string(), segments))
}

/// A segment is a variable iff its first character is uppercase or `_`.
fn is_variable(segment: &str) -> bool {
    segment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
}
