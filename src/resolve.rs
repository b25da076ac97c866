//! Slot resolution: turn parsed slots into replacement text.
//!
//! Resolution happens in two phases per source (see [`crate::source`]):
//!
//! 1. **Text phase** ([`substitute_env_slots`]): slots made only of
//!    environment variables are replaced in the raw source text, before the
//!    text is decoded.
//! 2. **Tree phase** ([`resolve_self_references`]): slots with at least one
//!    `self.` candidate are replaced in the decoded fragment's string leaves,
//!    reading from the configuration merged so far plus the fragment itself.
//!
//! A slot that resolves to nothing is left in place and reported as a
//! [`SlotDiagnostic`]. That is never an error: type validation downstream is
//! the backstop.

use std::fmt;

use serde_json::Value;

use crate::error::LayerfigError;
use crate::merge::deep_merge;
use crate::parser::{Quoting, quoting_at};
use crate::slot::{self, Reference, SlotExpression};
use crate::types::{RuntimeEnv, Tree};

/// An unresolved slot, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotDiagnostic {
    /// A single environment variable was not defined.
    SingleVariable { slot: String, name: String },
    /// None of several environment variables were defined.
    MultiVariable { slot: String, names: Vec<String> },
    /// A chain with at least one self-reference found nothing. `references`
    /// lists every candidate, self-references as `self.<path>`.
    SelfReference {
        slot: String,
        references: Vec<String>,
    },
}

impl SlotDiagnostic {
    fn for_slot(expr: &SlotExpression) -> Self {
        let slot = expr.full_match.clone();
        if expr.is_self_referencing() {
            let references = expr
                .references
                .iter()
                .map(|r| match r {
                    Reference::EnvVar { name } => name.clone(),
                    Reference::SelfReference { path } => format!("self.{path}"),
                })
                .collect();
            return SlotDiagnostic::SelfReference { slot, references };
        }
        let mut names: Vec<String> = expr
            .env_var_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if names.len() == 1 {
            let name = names.remove(0);
            SlotDiagnostic::SingleVariable { slot, name }
        } else {
            SlotDiagnostic::MultiVariable { slot, names }
        }
    }

    /// The slot text that was left in place.
    pub fn slot(&self) -> &str {
        match self {
            SlotDiagnostic::SingleVariable { slot, .. }
            | SlotDiagnostic::MultiVariable { slot, .. }
            | SlotDiagnostic::SelfReference { slot, .. } => slot,
        }
    }

    fn emit(&self) {
        let kind = match self {
            SlotDiagnostic::SingleVariable { .. } => "single_variable",
            SlotDiagnostic::MultiVariable { .. } => "multi_variable",
            SlotDiagnostic::SelfReference { .. } => "self_reference",
        };
        tracing::warn!(target: "layerfig::slot", kind, slot = self.slot(), "{self}");
    }
}

impl fmt::Display for SlotDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotDiagnostic::SingleVariable { name, .. } => write!(
                f,
                "The value for the slot \"{name}\" is not defined in the runtime environment. The slot will not be replaced."
            ),
            SlotDiagnostic::MultiVariable { names, .. } => write!(
                f,
                "None of the variables \"{}\" are defined in the runtime environment. The slot will not be replaced.",
                names.join("\", \"")
            ),
            SlotDiagnostic::SelfReference { slot, references } => write!(
                f,
                "The slot \"{slot}\" could not be resolved from \"{}\". Self-references only see sources added before this one. The slot will not be replaced.",
                references.join("\", \"")
            ),
        }
    }
}

/// Result of substituting the slots of one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Substitution {
    pub text: String,
    pub diagnostics: Vec<SlotDiagnostic>,
}

/// Resolve one slot against the runtime environment and the tree built so far.
///
/// Candidates are tried left to right. An environment variable wins when it
/// is defined and non-empty; a self-reference wins when the path holds a
/// string, number or boolean. The fallback is used when nothing wins. The
/// result is always text: no type coercion happens here.
pub fn resolve(slot: &SlotExpression, env: &RuntimeEnv, partial: &Tree) -> Option<String> {
    resolve_candidates(slot, env, partial, None).map(|resolved| match resolved {
        Resolved::Reference(text) | Resolved::Fallback(text) => text,
    })
}

/// Where a slot's replacement came from. Reference values are raw data and
/// get escaped for the surrounding text; the fallback is cut from that text
/// and is already in its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Reference(String),
    Fallback(String),
}

/// With `pending` set, a self-reference whose target still holds a
/// self-referencing slot for that prefix does not win.
fn resolve_candidates(
    slot: &SlotExpression,
    env: &RuntimeEnv,
    partial: &Tree,
    pending: Option<char>,
) -> Option<Resolved> {
    for reference in &slot.references {
        let found = match reference {
            Reference::EnvVar { name } => env
                .get(name)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            Reference::SelfReference { path } => lookup_path(partial, path)
                .and_then(scalar_text)
                .filter(|text| pending.is_none_or(|prefix| !holds_self_slot(text, prefix))),
        };
        if let Some(text) = found {
            return Some(Resolved::Reference(text));
        }
    }
    slot.fallback.clone().map(Resolved::Fallback)
}

fn holds_self_slot(text: &str, prefix: char) -> bool {
    slot::has_slot(text, prefix)
        && slot::scan(text, prefix)
            .is_ok_and(|found| found.iter().any(|o| o.expr.is_self_referencing()))
}

/// Look up a dot-delimited path. Numeric segments index into sequences.
pub fn lookup_path<'a>(tree: &'a Tree, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = tree.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Replace the selected slots of `text`.
///
/// Each distinct slot text is resolved once and every occurrence gets the
/// same replacement. Reference values pass through `escape` with the quoting
/// found at the occurrence; fallbacks are spliced as written. Unresolved
/// slots stay verbatim and produce one diagnostic each.
fn substitute<S, R>(
    text: &str,
    prefix: char,
    mut select: S,
    mut resolve_one: R,
    escape: &dyn Fn(&str, Quoting) -> String,
) -> Result<Substitution, LayerfigError>
where
    S: FnMut(&SlotExpression) -> bool,
    R: FnMut(&SlotExpression) -> Option<Resolved>,
{
    let mut out = String::with_capacity(text.len());
    let mut diagnostics = Vec::new();
    let mut resolved: Vec<(String, Option<Resolved>)> = Vec::new();
    let mut last = 0;

    for occurrence in slot::scan(text, prefix)? {
        if !select(&occurrence.expr) {
            continue;
        }
        let cached = resolved
            .iter()
            .position(|(full, _)| *full == occurrence.expr.full_match);
        let index = match cached {
            Some(index) => index,
            None => {
                let value = resolve_one(&occurrence.expr);
                if value.is_none() {
                    let diagnostic = SlotDiagnostic::for_slot(&occurrence.expr);
                    diagnostic.emit();
                    diagnostics.push(diagnostic);
                }
                resolved.push((occurrence.expr.full_match.clone(), value));
                resolved.len() - 1
            }
        };

        out.push_str(&text[last..occurrence.span.start]);
        match &resolved[index].1 {
            Some(Resolved::Reference(value)) => {
                out.push_str(&escape(value, quoting_at(text, occurrence.span.start)));
            }
            Some(Resolved::Fallback(literal)) => out.push_str(literal),
            None => out.push_str(&occurrence.expr.full_match),
        }
        last = occurrence.span.end;
    }
    out.push_str(&text[last..]);

    Ok(Substitution {
        text: out,
        diagnostics,
    })
}

/// Text phase: replace slots whose candidates are all environment variables.
///
/// Self-referencing slots are left untouched for the tree phase.
pub(crate) fn substitute_env_slots(
    text: &str,
    prefix: char,
    env: &RuntimeEnv,
    escape: &dyn Fn(&str, Quoting) -> String,
) -> Result<Substitution, LayerfigError> {
    if !slot::has_slot(text, prefix) {
        return Ok(Substitution {
            text: text.to_string(),
            diagnostics: Vec::new(),
        });
    }
    let empty = Tree::new();
    substitute(
        text,
        prefix,
        |expr| !expr.is_self_referencing(),
        |expr| resolve_candidates(expr, env, &empty, None),
        escape,
    )
}

#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

/// Tree phase: resolve self-referencing slots in the string leaves of `fragment`.
///
/// The lookup view is `partial` with `fragment` merged on top. Leaves are
/// visited in document order and each resolved leaf is written back into the
/// view, so a later leaf may reference an earlier one in the same fragment.
/// A reference to a leaf that still holds a self-referencing slot (a later
/// sibling, or an unresolved one) does not resolve: the chain moves on and
/// the slot is reported if nothing else wins.
pub(crate) fn resolve_self_references(
    mut fragment: Tree,
    partial: &Tree,
    prefix: char,
    env: &RuntimeEnv,
) -> Result<(Tree, Vec<SlotDiagnostic>), LayerfigError> {
    let mut leaves = Vec::new();
    collect_self_slot_leaves(&fragment, prefix, &mut Vec::new(), &mut leaves)?;
    if leaves.is_empty() {
        return Ok((fragment, Vec::new()));
    }

    let mut view = deep_merge(partial.clone(), fragment.clone());
    let mut diagnostics = Vec::new();
    let identity = |v: &str, _: Quoting| v.to_string();

    for steps in leaves {
        let Some(Value::String(text)) = leaf(&fragment, &steps) else {
            continue;
        };
        let substitution = substitute(
            text,
            prefix,
            SlotExpression::is_self_referencing,
            |expr| resolve_candidates(expr, env, &view, Some(prefix)),
            &identity,
        )?;
        diagnostics.extend(substitution.diagnostics);
        if substitution.text != *text {
            set_leaf(&mut view, &steps, substitution.text.clone());
            set_leaf(&mut fragment, &steps, substitution.text);
        }
    }

    Ok((fragment, diagnostics))
}

fn collect_self_slot_leaves(
    tree: &Tree,
    prefix: char,
    path: &mut Vec<Step>,
    out: &mut Vec<Vec<Step>>,
) -> Result<(), LayerfigError> {
    for (key, value) in tree {
        path.push(Step::Key(key.clone()));
        collect_value(value, prefix, path, out)?;
        path.pop();
    }
    Ok(())
}

fn collect_value(
    value: &Value,
    prefix: char,
    path: &mut Vec<Step>,
    out: &mut Vec<Vec<Step>>,
) -> Result<(), LayerfigError> {
    match value {
        Value::String(text) if slot::has_slot(text, prefix) => {
            if slot::scan(text, prefix)?
                .iter()
                .any(|o| o.expr.is_self_referencing())
            {
                out.push(path.clone());
            }
        }
        Value::Object(map) => collect_self_slot_leaves(map, prefix, path, out)?,
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(Step::Index(index));
                collect_value(item, prefix, path, out)?;
                path.pop();
            }
        }
        _ => {}
    }
    Ok(())
}

fn leaf<'a>(tree: &'a Tree, steps: &[Step]) -> Option<&'a Value> {
    let (first, rest) = steps.split_first()?;
    let Step::Key(key) = first else {
        return None;
    };
    let mut current = tree.get(key)?;
    for step in rest {
        current = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get(key)?,
            (Step::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_leaf(tree: &mut Tree, steps: &[Step], text: String) {
    let Some((Step::Key(key), rest)) = steps.split_first() else {
        return;
    };
    let Some(mut current) = tree.get_mut(key) else {
        return;
    };
    for step in rest {
        let next = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get_mut(key),
            (Step::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        let Some(next) = next else {
            return;
        };
        current = next;
    }
    *current = Value::String(text);
}
