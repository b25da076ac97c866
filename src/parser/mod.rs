//! Text format adapters.
//!
//! A [`ConfigParser`] turns source text into a [`Tree`]. [`FileSource`]
//! picks the first registered parser whose extension list accepts the file.
//! A builder starts with JSON only. TOML is always compiled in; YAML and
//! JSON5 sit behind the `yaml` and `json5` cargo features.
//!
//! [`FileSource`]: crate::FileSource

mod json;
#[cfg(feature = "json5")]
mod json5;
mod toml;
#[cfg(feature = "yaml")]
mod yaml;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxError;
use crate::types::Tree;

pub use self::json::JsonParser;
#[cfg(feature = "json5")]
pub use self::json5::Json5Parser;
pub use self::toml::TomlParser;
#[cfg(feature = "yaml")]
pub use self::yaml::YamlParser;

/// Decodes one text format into a configuration tree.
pub trait ConfigParser: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// File extensions this parser handles, without the leading dot.
    fn accepted_extensions(&self) -> &[&'static str];

    /// Case-insensitive extension match. A leading dot is ignored.
    fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        self.accepted_extensions()
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(extension))
    }

    /// Decode `text`. The document root must be a map.
    fn decode(&self, text: &str) -> Result<Tree, BoxError>;

    /// Make an environment value safe to splice into this format's text.
    ///
    /// `quoting` is the string context the slot sits in on its line. The
    /// default escapes inside double quotes (JSON, TOML basic strings) and
    /// splices verbatim elsewhere, so a bare `port = $PORT` stays a number.
    fn escape(&self, value: &str, quoting: Quoting) -> String {
        match quoting {
            Quoting::Double => escape_quoted(value),
            Quoting::Bare | Quoting::Single => value.to_string(),
        }
    }
}

/// The string context around a slot in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Outside any quoted string: a YAML plain scalar, a bare TOML value.
    Bare,
    /// Inside `"..."`.
    Double,
    /// Inside `'...'`.
    Single,
}

/// Work out the quoting in effect at byte `offset` of `text`.
///
/// Only the current line is scanned, so slots on the continuation lines of a
/// multi-line string count as [`Quoting::Bare`]. A quote opens a string only
/// at the start of a value (line start or after one of `: = - [ { , ?`),
/// which keeps apostrophes in plain text such as `it's` from counting.
pub(crate) fn quoting_at(text: &str, offset: usize) -> Quoting {
    let before = &text[..offset];
    let line = before.rfind('\n').map_or(before, |i| &before[i + 1..]);
    let mut quoting = Quoting::Bare;
    let mut previous: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match quoting {
            Quoting::Double => match c {
                '\\' => {
                    chars.next();
                }
                '"' => {
                    quoting = Quoting::Bare;
                    previous = Some(c);
                }
                _ => {}
            },
            Quoting::Single => {
                if c == '\'' {
                    // YAML writes a literal apostrophe as ''.
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        quoting = Quoting::Bare;
                        previous = Some(c);
                    }
                }
            }
            Quoting::Bare => match c {
                '"' if opens_string(previous) => quoting = Quoting::Double,
                '\'' if opens_string(previous) => quoting = Quoting::Single,
                c if c.is_whitespace() => {}
                c => previous = Some(c),
            },
        }
    }
    quoting
}

fn opens_string(previous: Option<char>) -> bool {
    matches!(previous, None | Some(':' | '=' | '-' | '[' | '{' | ',' | '?'))
}

impl fmt::Debug for dyn ConfigParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigParser")
            .field("name", &self.name())
            .field("extensions", &self.accepted_extensions())
            .finish()
    }
}

/// The document root is a scalar or sequence instead of a map.
#[derive(Debug, thiserror::Error)]
#[error("expected a map at the document root, found {found}")]
pub struct NotAMap {
    found: &'static str,
}

/// Accept a decoded document only if its root is a map.
pub(crate) fn root_map(value: Value) -> Result<Tree, BoxError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Box::new(NotAMap {
            found: kind_name(&other),
        })),
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}

/// Escape for a double-quoted string. JSON, TOML basic strings and YAML
/// double-quoted scalars all read this form.
pub(crate) fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// The parser list a builder starts with: JSON only.
pub fn default_parsers() -> Vec<Arc<dyn ConfigParser>> {
    vec![Arc::new(JsonParser)]
}

/// Every parser compiled into this build, JSON first.
pub fn all_parsers() -> Vec<Arc<dyn ConfigParser>> {
    let mut parsers = default_parsers();
    parsers.push(Arc::new(TomlParser));
    #[cfg(feature = "yaml")]
    parsers.push(Arc::new(YamlParser));
    #[cfg(feature = "json5")]
    parsers.push(Arc::new(Json5Parser));
    parsers
}
