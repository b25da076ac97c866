//! YAML support backed by `serde-saphyr`.

use serde_json::Value;
use serde_saphyr::Options;

use crate::error::BoxError;
use crate::types::Tree;

use super::{ConfigParser, Quoting, escape_quoted, root_map};

/// YAML 1.2 with strict booleans: only `true`/`false` are booleans, so
/// `yes`, `on` and friends stay strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl ConfigParser for YamlParser {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn accepted_extensions(&self) -> &[&'static str] {
        &["yaml", "yml"]
    }

    fn decode(&self, text: &str) -> Result<Tree, BoxError> {
        if text.trim().is_empty() {
            return Ok(Tree::new());
        }
        let value: Value = serde_saphyr::from_str_with_options(
            text,
            Options {
                strict_booleans: true,
                ..Options::default()
            },
        )?;
        match value {
            // An empty document decodes to null.
            Value::Null => Ok(Tree::new()),
            other => root_map(other),
        }
    }

    /// Plain scalars take the value as is when YAML would read it back
    /// unchanged; otherwise the value is written as a double-quoted scalar.
    /// That form only decodes when the slot is the whole scalar.
    fn escape(&self, value: &str, quoting: Quoting) -> String {
        match quoting {
            Quoting::Double => escape_quoted(value),
            Quoting::Single => value.replace('\'', "''"),
            Quoting::Bare if is_plain_safe(value) => value.to_string(),
            Quoting::Bare => format!("\"{}\"", escape_quoted(value)),
        }
    }
}

fn is_plain_safe(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let indicator = match first {
        ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%'
        | '@' | '`' => true,
        '-' | '?' | ':' => chars.next().is_none_or(char::is_whitespace),
        _ => false,
    };
    !indicator
        && value.trim() == value
        && !value.chars().any(char::is_control)
        && !value.contains(": ")
        && !value.contains(" #")
        && !value.ends_with(':')
}
