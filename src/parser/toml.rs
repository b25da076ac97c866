use serde_json::{Number, Value};

use crate::error::BoxError;
use crate::types::Tree;

use super::ConfigParser;

/// TOML via the `toml` crate.
///
/// Datetimes become their RFC 3339 text. Non-finite floats become null since
/// the tree cannot hold them.
///
/// Slot values are escaped inside basic strings (`"..."`) and spliced as is
/// everywhere else. A literal string (`'...'`) has no escapes, so a value
/// holding `'` or a line break cannot be written there and decoding fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn accepted_extensions(&self) -> &[&'static str] {
        &["toml"]
    }

    fn decode(&self, text: &str) -> Result<Tree, BoxError> {
        let table: ::toml::Table = text.parse()?;
        Ok(table_to_tree(table))
    }
}

fn table_to_tree(table: ::toml::Table) -> Tree {
    table
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect()
}

fn to_json(value: ::toml::Value) -> Value {
    use ::toml::Value as T;
    match value {
        T::String(s) => Value::String(s),
        T::Integer(i) => Value::Number(i.into()),
        T::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        T::Boolean(b) => Value::Bool(b),
        T::Datetime(dt) => Value::String(dt.to_string()),
        T::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        T::Table(table) => Value::Object(table_to_tree(table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_nested_tables() {
        let tree = TomlParser
            .decode(
                r#"
                appURL = "http://localhost:3000"

                [api]
                port = 3000
                ratio = 0.5
                tls = false
                hosts = ["a", "b"]
                "#,
            )
            .unwrap();
        assert_eq!(tree["appURL"], json!("http://localhost:3000"));
        assert_eq!(tree["api"], json!({"port": 3000, "ratio": 0.5, "tls": false, "hosts": ["a", "b"]}));
    }

    #[test]
    fn datetimes_become_strings() {
        let tree = TomlParser.decode("at = 1979-05-27T07:32:00Z").unwrap();
        assert_eq!(tree["at"], json!("1979-05-27T07:32:00Z"));
    }

    #[test]
    fn nan_becomes_null() {
        let tree = TomlParser.decode("x = nan").unwrap();
        assert_eq!(tree["x"], Value::Null);
    }

    #[test]
    fn keeps_document_order() {
        let tree = TomlParser.decode("z = 1\na = 2\nm = 3").unwrap();
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn syntax_errors_surface() {
        assert!(TomlParser.decode("port = ").is_err());
    }
}
