use serde_json::Value;

use crate::error::BoxError;
use crate::types::Tree;

use super::{ConfigParser, Quoting, escape_quoted, root_map};

/// JSON5 (comments, trailing commas, unquoted keys). Also claims `.json` and
/// `.jsonc`, so register it before [`JsonParser`](super::JsonParser) or in
/// place of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json5Parser;

impl ConfigParser for Json5Parser {
    fn name(&self) -> &'static str {
        "json5"
    }

    fn accepted_extensions(&self) -> &[&'static str] {
        &["json", "jsonc", "json5"]
    }

    fn decode(&self, text: &str) -> Result<Tree, BoxError> {
        let value: Value = ::json5::from_str(text)?;
        root_map(value)
    }

    fn escape(&self, value: &str, quoting: Quoting) -> String {
        match quoting {
            Quoting::Double => escape_quoted(value),
            Quoting::Single => escape_quoted(value).replace('\'', "\\'"),
            Quoting::Bare => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_comments_and_trailing_commas() {
        let tree = Json5Parser
            .decode(
                r#"{
                    // service address
                    appURL: "http://localhost",
                    api: { port: 3000, },
                }"#,
            )
            .unwrap();
        assert_eq!(tree["appURL"], json!("http://localhost"));
        assert_eq!(tree["api"]["port"].as_f64(), Some(3000.0));
    }

    #[test]
    fn single_quoted_strings_are_escaped() {
        let value = r#"it's "C:\x""#;
        let text = format!("{{a: '{}'}}", Json5Parser.escape(value, Quoting::Single));
        let tree = Json5Parser.decode(&text).unwrap();
        assert_eq!(tree["a"], json!(value));
    }

    #[test]
    fn claims_json_family_extensions() {
        for ext in ["json", "jsonc", "json5"] {
            assert!(Json5Parser.accepts_extension(ext));
        }
    }
}
