use serde_json::Value;

use crate::error::LayerfigError;
use crate::parser::Quoting;
use crate::resolve;
use crate::source::{Fragment, SourceContext};
use crate::types::{RuntimeEnv, Tree};

/// Rehydrate a nested tree from flattened environment variable names.
///
/// With the defaults, `APP_database__host=localhost` becomes
/// `{"database": {"host": "localhost"}}`: the `APP` prefix and `_` prefix
/// separator are stripped, and `__` separates nesting levels. Segments keep
/// their case. Values stay strings; slots inside them are substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVariableSource {
    prefix: String,
    prefix_separator: String,
    separator: String,
}

impl Default for EnvironmentVariableSource {
    fn default() -> Self {
        Self {
            prefix: "APP".into(),
            prefix_separator: "_".into(),
            separator: "__".into(),
        }
    }
}

impl EnvironmentVariableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the variable name prefix (default: `APP`).
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Override the text between the prefix and the first segment (default: `_`).
    pub fn prefix_separator(mut self, separator: &str) -> Self {
        self.prefix_separator = separator.to_string();
        self
    }

    /// Override the nesting separator (default: `__`). Must not be empty.
    pub fn separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub(crate) fn check(&self) -> Result<(), LayerfigError> {
        if self.separator.is_empty() {
            return Err(LayerfigError::InvalidSource {
                reason: "environment variable separator must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Build the raw tree from `env` without touching slots.
    pub fn to_tree(&self, env: &RuntimeEnv) -> Tree {
        let mut tree = Tree::new();
        for (key, value) in self.matching(env) {
            insert_nested(&mut tree, &key, Value::String(value.to_string()));
        }
        tree
    }

    fn matching<'e>(&self, env: &'e RuntimeEnv) -> Vec<(Vec<&'e str>, &'e str)> {
        let needle = format!("{}{}", self.prefix, self.prefix_separator);
        let mut found = Vec::new();
        for (key, value) in env.iter() {
            let (Some(rest), Some(value)) = (key.strip_prefix(needle.as_str()), value) else {
                continue;
            };
            let segments: Vec<&str> = rest
                .split(self.separator.as_str())
                .filter(|s| !s.is_empty())
                .collect();
            if segments.is_empty() {
                continue;
            }
            found.push((segments, value));
        }
        found
    }

    pub(crate) fn load(&self, ctx: &SourceContext<'_>) -> Result<Fragment, LayerfigError> {
        self.check()?;
        let verbatim = |value: &str, _: Quoting| value.to_string();
        let mut tree = Tree::new();
        let mut diagnostics = Vec::new();

        for (key, value) in self.matching(ctx.runtime_env) {
            let substituted =
                resolve::substitute_env_slots(value, ctx.slot_prefix, ctx.runtime_env, &verbatim)?;
            diagnostics.extend(substituted.diagnostics);
            insert_nested(&mut tree, &key, Value::String(substituted.text));
        }

        tracing::debug!(
            prefix = %self.prefix,
            keys = tree.len(),
            "environment source loaded"
        );
        Ok(Fragment::new(tree, diagnostics))
    }
}

/// Set `segments` to `value`, creating maps on the way. A non-map value in
/// the way is replaced by a map.
fn insert_nested(tree: &mut Tree, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        tree.insert(first.to_string(), value);
        return;
    }

    let sub = tree
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Tree::new()));
    if !sub.is_object() {
        *sub = Value::Object(Tree::new());
    }
    if let Value::Object(sub_tree) = sub {
        insert_nested(sub_tree, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::Harness;
    use serde_json::json;
    use std::path::Path;

    fn env(pairs: &[(&str, &str)]) -> RuntimeEnv {
        pairs.iter().copied().collect()
    }

    fn tree_of(source: &EnvironmentVariableSource, pairs: &[(&str, &str)]) -> Value {
        Value::Object(source.to_tree(&env(pairs)))
    }

    #[test]
    fn default_naming_round_trip() {
        let tree = tree_of(
            &EnvironmentVariableSource::new(),
            &[("APP_database__host", "localhost")],
        );
        assert_eq!(tree, json!({"database": {"host": "localhost"}}));
    }

    #[test]
    fn case_is_preserved() {
        let tree = tree_of(
            &EnvironmentVariableSource::new(),
            &[("APP_appURL", "http://localhost:3000"), ("APP_api__port", "3000")],
        );
        assert_eq!(
            tree,
            json!({"api": {"port": "3000"}, "appURL": "http://localhost:3000"})
        );
    }

    #[test]
    fn values_are_not_coerced() {
        let tree = tree_of(
            &EnvironmentVariableSource::new(),
            &[("APP_debug", "true"), ("APP_port", "8080")],
        );
        assert_eq!(tree, json!({"debug": "true", "port": "8080"}));
    }

    #[test]
    fn custom_separators() {
        let source = EnvironmentVariableSource::new()
            .prefix("TEST")
            .prefix_separator("-")
            .separator("_-_");
        let tree = tree_of(
            &source,
            &[("TEST-appURL", "http://x"), ("TEST-api_-_port", "3000"), ("APP_port", "1")],
        );
        assert_eq!(tree, json!({"api": {"port": "3000"}, "appURL": "http://x"}));
    }

    #[test]
    fn non_matching_keys_ignored() {
        let source = EnvironmentVariableSource::new();
        assert_eq!(
            tree_of(&source, &[("OTHER_host", "x"), ("APPhost", "y"), ("APP", "z")]),
            json!({})
        );
    }

    #[test]
    fn empty_segments_are_dropped() {
        let tree = tree_of(
            &EnvironmentVariableSource::new(),
            &[("APP___db____host__", "h"), ("APP_", "ignored")],
        );
        assert_eq!(tree, json!({"db": {"host": "h"}}));
    }

    #[test]
    fn unset_variables_are_skipped() {
        let mut runtime = env(&[("APP_host", "h")]);
        runtime.unset("APP_port");
        let tree = EnvironmentVariableSource::new().to_tree(&runtime);
        assert_eq!(Value::Object(tree), json!({"host": "h"}));
    }

    #[test]
    fn deeper_key_replaces_scalar() {
        let tree = tree_of(
            &EnvironmentVariableSource::new(),
            &[("APP_db", "flat"), ("APP_db__host", "h")],
        );
        assert_eq!(tree, json!({"db": {"host": "h"}}));
    }

    #[test]
    fn empty_separator_is_invalid() {
        let err = EnvironmentVariableSource::new().separator("").check().unwrap_err();
        assert!(matches!(err, LayerfigError::InvalidSource { .. }));
    }

    #[test]
    fn load_substitutes_slots_verbatim() {
        let mut harness = Harness::new(Path::new("/"));
        harness
            .env
            .set("APP_api__url", "http://$HOST:${PORT::-80}")
            .set("HOST", "example.com");
        let fragment = EnvironmentVariableSource::new()
            .load(&harness.ctx())
            .unwrap();
        assert_eq!(
            Value::Object(fragment.tree),
            json!({"api": {"url": "http://example.com:80"}})
        );
        assert!(fragment.diagnostics.is_empty());
    }

    #[test]
    fn load_reports_unresolved_slots() {
        let mut harness = Harness::new(Path::new("/"));
        harness.env.set("APP_token", "$SECRET");
        let fragment = EnvironmentVariableSource::new()
            .load(&harness.ctx())
            .unwrap();
        assert_eq!(fragment.tree["token"], json!("$SECRET"));
        assert_eq!(fragment.diagnostics.len(), 1);
    }
}
