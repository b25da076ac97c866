//! Plain data types shared across the pipeline.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A configuration tree node: a mapping from keys to JSON-like values.
pub type Tree = Map<String, Value>;

/// The flat variable map slots and environment sources read from.
///
/// Entries may be present with no value (`unset`), which behaves like an
/// absent variable for slot resolution and is skipped by
/// [`EnvironmentVariableSource`](crate::EnvironmentVariableSource).
/// Iteration is in key order so env-derived trees are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    vars: BTreeMap<String, Option<String>>,
}

impl RuntimeEnv {
    /// An environment with no variables, for runtimes without process env access.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the process environment. Variables whose name or value is not
    /// valid UTF-8 are skipped.
    pub fn ambient() -> Self {
        let mut vars = BTreeMap::new();
        for (key, value) in std::env::vars_os() {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => {
                    vars.insert(key, Some(value));
                }
                (key, _) => {
                    tracing::debug!(?key, "skipping non UTF-8 environment variable");
                }
            }
        }
        Self { vars }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), Some(value.into()));
        self
    }

    /// Record `key` as present but without a value.
    pub fn unset(&mut self, key: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), None);
        self
    }

    /// The value of `key`, or `None` when absent or unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(|v| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RuntimeEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}
