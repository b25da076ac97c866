//! The closed set of configuration sources and the per-source load pipeline.
//!
//! Every source goes through the same two resolution phases (see
//! [`resolve`](crate::resolve)): a kind-specific loader runs the text phase
//! and decodes, then [`Source::load`] runs the tree phase against the
//! configuration merged so far.

use std::path::Path;
use std::sync::Arc;

use crate::env::EnvironmentVariableSource;
use crate::error::LayerfigError;
use crate::file::FileSource;
use crate::object::ObjectSource;
use crate::parser::ConfigParser;
use crate::resolve::{self, SlotDiagnostic};
use crate::types::{RuntimeEnv, Tree};

/// One registered unit of configuration input.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileSource),
    Object(ObjectSource),
    Env(EnvironmentVariableSource),
}

impl From<FileSource> for Source {
    fn from(source: FileSource) -> Self {
        Source::File(source)
    }
}

impl From<ObjectSource> for Source {
    fn from(source: ObjectSource) -> Self {
        Source::Object(source)
    }
}

impl From<EnvironmentVariableSource> for Source {
    fn from(source: EnvironmentVariableSource) -> Self {
        Source::Env(source)
    }
}

/// Everything a source needs from the builder to produce its fragment.
pub(crate) struct SourceContext<'a> {
    pub runtime_env: &'a RuntimeEnv,
    pub slot_prefix: char,
    /// Absolute folder relative file names are resolved against.
    pub config_folder: &'a Path,
    pub parsers: &'a [Arc<dyn ConfigParser>],
    /// The accumulator: every earlier source, already merged.
    pub partial: &'a Tree,
}

/// A source's contribution, slot-resolved but not yet merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Fragment {
    pub tree: Tree,
    pub diagnostics: Vec<SlotDiagnostic>,
}

impl Fragment {
    pub(crate) fn new(tree: Tree, diagnostics: Vec<SlotDiagnostic>) -> Self {
        Self { tree, diagnostics }
    }
}

impl Source {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Object(_) => "object",
            Source::Env(_) => "env",
        }
    }

    /// Reject a source whose construction arguments can never load.
    pub(crate) fn check(&self) -> Result<(), LayerfigError> {
        match self {
            Source::File(_) => Ok(()),
            Source::Object(source) => source.check(),
            Source::Env(source) => source.check(),
        }
    }

    pub(crate) fn load(&self, ctx: &SourceContext<'_>) -> Result<Fragment, LayerfigError> {
        let loaded = match self {
            Source::File(source) => source.load(ctx)?,
            Source::Object(source) => source.load(ctx)?,
            Source::Env(source) => source.load(ctx)?,
        };
        let (tree, mut diagnostics) = resolve::resolve_self_references(
            loaded.tree,
            ctx.partial,
            ctx.slot_prefix,
            ctx.runtime_env,
        )?;
        let mut all = loaded.diagnostics;
        all.append(&mut diagnostics);
        Ok(Fragment::new(tree, all))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn kinds_are_labelled() {
        assert_eq!(Source::from(FileSource::new("base.json")).kind(), "file");
        assert_eq!(Source::from(ObjectSource::new(json!({}))).kind(), "object");
        assert_eq!(Source::from(EnvironmentVariableSource::new()).kind(), "env");
    }

    #[test]
    fn check_rejects_non_map_object() {
        let source = Source::from(ObjectSource::new(json!([1, 2])));
        assert!(matches!(
            source.check(),
            Err(LayerfigError::InvalidSource { .. })
        ));
    }

    #[test]
    fn load_runs_both_phases() {
        let mut harness = Harness::new(Path::new("/"));
        harness.env.set("PORT", "3000");
        let source = Source::from(ObjectSource::new(json!({
            "port": "$PORT",
            "host": "localhost:${self.port}",
            "missing": "$NOPE"
        })));
        let fragment = source.load(&harness.ctx()).unwrap();
        assert_eq!(
            Value::Object(fragment.tree),
            json!({"port": "3000", "host": "localhost:3000", "missing": "$NOPE"})
        );
        assert_eq!(fragment.diagnostics.len(), 1);
        assert_eq!(fragment.diagnostics[0].slot(), "$NOPE");
    }
}
