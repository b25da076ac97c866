use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BoxError, LayerfigError};
use crate::merge::deep_merge;
use crate::parser::{self, ConfigParser};
use crate::resolve::SlotDiagnostic;
use crate::source::{Source, SourceContext};
use crate::types::{RuntimeEnv, Tree};

const DEFAULT_CONFIG_FOLDER: &str = "./config";
const DEFAULT_SLOT_PREFIX: char = '$';

type Validator<T> = Box<dyn Fn(Value) -> Result<T, BoxError> + Send + Sync>;

/// Entry point for building a layerfig configuration.
pub struct Layerfig;

impl Layerfig {
    /// Start a builder around `validate`, which receives the fully merged tree
    /// exactly once per [`build`](LayerfigBuilder::build).
    pub fn builder<T, E, F>(validate: F) -> LayerfigBuilder<T>
    where
        F: Fn(Value) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        LayerfigBuilder::new(Box::new(move |tree: Value| -> Result<T, BoxError> {
            validate(tree).map_err(Into::into)
        }))
    }
}

/// The candidate configuration before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub tree: Tree,
    /// Every slot that was left in place, in source order.
    pub diagnostics: Vec<SlotDiagnostic>,
}

/// Ordered sources plus the options that control how they load.
///
/// Sources are layered in registration order: later sources win on scalar
/// conflicts, maps merge recursively, sequences are replaced. Self-references
/// only see sources registered before the one being loaded.
pub struct LayerfigBuilder<T> {
    validate: Validator<T>,
    config_folder: PathBuf,
    parsers: Vec<Arc<dyn ConfigParser>>,
    slot_prefix: char,
    runtime_env: Option<RuntimeEnv>,
    sources: Vec<Source>,
    invalid_source: Option<String>,
}

impl<T> LayerfigBuilder<T> {
    fn new(validate: Validator<T>) -> Self {
        Self {
            validate,
            config_folder: PathBuf::from(DEFAULT_CONFIG_FOLDER),
            parsers: parser::default_parsers(),
            slot_prefix: DEFAULT_SLOT_PREFIX,
            runtime_env: None,
            sources: Vec::new(),
            invalid_source: None,
        }
    }

    /// Folder relative file sources are resolved against (default: `./config`).
    /// A relative folder is resolved against the current directory on each build.
    pub fn config_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config_folder = folder.into();
        self
    }

    /// Replace the parser list with a single parser.
    pub fn parser(mut self, parser: impl ConfigParser + 'static) -> Self {
        self.parsers = vec![Arc::new(parser)];
        self
    }

    /// Append a parser. For a given extension the first accepting parser wins.
    pub fn add_parser(mut self, parser: impl ConfigParser + 'static) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    /// Replace the parser list with already shared parsers.
    pub fn parsers(mut self, parsers: Vec<Arc<dyn ConfigParser>>) -> Self {
        self.parsers = parsers;
        self
    }

    /// Set the slot marker character (default: `$`).
    pub fn slot_prefix(mut self, prefix: char) -> Self {
        self.slot_prefix = prefix;
        self
    }

    /// Use a fixed environment instead of sampling the process env per build.
    pub fn runtime_env(mut self, env: RuntimeEnv) -> Self {
        self.runtime_env = Some(env);
        self
    }

    /// Register a source. Sources are loaded in registration order.
    ///
    /// A source that can never load is remembered and reported as
    /// [`LayerfigError::InvalidSource`] by the next build, before any I/O.
    pub fn add_source(mut self, source: impl Into<Source>) -> Self {
        let source = source.into();
        match source.check() {
            Ok(()) => self.sources.push(source),
            Err(LayerfigError::InvalidSource { reason }) => {
                self.invalid_source.get_or_insert(reason);
            }
            Err(other) => {
                self.invalid_source.get_or_insert(other.to_string());
            }
        }
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Resolve the config folder to an absolute path.
    fn effective_config_folder(&self) -> Result<PathBuf, LayerfigError> {
        if self.config_folder.is_absolute() {
            return Ok(self.config_folder.clone());
        }
        let cwd = std::env::current_dir().map_err(|e| LayerfigError::Io {
            path: PathBuf::from("."),
            source: e,
        })?;
        Ok(normalize(&cwd.join(&self.config_folder)))
    }

    fn effective_runtime_env(&self) -> Cow<'_, RuntimeEnv> {
        match &self.runtime_env {
            Some(env) => Cow::Borrowed(env),
            None => Cow::Owned(RuntimeEnv::ambient()),
        }
    }

    /// Load, resolve and merge every source without validating.
    pub fn merged(&self) -> Result<Merged, LayerfigError> {
        if let Some(reason) = &self.invalid_source {
            return Err(LayerfigError::InvalidSource {
                reason: reason.clone(),
            });
        }
        if self.sources.is_empty() {
            return Err(LayerfigError::NoSources);
        }

        let runtime_env = self.effective_runtime_env();
        let config_folder = self.effective_config_folder()?;
        tracing::debug!(
            sources = self.sources.len(),
            config_folder = %config_folder.display(),
            "building configuration"
        );

        let mut tree = Tree::new();
        let mut diagnostics = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            tracing::debug!(index, kind = source.kind(), "loading source");
            let ctx = SourceContext {
                runtime_env: &runtime_env,
                slot_prefix: self.slot_prefix,
                config_folder: &config_folder,
                parsers: &self.parsers,
                partial: &tree,
            };
            let fragment = source.load(&ctx)?;
            diagnostics.extend(fragment.diagnostics);
            tree = deep_merge(tree, fragment.tree);
        }

        Ok(Merged { tree, diagnostics })
    }

    /// Run the whole pipeline and hand the merged tree to the validator.
    ///
    /// Re-reads files and re-samples the environment on every call.
    pub fn build(&self) -> Result<T, LayerfigError> {
        let merged = self.merged()?;
        tracing::debug!(
            keys = merged.tree.len(),
            unresolved = merged.diagnostics.len(),
            "validating merged configuration"
        );
        (self.validate)(Value::Object(merged.tree)).map_err(LayerfigError::Validation)
    }
}

/// Drop `.` components so reported paths read cleanly.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}
