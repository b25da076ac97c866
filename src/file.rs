//! File sources.
//!
//! A [`FileSource`] names a file relative to the builder's config folder (or
//! an absolute path). Loading goes:
//!
//! 1. pick the first registered parser that accepts the extension
//!    ([`LayerfigError::UnsupportedExtension`] otherwise),
//! 2. read the text ([`LayerfigError::FileNotFound`] if missing, unless the
//!    source is [optional](FileSource::optional)),
//! 3. substitute environment slots in the raw text, escaped for the format
//!    and the quoting around each slot (fallbacks are spliced as written),
//! 4. decode ([`LayerfigError::Parse`] keeps the decoder error as its source).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LayerfigError;
use crate::parser::{ConfigParser, Quoting};
use crate::resolve;
use crate::source::{Fragment, SourceContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    file_name: PathBuf,
    required: bool,
}

impl FileSource {
    /// A file that must exist.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            required: true,
        }
    }

    /// A file that contributes nothing when missing.
    pub fn optional(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            required: false,
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Join the file name onto `config_folder` unless it is already absolute.
    pub fn resolve_path(&self, config_folder: &Path) -> PathBuf {
        if self.file_name.is_absolute() {
            self.file_name.clone()
        } else {
            config_folder.join(&self.file_name)
        }
    }

    pub(crate) fn load(&self, ctx: &SourceContext<'_>) -> Result<Fragment, LayerfigError> {
        let path = self.resolve_path(ctx.config_folder);
        let parser = select_parser(&path, ctx.parsers)?;

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    return Err(LayerfigError::FileNotFound { path });
                }
                tracing::debug!(path = %path.display(), "optional config file not found, skipping");
                return Ok(Fragment::default());
            }
            Err(e) => return Err(LayerfigError::Io { path, source: e }),
        };
        tracing::debug!(path = %path.display(), parser = parser.name(), "loading config file");

        let escape = |value: &str, quoting: Quoting| parser.escape(value, quoting);
        let substituted =
            resolve::substitute_env_slots(&text, ctx.slot_prefix, ctx.runtime_env, &escape)?;

        let tree = parser
            .decode(&substituted.text)
            .map_err(|source| LayerfigError::Parse {
                origin: path.display().to_string(),
                source,
            })?;

        Ok(Fragment::new(tree, substituted.diagnostics))
    }
}

/// First parser accepting the file's extension, in registration order.
fn select_parser<'p>(
    path: &Path,
    parsers: &'p [Arc<dyn ConfigParser>],
) -> Result<&'p Arc<dyn ConfigParser>, LayerfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    parsers
        .iter()
        .find(|p| p.accepts_extension(extension))
        .ok_or_else(|| {
            let mut accepted: Vec<String> = Vec::new();
            for ext in parsers.iter().flat_map(|p| p.accepted_extensions()) {
                if !accepted.iter().any(|a| a.as_str() == *ext) {
                    accepted.push(ext.to_string());
                }
            }
            LayerfigError::UnsupportedExtension {
                extension: extension.to_string(),
                accepted,
            }
        })
}
