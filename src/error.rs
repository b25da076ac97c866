use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error used for decoder and validator failures coming from outside the crate.
pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum LayerfigError {
    #[error("No source was added. Please provide one by using .add_source(<source>)")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(layerfig::no_sources),
            help("configuration must be explicit: register at least one source")
        )
    )]
    NoSources,

    #[error("Invalid source: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(layerfig::invalid_source)))]
    InvalidSource { reason: String },

    #[error(
        "\".{extension}\" file is not supported by the configured parsers. Accepted files are: \"{}\"",
        accepted.join(", ")
    )]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(layerfig::unsupported_extension),
            help("register a parser for this extension with .add_parser()")
        )
    )]
    UnsupportedExtension {
        extension: String,
        accepted: Vec<String>,
    },

    #[error("File \"{}\" does not exist", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(layerfig::file_not_found)))]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(layerfig::io)))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(layerfig::parse)))]
    Parse { origin: String, source: BoxError },

    #[error("Invalid slot \"{slot}\": {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(layerfig::invalid_slot_syntax)))]
    InvalidSlotSyntax { slot: String, reason: String },

    #[error(transparent)]
    Validation(BoxError),
}

impl LayerfigError {
    /// Borrow the validator's own error if this is a validation failure of type `E`.
    pub fn validation_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            LayerfigError::Validation(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn invalid_slot(slot: &str, reason: impl Into<String>) -> Self {
        LayerfigError::InvalidSlotSyntax {
            slot: slot.to_string(),
            reason: reason.into(),
        }
    }
}
