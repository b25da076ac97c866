//! Layered application configuration with environment and self-referencing
//! slots. Register sources, build once, get a validated value.
//!
//! Layerfig collects partial configuration from ordered sources (config
//! files, in-memory objects, environment variables), deep-merges them into
//! one candidate tree, fills in `$SLOT` placeholders along the way, and hands
//! the result to a validator of your choice.
//!
//! ```ignore
//! use layerfig::{EnvironmentVariableSource, FileSource, Layerfig, validate};
//!
//! let config: AppConfig = Layerfig::builder(validate::deserialize::<AppConfig>)
//!     .add_source(FileSource::new("base.json"))
//!     .add_source(FileSource::optional("local.json"))
//!     .add_source(EnvironmentVariableSource::new())
//!     .build()?;
//! ```
//!
//! That reads `./config/base.json`, overlays `./config/local.json` if it
//! exists, overlays every `APP_*` environment variable, and deserializes the
//! result into `AppConfig`.
//!
//! # Layering
//!
//! Sources merge in registration order, last one wins:
//!
//! ```text
//! base.json              {"api": {"port": 3000, "host": "a"}, "tags": ["x", "y"]}
//!        ↑ overridden by
//! local.json             {"api": {"port": 4000}, "tags": ["z"]}
//!        =
//! merged                 {"api": {"port": 4000, "host": "a"}, "tags": ["z"]}
//! ```
//!
//! Maps merge key by key. Everything else (scalars, sequences, null) is
//! replaced wholesale. Every layer is sparse: it only needs the keys it wants
//! to change.
//!
//! # Slots
//!
//! String values may contain placeholders, shown here with the default `$`
//! prefix (see [`LayerfigBuilder::slot_prefix`]):
//!
//! | Slot | Resolves to |
//! |------|-------------|
//! | `$PORT` or `${PORT}` | the `PORT` environment variable |
//! | `${PORT_1::PORT_2}` | the first of them that is set and non-empty |
//! | `${PORT::-3000}` | `PORT`, or `3000` when unset |
//! | `${self.api.port}` | the value at `api.port` in the configuration so far |
//! | `${HOST::self.host::-localhost}` | any mix of the above, left to right |
//!
//! Results are always text: `"$PORT"` becomes `"3000"`, not `3000`. Leave
//! type conversion to the validator, or run [`validate::coerce_scalars`]
//! first.
//!
//! A slot that resolves to nothing stays in the output verbatim and is
//! reported as a [`SlotDiagnostic`] (logged with `tracing::warn!` and
//! returned by [`LayerfigBuilder::merged`]). It is not an error: the
//! validator is the backstop. Malformed slots such as `${self.}` are errors
//! and abort the build.
//!
//! ## Self-references and source order
//!
//! `${self.path}` reads from every source registered *before* the current
//! one, plus the current source itself in document order. A reference to a
//! key that only a later source provides stays unresolved. Order sources so
//! that what you reference comes first.
//!
//! # Sources
//!
//! - [`FileSource`]: a file under the config folder (default `./config`).
//!   The parser is picked by extension. Slots are substituted in the raw text
//!   before decoding. Environment values are escaped for the quoting around
//!   the slot (see [`ConfigParser::escape`]); fallbacks are taken as written
//!   in the file.
//! - [`ObjectSource`]: an in-memory [`serde_json::Value`] or any
//!   `Serialize` type.
//! - [`EnvironmentVariableSource`]: `APP_database__host=db` becomes
//!   `{"database": {"host": "db"}}`. Prefix and separators are configurable.
//!
//! # Parsers
//!
//! The builder starts with [`JsonParser`]. [`TomlParser`] is always
//! available; [`YamlParser`] and [`Json5Parser`] sit behind the `yaml` and
//! `json5` features. Implement [`ConfigParser`] for anything else.
//!
//! # Validation
//!
//! The validator is any `Fn(serde_json::Value) -> Result<T, E>`. It runs
//! once per build on the final tree, and its error comes back as
//! [`LayerfigError::Validation`] (see [`LayerfigError::validation_error`]).
//! [`validate`] has helpers for plain serde, strict unknown-key checking, and
//! [confique](https://docs.rs/confique) defaults.
//!
//! # Environment
//!
//! By default slots and environment sources read the process environment,
//! sampled again on every build. Pass a [`RuntimeEnv`] to
//! [`LayerfigBuilder::runtime_env`] to pin it, for tests or restricted
//! runtimes.
//!
//! # Errors
//!
//! Every failure is a [`LayerfigError`]. With the `rich-errors` feature the
//! enum also implements `miette::Diagnostic`.

pub mod error;
pub mod parser;
pub mod slot;
pub mod types;
pub mod validate;

mod builder;
mod env;
mod file;
pub(crate) mod merge;
mod object;
mod resolve;
mod source;

#[cfg(test)]
mod fixtures;

pub use builder::{Layerfig, LayerfigBuilder, Merged};
pub use env::EnvironmentVariableSource;
pub use error::{BoxError, LayerfigError};
pub use file::FileSource;
pub use merge::deep_merge;
pub use object::ObjectSource;
#[cfg(feature = "json5")]
pub use parser::Json5Parser;
#[cfg(feature = "yaml")]
pub use parser::YamlParser;
pub use parser::{ConfigParser, JsonParser, Quoting, TomlParser};
pub use resolve::{SlotDiagnostic, lookup_path, resolve};
pub use slot::{Reference, SlotExpression, parse_expression};
pub use source::Source;
pub use types::{RuntimeEnv, Tree};
