use serde::Serialize;
use serde_json::Value;

use crate::error::LayerfigError;
use crate::parser::{Quoting, escape_quoted, kind_name};
use crate::resolve;
use crate::slot;
use crate::source::{Fragment, SourceContext};
use crate::types::Tree;

const ORIGIN: &str = "object source";

/// An in-memory configuration fragment, possibly holding slots in its strings.
///
/// Slots are substituted on the canonical JSON text of the tree, so values
/// go through the same text phase as file sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSource {
    content: Result<Tree, String>,
}

impl ObjectSource {
    /// Wrap a JSON value. The root must be a map; anything else is reported
    /// as [`LayerfigError::InvalidSource`] when the builder runs.
    pub fn new(value: Value) -> Self {
        let content = match value {
            Value::Object(map) => Ok(map),
            other => Err(format!(
                "object source root must be a map, found {}",
                kind_name(&other)
            )),
        };
        Self { content }
    }

    /// Serialize any value into an object source.
    pub fn from_serialize<S: Serialize + ?Sized>(value: &S) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::new(value),
            Err(e) => Self {
                content: Err(format!("object source could not be serialized: {e}")),
            },
        }
    }

    pub(crate) fn check(&self) -> Result<(), LayerfigError> {
        match &self.content {
            Ok(_) => Ok(()),
            Err(reason) => Err(LayerfigError::InvalidSource {
                reason: reason.clone(),
            }),
        }
    }

    pub(crate) fn load(&self, ctx: &SourceContext<'_>) -> Result<Fragment, LayerfigError> {
        let tree = match &self.content {
            Ok(tree) => tree,
            Err(reason) => {
                return Err(LayerfigError::InvalidSource {
                    reason: reason.clone(),
                });
            }
        };

        let text = serde_json::to_string(tree).map_err(|e| parse_error(e.into()))?;
        if !slot::has_slot(&text, ctx.slot_prefix) {
            tracing::debug!(keys = tree.len(), "object source has no slots");
            return Ok(Fragment::new(tree.clone(), Vec::new()));
        }

        // Canonical JSON only has slots inside strings.
        let escape = |value: &str, _: Quoting| escape_quoted(value);
        let substituted =
            resolve::substitute_env_slots(&text, ctx.slot_prefix, ctx.runtime_env, &escape)?;
        let tree: Tree =
            serde_json::from_str(&substituted.text).map_err(|e| parse_error(e.into()))?;
        tracing::debug!(keys = tree.len(), "object source loaded");
        Ok(Fragment::new(tree, substituted.diagnostics))
    }
}

fn parse_error(source: crate::error::BoxError) -> LayerfigError {
    LayerfigError::Parse {
        origin: ORIGIN.to_string(),
        source,
    }
}
