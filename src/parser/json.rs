use crate::error::BoxError;
use crate::types::Tree;

use super::{ConfigParser, root_map};

/// Strict JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ConfigParser for JsonParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepted_extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn decode(&self, text: &str) -> Result<Tree, BoxError> {
        root_map(serde_json::from_str(text)?)
    }
}
