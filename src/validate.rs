//! Ready-made validators for [`Layerfig::builder`](crate::Layerfig::builder).
//!
//! Any `Fn(Value) -> Result<T, E>` works as a validator; these cover the
//! common cases:
//!
//! - [`deserialize`]: plain serde into `T`.
//! - [`strict`]: serde into `T`, failing on keys `T` does not consume.
//! - [`confique()`]: serde into a confique layer, then confique fills
//!   `#[config(default)]` values and checks required fields.
//!
//! Environment data is stringly typed. Wrap a validator with
//! [`coerce_scalars`] to turn `"8080"` into `8080` before deserializing.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("unknown configuration keys: {}", keys.join(", "))]
    UnknownKeys { keys: Vec<String> },

    #[error(transparent)]
    Confique(#[from] ::confique::Error),
}

/// Deserialize the merged tree into `T`.
pub fn deserialize<T: DeserializeOwned>(tree: Value) -> Result<T, SchemaError> {
    Ok(serde_json::from_value(tree)?)
}

/// Like [`deserialize`], but every key `T` ignores is an error.
///
/// Keys are reported as dotted paths (`database.typo`).
pub fn strict<T: DeserializeOwned>(tree: Value) -> Result<T, SchemaError> {
    let mut keys: Vec<String> = Vec::new();
    let value: T = serde_ignored::deserialize(tree, |path| keys.push(path.to_string()))?;
    if keys.is_empty() {
        Ok(value)
    } else {
        Err(SchemaError::UnknownKeys { keys })
    }
}

/// Deserialize into `C::Layer`, then let confique apply defaults and check
/// that every required field is present.
pub fn confique<C: ::confique::Config>(tree: Value) -> Result<C, SchemaError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let layer: C::Layer = serde_json::from_value(tree)?;
    Ok(C::builder().preloaded(layer).load()?)
}

/// Turn string leaves into booleans or numbers when they parse as such.
///
/// Tries: bool (case-insensitive) -> integer -> float. Floats need a `.` so
/// `"NaN"` and `"inf"` stay strings.
pub fn coerce_scalars(tree: Value) -> Value {
    match tree {
        Value::String(s) => parse_scalar(s),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_scalars).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, coerce_scalars(value)))
                .collect(),
        ),
        other => other,
    }
}

fn parse_scalar(s: String) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(s)
}
