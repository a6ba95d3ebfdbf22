/// Reduction run configuration
pub mod config;
/// Network-description text for the equivalent
pub mod dss;
/// CSV export of report tables
pub mod report;
/// Solved-network snapshot files
pub mod snapshot;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_name<E: serde::de::Error>(val: Value) -> Result<String, E> {
    match val {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(E::custom(format!("expected a name, got `{other}`"))),
    }
}

/// Deserializes a name that may be written as a JSON number, e.g. bus `632`.
pub(crate) fn name_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    value_to_name(Value::deserialize(deserializer)?)
}

/// Same as [`name_from_json`] for a list of names.
pub(crate) fn names_from_json<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(value_to_name)
        .collect()
}
