use serde::Serialize;

use crate::error::QueryError;
use kubeprobe_types::Encoding;

/// Serialize a summary (or list of summaries) in the requested encoding
pub fn encode<T: Serialize + ?Sized>(value: &T, encoding: Encoding) -> Result<String, QueryError> {
    Ok(match encoding {
        Encoding::Json => serde_json::to_string(value)?,
        Encoding::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Render an API object as a block-style YAML document.
///
/// The object is first reduced to plain mappings, sequences and scalars.
/// Keys keep the order the object serializes them in; nothing is sorted.
pub fn render_document<T: Serialize + ?Sized>(object: &T) -> Result<String, QueryError> {
    let document = serde_yaml::to_value(object)?;
    Ok(serde_yaml::to_string(&document)?)
}
