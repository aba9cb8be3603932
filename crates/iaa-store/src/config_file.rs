//! TOML files: run configuration and attribute schema.

use crate::error::StoreError;
use iaa_kernel::{AttributeSchema, RunConfig};
use std::fs;
use std::path::Path;

fn read_text(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|e| StoreError::io(path, e))
}

/// Load and validate a run configuration.
pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, StoreError> {
    let path = path.as_ref();
    let config = RunConfig::from_toml_str(&read_text(path)?)?;
    tracing::debug!(path = %path.display(), "loaded run config");
    Ok(config)
}

/// Load an attribute schema (`[attributes] name = ["label", ...]`).
///
/// An attribute with an empty label set is rejected: it would make every
/// labelled mention invalid.
pub fn load_schema(path: impl AsRef<Path>) -> Result<AttributeSchema, StoreError> {
    let path = path.as_ref();
    let schema: AttributeSchema = toml::from_str(&read_text(path)?)
        .map_err(|e| StoreError::Schema(format!("{}: {e}", path.display())))?;
    if let Some((name, _)) = schema.attributes.iter().find(|(_, labels)| labels.is_empty()) {
        return Err(StoreError::Schema(format!(
            "{}: attribute `{name}` has no labels",
            path.display()
        )));
    }
    tracing::debug!(
        path = %path.display(),
        attributes = schema.attributes.len(),
        "loaded attribute schema"
    );
    Ok(schema)
}
