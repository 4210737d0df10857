//! Manifest (`package.json`) access.
//!
//! Only the `dependencies` mapping is consumed; every other field passes
//! through untouched when the manifest is rewritten by `add`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use super::error::PkgError;

/// Manifest filename.
pub const MANIFEST_NAME: &str = "package.json";

/// Read the direct dependency declarations from a manifest.
///
/// # Errors
/// Returns a manifest error if the file is absent, is not valid JSON, or
/// its `dependencies` entry is not an object of string ranges.
pub fn read_dependencies(path: &Path) -> Result<BTreeMap<String, String>, PkgError> {
    if !path.exists() {
        return Err(PkgError::manifest_not_found(path));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to read manifest: {e}")))?;

    let root: Value = serde_json::from_str(&content)
        .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON in manifest: {e}")))?;

    let root = root
        .as_object()
        .ok_or_else(|| PkgError::manifest_invalid("package.json must be a JSON object"))?;

    let mut deps = BTreeMap::new();

    let Some(section) = root.get("dependencies") else {
        return Ok(deps);
    };

    let section = section.as_object().ok_or_else(|| {
        PkgError::manifest_invalid(format!(
            "'dependencies' must be an object, got {}",
            json_type_name(section)
        ))
    })?;

    for (name, range) in section {
        let Some(range) = range.as_str() else {
            return Err(PkgError::manifest_invalid(format!(
                "Invalid range for '{name}': expected string, got {}",
                json_type_name(&section[name])
            )));
        };
        deps.insert(name.clone(), range.to_string());
    }

    Ok(deps)
}

/// Record (or overwrite) one dependency declaration in the manifest.
///
/// The manifest is rewritten pretty-printed via an atomic write; unrelated
/// fields are preserved.
///
/// # Errors
/// Returns a manifest error if the file is absent or malformed, or a
/// filesystem error if the rewrite fails.
pub fn add_dependency(path: &Path, name: &str, range: &str) -> Result<(), PkgError> {
    if !path.exists() {
        return Err(PkgError::manifest_not_found(path));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to read manifest: {e}")))?;

    let mut root: Value = serde_json::from_str(&content)
        .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON in manifest: {e}")))?;

    let root_obj = root
        .as_object_mut()
        .ok_or_else(|| PkgError::manifest_invalid("package.json must be a JSON object"))?;

    let section = root_obj
        .entry("dependencies")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));

    let section = section.as_object_mut().ok_or_else(|| {
        PkgError::manifest_invalid("'dependencies' must be an object".to_string())
    })?;

    section.insert(name.to_string(), Value::String(range.to_string()));

    let mut serialized = serde_json::to_string_pretty(&root)
        .map_err(|e| PkgError::fs(format!("Failed to serialize manifest: {e}")))?;
    serialized.push('\n');

    sprig_util::fs::atomic_write(path, serialized.as_bytes())
        .map_err(|e| PkgError::fs(format!("Failed to write manifest: {e}")))?;

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
