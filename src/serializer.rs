//! Serialization of document fragments to YAML, and reading them back.
//!
//! Every fragment of the document tree goes through these functions, so two
//! fragments built from equal values are always byte-identical on disk.

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a fragment to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_traffic::serializer::serialize_yaml;
/// use std::collections::BTreeMap;
///
/// let mut fragment = BTreeMap::new();
/// fragment.insert("description", "Error response");
/// assert_eq!(serialize_yaml(&fragment).unwrap(), "description: Error response\n");
/// ```
pub fn serialize_yaml<T: Serialize>(fragment: &T) -> Result<String> {
    serde_yaml::to_string(fragment).context("Failed to serialize fragment to YAML")
}

/// Serializes a fragment and writes it to `path`, replacing any previous file.
pub fn write_yaml<T: Serialize>(fragment: &T, path: &Path) -> Result<()> {
    let content = serialize_yaml(fragment)?;
    write_to_file(&content, path)
}

/// Reads and deserializes a YAML fragment.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not have the expected shape.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML fragment: {}", path.display()))
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_inferencer::Schema;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_schema() -> Schema {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), Schema::String);
        Schema::Object {
            properties,
            required: Some(vec!["name".to_string()]),
        }
    }

    #[test]
    fn test_serialize_yaml_schema() {
        let yaml = serialize_yaml(&sample_schema()).unwrap();

        assert!(yaml.contains("type: object"));
        assert!(yaml.contains("properties:"));
        assert!(yaml.contains("name:"));
        assert!(yaml.contains("type: string"));
        assert!(yaml.contains("required:"));
    }

    #[test]
    fn test_serialize_yaml_is_deterministic() {
        let first = serialize_yaml(&sample_schema()).unwrap();
        let second = serialize_yaml(&sample_schema()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("paths").join("v1-posts").join("_index.yml");

        write_to_file("get: {}\n", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "get: {}\n");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("_index.yml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_and_read_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("request_body.yml");

        write_yaml(&sample_schema(), &file_path).unwrap();
        let schema: Schema = read_yaml(&file_path).unwrap();

        assert_eq!(schema, sample_schema());
    }

    #[test]
    fn test_read_yaml_wrong_shape() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("request_body.yml");
        fs::write(&file_path, "just a string\n").unwrap();

        assert!(read_yaml::<Schema>(&file_path).is_err());
    }
}
