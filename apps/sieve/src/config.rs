//! # Config Files
//!
//! Loads the executor config from TOML or JSON.
//!
//! ```toml
//! [processor]
//! type = "filter_parts"
//!
//! [processor.filter_parts]
//! type = "metadata"
//! metadata = { key = "status", operator = "equals_cs", arg = "ok" }
//!
//! [resources.conditions.is_error]
//! type = "text"
//! text = { operator = "prefix", arg = "error" }
//! ```

use serde::{Deserialize, Serialize};
use sieve_core::{ResourcesConfig, SieveError, processor};
use std::path::{Path, PathBuf};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The stage to run.
    pub processor: processor::Config,
    /// Shared resources referenced by the stage.
    pub resources: ResourcesConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(src: &str) -> Result<Self, SieveError> {
        toml::from_str(src).map_err(|e| SieveError::InvalidConfig(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json_str(src: &str) -> Result<Self, SieveError> {
        serde_json::from_str(src).map_err(|e| SieveError::InvalidConfig(e.to_string()))
    }

    /// Load from disk. Files ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, SieveError> {
        let validated = validate_file_path(path)?;

        let metadata = std::fs::metadata(&validated)
            .map_err(|e| SieveError::Io(format!("Cannot read file metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SieveError::InvalidConfig(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let src = std::fs::read_to_string(&validated)
            .map_err(|e| SieveError::Io(format!("Read config: {}", e)))?;

        let is_json = validated
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&src)
        } else {
            Self::from_toml_str(&src)
        }
    }
}

/// Canonicalize a path and ensure it names a regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, SieveError> {
    let canonical = path.canonicalize().map_err(|e| {
        SieveError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SieveError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Check an input path for `run`.
///
/// Anything readable that is not a directory is accepted, including pipes
/// and character devices such as `/dev/stdin`. The path is not
/// canonicalized because `/dev/fd/*` links do not resolve to real paths.
pub fn validate_input_path(path: &Path) -> Result<PathBuf, SieveError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        SieveError::Io(format!("Invalid input path '{}': {}", path.display(), e))
    })?;

    if metadata.is_dir() {
        return Err(SieveError::Io(format!(
            "Input path '{}' is a directory",
            path.display()
        )));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_path_accepts_files_and_rejects_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("in.jsonl");
        std::fs::write(&file, "[]\n").expect("write");

        assert_eq!(validate_input_path(&file).expect("file"), file);
        assert!(matches!(
            validate_input_path(dir.path()),
            Err(SieveError::Io(msg)) if msg.contains("directory")
        ));
        assert!(validate_input_path(&dir.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn input_path_accepts_character_devices() {
        let dev_null = Path::new("/dev/null");
        assert!(validate_file_path(dev_null).is_err());
        assert_eq!(validate_input_path(dev_null).expect("device"), dev_null);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let conf = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(conf.processor.kind, "filter_parts");
        assert_eq!(conf.processor.filter_parts.condition.kind, "text");
        assert!(conf.resources.conditions.is_empty());
    }

    #[test]
    fn json_and_toml_agree() {
        let from_toml = AppConfig::from_toml_str(
            r#"
            [processor.filter_parts]
            type = "static"
            static = false
            "#,
        )
        .expect("toml");
        let from_json = AppConfig::from_json_str(
            r#"{"processor": {"filter_parts": {"type": "static", "static": false}}}"#,
        )
        .expect("json");
        assert_eq!(from_toml, from_json);
    }

    #[test]
    fn malformed_config_is_invalid() {
        let result = AppConfig::from_toml_str("[processor\n");
        assert!(matches!(result, Err(SieveError::InvalidConfig(_))));
    }
}
