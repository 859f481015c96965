//! # Configuration File Loading
//!
//! Loads the process configuration and the persisted subject document from
//! TOML, YAML or JSON files. The format is chosen by file extension.

use crate::config::Config;
use cake_core::{Subject, SubjectConfig};
use errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigFileError> for ConfigurationError {
    fn from(err: ConfigFileError) -> Self {
        match err {
            ConfigFileError::TomlParse(reason)
            | ConfigFileError::YamlParse(reason)
            | ConfigFileError::JsonParse(reason) => ConfigurationError::Parse { reason },
            other => ConfigurationError::Persistence {
                reason: other.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Yaml,
    Json,
}

fn detect_format(path: &Path) -> Result<FileFormat, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => Ok(FileFormat::Toml),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "json" => Ok(FileFormat::Json),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string())),
    }
}

fn read_file(path: &Path) -> Result<String, ConfigFileError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigFileError::FileNotFound(path.display().to_string()),
        _ => ConfigFileError::Io(e),
    })
}

fn parse_as<T: serde::de::DeserializeOwned>(
    contents: &str,
    format: FileFormat,
) -> Result<T, ConfigFileError> {
    match format {
        FileFormat::Toml => {
            toml::from_str(contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
        }
        FileFormat::Yaml => {
            serde_yaml::from_str(contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
        }
        FileFormat::Json => {
            serde_json::from_str(contents).map_err(|e| ConfigFileError::JsonParse(e.to_string()))
        }
    }
}

/// Load configuration from TOML file.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Loads complete configuration from a TOML format file.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_toml(Path::new("cake.toml"))?;
///     println!("Cache capacity: {}", config.service.cache_max_entries);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<Config, ConfigFileError> {
    parse_as(&read_file(path)?, FileFormat::Toml)
}

/// Load configuration from YAML file.
pub fn load_from_yaml(path: &Path) -> Result<Config, ConfigFileError> {
    parse_as(&read_file(path)?, FileFormat::Yaml)
}

/// Load configuration from file with auto-detection.
///
/// # M-CANONICAL-DOCS
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml` / `.yml`: YAML format
/// - `.json`: JSON format
///
/// ## Error Handling
/// Returns `ConfigFileError` for:
/// - File not found
/// - Invalid file extension
/// - Parse errors for detected format
pub fn load_from_file(path: &Path) -> Result<Config, ConfigFileError> {
    let format = detect_format(path)?;
    parse_as(&read_file(path)?, format)
}

/// Persisted per-subject configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectDocument {
    pub subjects: BTreeMap<Subject, SubjectConfig>,
}

impl SubjectDocument {
    pub fn from_configs(configs: impl IntoIterator<Item = SubjectConfig>) -> Self {
        Self {
            subjects: configs.into_iter().map(|c| (c.subject, c)).collect(),
        }
    }

    pub fn missing_subjects(&self) -> Vec<Subject> {
        Subject::all()
            .into_iter()
            .filter(|s| !self.subjects.contains_key(s))
            .collect()
    }
}

/// Wire shape of the document. Entries are kept as raw values so one bad
/// entry does not reject the whole file.
#[derive(Debug, Serialize, Deserialize)]
struct RawSubjectDocument<V> {
    #[serde(default)]
    subjects: BTreeMap<String, V>,
}

/// Result of reading a subject document.
#[derive(Debug, Clone, Default)]
pub struct LoadedSubjectDocument {
    pub document: SubjectDocument,
    /// Entries that were present but could not be used, with the reason.
    pub rejected: Vec<(String, String)>,
}

/// Load the persisted subject document.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Reads `{ "subjects": { "<subject>": SubjectConfig, ... } }` in the format
/// given by the file extension.
///
/// ## Behavior
/// - Unknown subject names, entries that fail to deserialize and entries
///   that fail `validate_subject_config` are skipped and listed in `rejected`
/// - An entry keyed by one subject but declaring another is rejected
/// - A file that cannot be parsed at all is an error
pub fn load_subject_document(path: &Path) -> Result<LoadedSubjectDocument, ConfigFileError> {
    let format = detect_format(path)?;
    let raw: RawSubjectDocument<serde_json::Value> = parse_as(&read_file(path)?, format)?;

    let mut loaded = LoadedSubjectDocument::default();
    for (key, value) in raw.subjects {
        let Some(subject) = Subject::from_tag(&key) else {
            warn!(subject = %key, "Skipping unknown subject in configuration document");
            loaded.rejected.push((key, "unknown subject".to_string()));
            continue;
        };

        match serde_json::from_value::<SubjectConfig>(value) {
            Ok(config) if config.subject == subject => {
                if let Err(e) = crate::validator::validate_subject_config(&config) {
                    warn!(subject = %key, error = %e, "Skipping invalid subject entry");
                    loaded.rejected.push((key, e.to_string()));
                    continue;
                }
                loaded.document.subjects.insert(subject, config);
            }
            Ok(config) => {
                warn!(
                    key = %key,
                    declared = %config.subject,
                    "Skipping subject entry with mismatched subject field"
                );
                loaded
                    .rejected
                    .push((key, format!("declares subject {}", config.subject)));
            }
            Err(e) => {
                warn!(subject = %key, error = %e, "Skipping unparsable subject entry");
                loaded.rejected.push((key, e.to_string()));
            }
        }
    }

    Ok(loaded)
}

/// Write the subject document, creating parent directories as needed.
pub fn save_subject_document(
    path: &Path,
    document: &SubjectDocument,
) -> Result<(), ConfigFileError> {
    let format = detect_format(path)?;
    let raw = RawSubjectDocument {
        subjects: document
            .subjects
            .iter()
            .map(|(subject, config)| (subject.to_string(), config))
            .collect(),
    };

    let contents = match format {
        FileFormat::Toml => {
            toml::to_string_pretty(&raw).map_err(|e| ConfigFileError::Serialize(e.to_string()))?
        }
        FileFormat::Yaml => {
            serde_yaml::to_string(&raw).map_err(|e| ConfigFileError::Serialize(e.to_string()))?
        }
        FileFormat::Json => serde_json::to_string_pretty(&raw)
            .map_err(|e| ConfigFileError::Serialize(e.to_string()))?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}
