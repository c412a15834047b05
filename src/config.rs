//! Lexicon configuration, persisted as TOML.
//!
//! Every field has a serde default, so a config file only needs the values
//! that differ from a stock Open English Wordnet checkout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::chunked::DEFAULT_CHUNK_THRESHOLD;
use crate::edit::EditConfig;
use crate::error::ConfigError;
use crate::ident::IdGrammar;
use crate::model::LexiconHeader;
use crate::validate::ValidateConfig;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Metadata written on the `<Lexicon>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_label() -> String {
    "Open English Wordnet".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_email() -> String {
    "english-wordnet@googlegroups.com".into()
}
fn default_license() -> String {
    "https://creativecommons.org/licenses/by/4.0".into()
}
fn default_version() -> String {
    "2024".into()
}
fn default_url() -> String {
    "https://github.com/globalwordnet/english-wordnet".into()
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            language: default_language(),
            email: default_email(),
            license: default_license(),
            version: default_version(),
            citation: None,
            url: default_url(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexnetConfig {
    /// Lexicon id and prefix of every node id.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub header: HeaderConfig,
    /// Directory of the YAML source shards.
    #[serde(default = "default_yaml_dir")]
    pub yaml_dir: PathBuf,
    /// Directory for split WN-LMF output.
    #[serde(default = "default_xml_dir")]
    pub xml_dir: PathBuf,
    /// Noun synsets allowed to have no hypernym. Empty means the namespace's
    /// `entity` synset.
    #[serde(default)]
    pub roots: Vec<String>,
    /// Pending writes the durable store buffers before flushing.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Byte threshold for chunked YAML reads.
    #[serde(default = "default_chunk_threshold")]
    pub chunk_threshold: usize,
    /// Snapshot file for the in-memory backend; none disables caching.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

fn default_namespace() -> String {
    "oewn".into()
}
fn default_yaml_dir() -> PathBuf {
    PathBuf::from("src/yaml")
}
fn default_xml_dir() -> PathBuf {
    PathBuf::from("src/xml")
}
fn default_cache_size() -> usize {
    1_000
}
fn default_chunk_threshold() -> usize {
    DEFAULT_CHUNK_THRESHOLD
}

impl Default for LexnetConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            header: HeaderConfig::default(),
            yaml_dir: default_yaml_dir(),
            xml_dir: default_xml_dir(),
            roots: Vec::new(),
            cache_size: default_cache_size(),
            chunk_threshold: default_chunk_threshold(),
            snapshot: None,
        }
    }
}

impl LexnetConfig {
    /// Load from a TOML file and check the values.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.check()?;
        tracing::debug!(path = %path.display(), namespace = %config.namespace, "loaded config");
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values no command can work with.
    pub fn check(&self) -> ConfigResult<()> {
        if IdGrammar::new(&self.namespace).is_err() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "namespace {:?} must be non-empty ASCII letters or digits",
                    self.namespace
                ),
            });
        }
        if self.cache_size == 0 {
            return Err(ConfigError::Invalid {
                message: "cache_size must be at least 1".into(),
            });
        }
        if self.chunk_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "chunk_threshold must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn header(&self) -> LexiconHeader {
        LexiconHeader {
            id: self.namespace.clone(),
            label: self.header.label.clone(),
            language: self.header.language.clone(),
            email: self.header.email.clone(),
            license: self.header.license.clone(),
            version: self.header.version.clone(),
            citation: self.header.citation.clone(),
            url: self.header.url.clone(),
        }
    }

    pub fn edit_config(&self) -> EditConfig {
        EditConfig {
            namespace: self.namespace.clone(),
        }
    }

    pub fn validate_config(&self) -> ValidateConfig {
        if self.roots.is_empty() {
            ValidateConfig::for_namespace(&self.namespace)
        } else {
            ValidateConfig {
                roots: self.roots.clone(),
            }
        }
    }
}
