//! Configuration management for codeseek.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. A TOML file (explicit path, `./codeseek.toml`, or the user config dir)
//! 3. Nested environment variables (`CODESEEK__INDEX__CHUNK_LINES=300`)
//! 4. The flat embedding credentials `CODESEEK_EMBEDDING_ENDPOINT` and
//!    `CODESEEK_EMBEDDING_API_KEY`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the embedding endpoint URL.
pub const ENDPOINT_ENV: &str = "CODESEEK_EMBEDDING_ENDPOINT";

/// Environment variable holding the embedding API key.
pub const API_KEY_ENV: &str = "CODESEEK_EMBEDDING_API_KEY";

/// Prefix for nested environment overrides.
const ENV_PREFIX: &str = "CODESEEK";

/// Config file looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "codeseek.toml";

/// Errors produced by [`Config::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("index.chunk_lines must be greater than zero")]
    ZeroChunkLines,

    #[error("index.overlap_lines ({overlap}) must be smaller than index.chunk_lines ({chunk})")]
    OverlapTooLarge { overlap: usize, chunk: usize },

    #[error("search.default_top_k must be greater than zero")]
    ZeroTopK,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embeddings: EmbeddingsConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
}

/// Embedding provider settings.
///
/// Both `endpoint` and `api_key` must be present for semantic search to be
/// enabled. Values may reference environment variables as `${VAR}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingsConfig {
    /// Endpoint after `${VAR}` expansion, `None` when unset or blank.
    pub fn resolved_endpoint(&self) -> Option<String> {
        resolve_optional(&self.endpoint)
    }

    /// API key after `${VAR}` expansion, `None` when unset or blank.
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_optional(&self.api_key)
    }
}

/// Indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory that search results are reported relative to
    pub base_dir: PathBuf,
    /// Target chunk size in lines
    pub chunk_lines: usize,
    /// Lines carried over from one chunk into the next
    pub overlap_lines: usize,
    /// Files larger than this are not indexed
    pub max_file_bytes: u64,
    /// Extensions considered when expanding a directory
    pub extensions: Vec<String>,
    /// User ignore patterns (gitignore syntax), added to the defaults
    pub ignore_patterns: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            chunk_lines: 200,
            overlap_lines: 20,
            max_file_bytes: 1024 * 1024,
            extensions: [
                "cs", "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "c", "cc",
                "cpp", "h", "hpp", "swift", "rb", "php",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

impl Config {
    /// Load configuration from the process environment and an optional file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, env)
    }

    /// Load configuration using `env` in place of the process environment.
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                for candidate in default_config_paths() {
                    if candidate.exists() {
                        debug!("Loading config from {:?}", candidate);
                        builder = builder
                            .add_source(File::from(candidate.as_path()).format(FileFormat::Toml));
                        break;
                    }
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        let endpoint = env.get(ENDPOINT_ENV).filter(|v| !v.trim().is_empty());
        let api_key = env.get(API_KEY_ENV).filter(|v| !v.trim().is_empty());
        builder = builder
            .set_override_option("embeddings.endpoint", endpoint.cloned())?
            .set_override_option("embeddings.api_key", api_key.cloned())?;

        let config: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config.expand_paths())
    }

    /// Check settings that would otherwise surface as odd runtime behaviour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.chunk_lines == 0 {
            return Err(ConfigError::ZeroChunkLines);
        }
        if self.index.overlap_lines >= self.index.chunk_lines {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.index.overlap_lines,
                chunk: self.index.chunk_lines,
            });
        }
        if self.search.default_top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        Ok(())
    }

    fn expand_paths(mut self) -> Self {
        let raw = self.index.base_dir.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.index.base_dir = PathBuf::from(expanded.as_ref());
        }
        self
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("codeseek").join("config.toml"));
    }
    paths
}

/// Expand `${VAR}` / `~` in an optional setting, treating blank as unset.
fn resolve_optional(value: &Option<String>) -> Option<String> {
    let raw = value.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match shellexpand::full(raw) {
        Ok(expanded) if !expanded.trim().is_empty() => Some(expanded.into_owned()),
        _ => None,
    }
}
