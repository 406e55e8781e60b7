use anyhow::{Context, Result};
use confyg::{env, Confygery};
use refrain_core::{Encoder, EntityType, NgramRange, Normalization};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "refrain";

/// Sections that can be overridden with `REFRAIN_<SECTION>_<KEY>`.
const ENV_SECTIONS: [&str; 3] = ["index", "encoder", "search"];

/// Configuration for refrain.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. Environment variables (REFRAIN_* prefix, highest priority)
/// 2. Config file (~/.config/refrain/config.toml, or `--config`)
/// 3. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection to the sparse-vector index service.
    #[serde(default)]
    pub index: IndexConfig,

    /// Query tokenization. Must match the offline vocabulary builder.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Request defaults and per-retriever time budget.
    #[serde(default)]
    pub search: SearchSettings,

    /// Index collection and vocabulary artifact per entity type.
    ///
    /// Entity types without an entry get no retriever.
    #[serde(default = "default_collections")]
    pub collections: BTreeMap<EntityType, CollectionConfig>,

    #[serde(default)]
    pub logging: twyg::Opts,
}

/// The `[index]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the index REST API.
    ///
    /// Can be set via:
    /// - ENV: REFRAIN_INDEX_URL
    /// - Config: [index] url = "..."
    pub url: String,

    /// API key sent in the `api-key` header, if the service requires one.
    pub api_key: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(deserialize_with = "from_text_or_value")]
    pub timeout_secs: u64,

    /// Name of the sparse vector within each collection.
    pub vector_name: String,

    /// Retries for transient failures (5xx, 429, timeouts).
    #[serde(deserialize_with = "from_text_or_value")]
    pub max_retries: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            timeout_secs: 10,
            vector_name: "bm25".to_string(),
            max_retries: 2,
        }
    }
}

/// The `[encoder]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    #[serde(deserialize_with = "from_text_or_value")]
    pub ngram_min: usize,
    /// Exclusive.
    #[serde(deserialize_with = "from_text_or_value")]
    pub ngram_max: usize,
    #[serde(deserialize_with = "from_text_or_value")]
    pub lowercase: bool,
    #[serde(deserialize_with = "from_text_or_value")]
    pub trim: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ngram_min: 3,
            ngram_max: 4,
            lowercase: false,
            trim: false,
        }
    }
}

impl EncoderConfig {
    /// Build the query encoder.
    ///
    /// # Errors
    /// Returns an encoding error if the n-gram range is empty or starts at 0.
    pub fn encoder(&self) -> refrain_core::Result<Encoder> {
        let range = NgramRange::new(self.ngram_min, self.ngram_max)?;
        Ok(Encoder::new(
            range,
            Normalization {
                lowercase: self.lowercase,
                trim: self.trim,
            },
        ))
    }
}

/// The `[search]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results per entity type when the caller does not say.
    #[serde(deserialize_with = "from_text_or_value")]
    pub top_k: usize,
    /// Upper bound on a single retriever call, retries included.
    #[serde(deserialize_with = "from_text_or_value")]
    pub task_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            task_timeout_ms: 5000,
        }
    }
}

impl SearchSettings {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

/// A `[collections.<entity type>]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Index collection holding this entity type's sparse vectors.
    pub collection: String,
    /// JSON vocabulary artifact (token -> dimension).
    pub vocab_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            encoder: EncoderConfig::default(),
            search: SearchSettings::default(),
            collections: default_collections(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default file and environment variables.
    ///
    /// Searches for config file at: ~/.config/refrain/config.toml
    /// Reads environment variables with REFRAIN_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `config_path` (if it exists) and the
    /// environment.
    ///
    /// This is used when the --config CLI flag is provided.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        Self::load_layered(config_path, ENV_PREFIX)
    }

    /// File layer, then `<env_prefix>_*` variables on top.
    fn load_layered(config_path: &Path, env_prefix: &str) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        // Variables arrive as strings; numeric and bool fields parse them.
        let mut env_opts = env::Options::with_top_level(env_prefix);
        for section in ENV_SECTIONS {
            env_opts.add_section(section);
        }
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }
}

/// Accept either a native value or its text form.
///
/// Environment overrides are always strings, so `REFRAIN_SEARCH_TOP_K=9`
/// has to deserialize into a `usize` just like `top_k = 9` in the file.
fn from_text_or_value<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrValue<T> {
        Value(T),
        Text(String),
    }

    match TextOrValue::<T>::deserialize(deserializer)? {
        TextOrValue::Value(value) => Ok(value),
        TextOrValue::Text(text) => text.trim().parse().map_err(|e| {
            de::Error::custom(format!("invalid value {text:?}: {e}"))
        }),
    }
}

fn default_collections() -> BTreeMap<EntityType, CollectionConfig> {
    let vocab_dir = default_vocab_dir();
    EntityType::ALL
        .into_iter()
        .map(|ty| {
            (
                ty,
                CollectionConfig {
                    collection: format!("{ty}_sparse"),
                    vocab_path: vocab_dir.join(format!("{ty}.json")),
                },
            )
        })
        .collect()
}

/// Get the default vocabulary directory.
///
/// Returns: ~/.local/share/refrain/vocab (or platform equivalent)
fn default_vocab_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refrain")
        .join("vocab")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/refrain/config.toml
/// - macOS: ~/Library/Application Support/refrain/config.toml
/// - Windows: %APPDATA%\refrain\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refrain")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Refrain Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. Environment variables (REFRAIN_* prefix)
# 2. This config file
# 3. Built-in defaults (lowest priority)

[index]
# Sparse-vector index service (Qdrant REST API)
url = "http://localhost:6333"
#api_key = "your-api-key-here"
timeout_secs = 10
# Name of the sparse vector inside each collection
vector_name = "bm25"
max_retries = 2

[encoder]
# Character n-gram sizes, half-open: [ngram_min, ngram_max)
#
# These, and the normalization flags, must match the settings used when the
# vocabularies were built, or queries will not match anything.
ngram_min = 3
ngram_max = 4
lowercase = false
trim = false

[search]
top_k = 5
# Time budget for one retriever call, retries included
task_timeout_ms = 5000

# One entry per entity type: track, album, artist, playlist, combined.
# Entity types left out are not searched.
[collections.track]
collection = "track_sparse"
vocab_path = "/path/to/vocab/track.json"

[collections.album]
collection = "album_sparse"
vocab_path = "/path/to/vocab/album.json"

[collections.artist]
collection = "artist_sparse"
vocab_path = "/path/to/vocab/artist.json"

[collections.playlist]
collection = "playlist_sparse"
vocab_path = "/path/to/vocab/playlist.json"

[collections.combined]
collection = "combined_sparse"
vocab_path = "/path/to/vocab/combined.json"
"#
}

/// Create the example config file at `config_path` if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.index.url, "http://localhost:6333");
        assert!(config.index.api_key.is_none());
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.collections.len(), 5);
        assert_eq!(
            config.collections[&EntityType::Track].collection,
            "track_sparse"
        );
    }

    #[test]
    fn test_default_encoder_is_valid() {
        let encoder = EncoderConfig::default().encoder().unwrap();
        assert_eq!(encoder.range().sizes(), 3..4);
    }

    #[test]
    fn test_invalid_ngram_range_is_an_encoding_error() {
        let config = EncoderConfig {
            ngram_min: 4,
            ngram_max: 4,
            ..EncoderConfig::default()
        };
        assert!(matches!(
            config.encoder(),
            Err(refrain_core::Error::Encoding(_))
        ));
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml_from_example();
        assert_eq!(config.collections.len(), 5);
        assert_eq!(
            config.collections[&EntityType::Playlist].vocab_path,
            PathBuf::from("/path/to/vocab/playlist.json")
        );
        assert_eq!(config.encoder, EncoderConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[index]
url = "http://index.internal:6333"

[search]
top_k = 8

[collections.track]
collection = "tracks_v2"
vocab_path = "/srv/vocab/track.json"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.index.url, "http://index.internal:6333");
        assert_eq!(config.index.vector_name, "bm25");
        assert_eq!(config.search.top_k, 8);
        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.collections[&EntityType::Track].collection, "tracks_v2");
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert!(config.is_ok());
    }

    #[test]
    fn test_ensure_config_file_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(ensure_config_file(&path).unwrap());
        assert!(!ensure_config_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), example_config());
    }

    #[test]
    fn test_env_overrides_file_and_parses_numbers() {
        // A prefix of its own keeps this isolated from other tests' loads.
        std::env::set_var("REFRAIN_ENVTEST_INDEX_URL", "http://env:1");
        std::env::set_var("REFRAIN_ENVTEST_SEARCH_TOP_K", "9");
        std::env::set_var("REFRAIN_ENVTEST_ENCODER_LOWERCASE", "true");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[index]\nurl = \"http://file:6333\"\ntimeout_secs = 3\n").unwrap();
        let config = Config::load_layered(&path, "refrain_envtest");

        std::env::remove_var("REFRAIN_ENVTEST_INDEX_URL");
        std::env::remove_var("REFRAIN_ENVTEST_SEARCH_TOP_K");
        std::env::remove_var("REFRAIN_ENVTEST_ENCODER_LOWERCASE");

        let config = config.unwrap();
        assert_eq!(config.index.url, "http://env:1");
        assert_eq!(config.index.timeout_secs, 3);
        assert_eq!(config.search.top_k, 9);
        assert!(config.encoder.lowercase);
    }

    #[test]
    fn test_non_numeric_override_is_rejected() {
        std::env::set_var("REFRAIN_BADENV_SEARCH_TOP_K", "lots");
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_layered(&dir.path().join("absent.toml"), "refrain_badenv");
        std::env::remove_var("REFRAIN_BADENV_SEARCH_TOP_K");

        assert!(config.is_err());
    }

    #[test]
    fn test_numeric_fields_accept_text() {
        let settings: SearchSettings =
            serde_json::from_str(r#"{"top_k": "7", "task_timeout_ms": 250}"#).unwrap();
        assert_eq!(settings.top_k, 7);
        assert_eq!(settings.task_timeout(), Duration::from_millis(250));
    }

    fn toml_from_example() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, example_config()).unwrap();
        Config::load_from(&path).unwrap()
    }
}
