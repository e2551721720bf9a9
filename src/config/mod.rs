//! Configuration management.

use crate::models::SourceType;
use serde::Deserialize;
use std::time::Duration;

/// Runtime configuration for the retrieval engine.
///
/// The defaults mirror the canonical pipeline: three results per
/// personal source, five from the reference corpus, a 0.2 base
/// similarity threshold, and a one-hour embedding-cache TTL. Historical
/// call sites used ad hoc thresholds (0.2 / 0.25 / 0.3); 0.2 is the
/// canonical base and anything else is an explicit per-source override.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum results from the notes collection.
    pub note_limit: usize,
    /// Maximum results from the uploaded-documents collection.
    pub document_limit: usize,
    /// Maximum results from the reference corpus.
    pub reference_limit: usize,
    /// Base similarity threshold applied at the index.
    pub base_threshold: f32,
    /// Optional per-source threshold override for notes.
    pub note_threshold: Option<f32>,
    /// Optional per-source threshold override for documents.
    pub document_threshold: Option<f32>,
    /// Optional per-source threshold override for the reference corpus.
    pub reference_threshold: Option<f32>,
    /// Floor for the adaptive threshold policy.
    pub adaptive_min: f32,
    /// Ceiling for the adaptive threshold policy.
    pub adaptive_max: f32,
    /// Embedding-cache entry time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Embedding-cache capacity (entries); LRU eviction beyond this.
    pub cache_capacity: usize,
    /// Whether to expand queries with domain synonyms.
    pub expand_query: bool,
    /// Whether to rerank the notes source.
    pub rerank_notes: bool,
    /// Over-fetch multiplier for sources that are reranked.
    pub rerank_overfetch: usize,
    /// Per-source search timeout in milliseconds.
    pub source_timeout_ms: u64,
    /// Maximum embedding-provider attempts per call.
    pub retry_max_attempts: u32,
    /// Base delay for exponential retry backoff in milliseconds.
    pub retry_base_delay_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            note_limit: 3,
            document_limit: 3,
            reference_limit: 5,
            base_threshold: 0.2,
            note_threshold: None,
            document_threshold: None,
            reference_threshold: None,
            adaptive_min: 0.2,
            adaptive_max: 0.7,
            cache_ttl_secs: 3600,
            cache_capacity: 1024,
            expand_query: true,
            rerank_notes: true,
            rerank_overfetch: 2,
            source_timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 2_000,
        }
    }
}

impl RetrievalConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`~/Library/Application Support/medrag/`
    /// on macOS) and then `~/.config/medrag/` for Unix compatibility.
    /// Returns defaults if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("medrag").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("medrag")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Applies environment variable overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `MEDRAG_BASE_THRESHOLD` | `base_threshold` |
    /// | `MEDRAG_NOTE_LIMIT` | `note_limit` |
    /// | `MEDRAG_DOCUMENT_LIMIT` | `document_limit` |
    /// | `MEDRAG_REFERENCE_LIMIT` | `reference_limit` |
    /// | `MEDRAG_CACHE_TTL_SECS` | `cache_ttl_secs` |
    /// | `MEDRAG_SOURCE_TIMEOUT_MS` | `source_timeout_ms` |
    /// | `MEDRAG_EXPAND_QUERY` | `expand_query` |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MEDRAG_BASE_THRESHOLD")
            && let Ok(parsed) = v.parse::<f32>()
        {
            self.base_threshold = parsed;
        }
        if let Ok(v) = std::env::var("MEDRAG_NOTE_LIMIT")
            && let Ok(parsed) = v.parse::<usize>()
        {
            self.note_limit = parsed.max(1);
        }
        if let Ok(v) = std::env::var("MEDRAG_DOCUMENT_LIMIT")
            && let Ok(parsed) = v.parse::<usize>()
        {
            self.document_limit = parsed.max(1);
        }
        if let Ok(v) = std::env::var("MEDRAG_REFERENCE_LIMIT")
            && let Ok(parsed) = v.parse::<usize>()
        {
            self.reference_limit = parsed.max(1);
        }
        if let Ok(v) = std::env::var("MEDRAG_CACHE_TTL_SECS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.cache_ttl_secs = parsed;
        }
        if let Ok(v) = std::env::var("MEDRAG_SOURCE_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.source_timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("MEDRAG_EXPAND_QUERY") {
            self.expand_query = v.to_lowercase() == "true" || v == "1";
        }
        self
    }

    /// Sets the per-source result limit for every source at once.
    #[must_use]
    pub const fn with_limits(mut self, notes: usize, documents: usize, reference: usize) -> Self {
        self.note_limit = notes;
        self.document_limit = documents;
        self.reference_limit = reference;
        self
    }

    /// Sets the base similarity threshold.
    #[must_use]
    pub const fn with_base_threshold(mut self, threshold: f32) -> Self {
        self.base_threshold = threshold;
        self
    }

    /// Sets the embedding-cache TTL in seconds.
    #[must_use]
    pub const fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Sets the per-source search timeout in milliseconds.
    #[must_use]
    pub const fn with_source_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.source_timeout_ms = timeout_ms;
        self
    }

    /// Enables or disables query expansion.
    #[must_use]
    pub const fn with_expand_query(mut self, enabled: bool) -> Self {
        self.expand_query = enabled;
        self
    }

    /// Enables or disables notes reranking.
    #[must_use]
    pub const fn with_rerank_notes(mut self, enabled: bool) -> Self {
        self.rerank_notes = enabled;
        self
    }

    /// Effective base threshold for a source, honoring overrides.
    #[must_use]
    pub const fn threshold_for(&self, source: SourceType) -> f32 {
        let override_value = match source {
            SourceType::Notes => self.note_threshold,
            SourceType::Documents => self.document_threshold,
            SourceType::Reference => self.reference_threshold,
        };
        match override_value {
            Some(t) => t,
            None => self.base_threshold,
        }
    }

    /// Configured result limit for a source.
    #[must_use]
    pub const fn limit_for(&self, source: SourceType) -> usize {
        match source {
            SourceType::Notes => self.note_limit,
            SourceType::Documents => self.document_limit,
            SourceType::Reference => self.reference_limit,
        }
    }

    /// Per-source search timeout as a [`Duration`].
    #[must_use]
    pub const fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Embedding-cache TTL as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Provider retry policy assembled from the retry fields, for
    /// wrapping an embedding provider in a
    /// [`RetryingProvider`](crate::embedding::RetryingProvider).
    #[must_use]
    pub const fn retry_policy(&self) -> crate::embedding::RetryPolicy {
        crate::embedding::RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Converts a `ConfigFile` to a `RetrievalConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(limits) = file.limits {
            if let Some(v) = limits.notes {
                config.note_limit = v;
            }
            if let Some(v) = limits.documents {
                config.document_limit = v;
            }
            if let Some(v) = limits.reference {
                config.reference_limit = v;
            }
        }
        if let Some(thresholds) = file.thresholds {
            if let Some(v) = thresholds.base {
                config.base_threshold = v;
            }
            config.note_threshold = thresholds.notes;
            config.document_threshold = thresholds.documents;
            config.reference_threshold = thresholds.reference;
            if let Some(v) = thresholds.adaptive_min {
                config.adaptive_min = v;
            }
            if let Some(v) = thresholds.adaptive_max {
                config.adaptive_max = v;
            }
        }
        if let Some(cache) = file.cache {
            if let Some(v) = cache.ttl_secs {
                config.cache_ttl_secs = v;
            }
            if let Some(v) = cache.capacity {
                config.cache_capacity = v.max(1);
            }
        }
        if let Some(pipeline) = file.pipeline {
            if let Some(v) = pipeline.expand_query {
                config.expand_query = v;
            }
            if let Some(v) = pipeline.rerank_notes {
                config.rerank_notes = v;
            }
            if let Some(v) = pipeline.rerank_overfetch {
                config.rerank_overfetch = v.max(1);
            }
            if let Some(v) = pipeline.source_timeout_ms {
                config.source_timeout_ms = v;
            }
        }
        if let Some(retry) = file.retry {
            if let Some(v) = retry.max_attempts {
                config.retry_max_attempts = v.max(1);
            }
            if let Some(v) = retry.base_delay_ms {
                config.retry_base_delay_ms = v;
            }
        }

        config
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Per-source result limits.
    pub limits: Option<ConfigFileLimits>,
    /// Similarity thresholds.
    pub thresholds: Option<ConfigFileThresholds>,
    /// Embedding-cache settings.
    pub cache: Option<ConfigFileCache>,
    /// Pipeline toggles.
    pub pipeline: Option<ConfigFilePipeline>,
    /// Embedding-provider retry policy.
    pub retry: Option<ConfigFileRetry>,
}

/// Limits section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLimits {
    /// Notes limit.
    pub notes: Option<usize>,
    /// Documents limit.
    pub documents: Option<usize>,
    /// Reference corpus limit.
    pub reference: Option<usize>,
}

/// Thresholds section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileThresholds {
    /// Canonical base threshold.
    pub base: Option<f32>,
    /// Notes override.
    pub notes: Option<f32>,
    /// Documents override.
    pub documents: Option<f32>,
    /// Reference corpus override.
    pub reference: Option<f32>,
    /// Adaptive policy floor.
    pub adaptive_min: Option<f32>,
    /// Adaptive policy ceiling.
    pub adaptive_max: Option<f32>,
}

/// Cache section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// Entry TTL in seconds.
    pub ttl_secs: Option<u64>,
    /// Maximum number of entries.
    pub capacity: Option<usize>,
}

/// Pipeline section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePipeline {
    /// Query-expansion toggle.
    pub expand_query: Option<bool>,
    /// Notes-rerank toggle.
    pub rerank_notes: Option<bool>,
    /// Over-fetch multiplier for reranked sources.
    pub rerank_overfetch: Option<usize>,
    /// Per-source timeout in milliseconds.
    pub source_timeout_ms: Option<u64>,
}

/// Retry section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetry {
    /// Maximum attempts.
    pub max_attempts: Option<u32>,
    /// Exponential backoff base delay in milliseconds.
    pub base_delay_ms: Option<u64>,
}
