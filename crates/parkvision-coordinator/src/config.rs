// SPDX-License-Identifier: Apache-2.0
//! `AppConfig` — the typed configuration root (spec §6 "Configuration
//! options"), and a storage-agnostic `ConfigStore`/`ConfigService` split so
//! persistence (`parkvision-config-fs`) stays decoupled from the schema.

use std::collections::BTreeMap;

use parkvision_types::Kind;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Cache tuning (spec §6): byte budget, per-kind TTL overrides, single-flight
/// wait timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total cache budget in bytes before eviction runs.
    pub max_bytes: u64,
    /// Per-kind TTL overrides, in seconds. Kinds absent here use
    /// [`Kind::default_ttl_seconds`].
    pub ttl_overrides_seconds: BTreeMap<Kind, u64>,
    /// How long a waiter blocks on an in-flight single-flight computation.
    pub single_flight_timeout_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 512 * 1024 * 1024,
            ttl_overrides_seconds: BTreeMap::new(),
            single_flight_timeout_seconds: 60,
        }
    }
}

impl CacheConfig {
    /// Effective TTL for `kind`: the configured override, or the spec §4.4
    /// table default.
    pub fn ttl_seconds_for(&self, kind: Kind) -> u64 {
        self.ttl_overrides_seconds
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_ttl_seconds())
    }
}

/// Vision-provider circuit breaker tuning (spec §6, §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Consecutive failures before the circuit opens.
    pub circuit_breaker_failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open probe.
    pub circuit_breaker_recovery_seconds: u64,
    /// Per-call timeout in seconds (spec §5: 15s default).
    pub call_timeout_seconds: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_failure_threshold: 5,
            circuit_breaker_recovery_seconds: 60,
            call_timeout_seconds: 15,
        }
    }
}

/// Shared retry/backoff tuning (spec §6, §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub base_ms: u64,
    /// Multiplicative backoff factor.
    pub factor: f64,
    /// Jitter as a fraction of the computed delay.
    pub jitter_pct: f64,
    /// Hard cap on any single delay.
    pub max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_ms: 200,
            factor: 2.0,
            jitter_pct: 0.25,
            max_ms: 10_000,
        }
    }
}

/// Batch orchestrator tuning (spec §6, §4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker pool size. `None` uses `min(32, 4 * num_cpus)`.
    pub default_concurrency: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { default_concurrency: None }
    }
}

/// Natural-element analyzer tuning (spec §6, §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Minimum label confidence considered during category/seasonal scoring.
    pub confidence_threshold: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { confidence_threshold: 0.3 }
    }
}

/// The full typed configuration root (spec §6). Every field has a default
/// equal to the spec's stated default, so a missing or empty config file
/// behaves identically to the hardcoded defaults in each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum accepted upload size, in bytes.
    pub max_upload_bytes: u64,
    /// Lowercase MIME subtype names accepted by `UploadImage` (e.g. `"jpeg"`).
    pub allowed_mime_types: Vec<String>,
    /// Max Hamming distance for `CheckDuplicate`/`find_similar`.
    pub similarity_hamming_threshold: u32,
    /// Cache tuning.
    pub cache: CacheConfig,
    /// Vision-provider tuning.
    pub vision: VisionConfig,
    /// Shared retry/backoff tuning.
    pub retry: RetryConfig,
    /// Batch orchestrator tuning.
    pub batch: BatchConfig,
    /// Natural-element analyzer tuning.
    pub analyzer: AnalyzerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10_485_760,
            allowed_mime_types: vec![
                "jpeg".to_owned(),
                "png".to_owned(),
                "gif".to_owned(),
                "bmp".to_owned(),
                "webp".to_owned(),
            ],
            similarity_hamming_threshold: 5,
            cache: CacheConfig::default(),
            vision: VisionConfig::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Storage port for raw config blobs, keyed by logical name (e.g.
/// `"config"`, `"versions"`). Kept generic over the blob shape so the same
/// trait backs both `AppConfig` persistence and the per-kind version
/// counters.
pub trait ConfigStore {
    /// Load a raw blob. Returns [`ConfigError::NotFound`] when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in the store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Thin service that serializes config values and delegates storage to a
/// [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize a config value for `key`. Returns `Ok(None)` if
    /// the key is absent.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load `key`, falling back to `T::default()` when absent.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Serialize and persist a config value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MemoryConfigStore {
        blobs: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl MemoryConfigStore {
        fn new() -> Self {
            Self { blobs: RefCell::new(HashMap::new()) }
        }
    }

    impl ConfigStore for MemoryConfigStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.blobs.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.blobs.borrow_mut().insert(key.to_owned(), data.to_owned());
            Ok(())
        }
    }

    #[test]
    fn default_app_config_matches_spec_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert_eq!(config.similarity_hamming_threshold, 5);
        assert_eq!(config.cache.max_bytes, 512 * 1024 * 1024);
        assert_eq!(config.vision.circuit_breaker_failure_threshold, 5);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.analyzer.confidence_threshold, 0.3);
    }

    #[test]
    fn ttl_override_takes_precedence_over_table_default() {
        let mut config = CacheConfig::default();
        config.ttl_overrides_seconds.insert(Kind::Detect, 10);
        assert_eq!(config.ttl_seconds_for(Kind::Detect), 10);
        assert_eq!(config.ttl_seconds_for(Kind::Nature), Kind::Nature.default_ttl_seconds());
    }

    #[test]
    fn service_round_trips_through_store() {
        let service = ConfigService::new(MemoryConfigStore::new());
        service.save("config", &AppConfig::default()).unwrap();
        let loaded: AppConfig = service.load("config").unwrap().unwrap();
        assert_eq!(loaded.max_upload_bytes, AppConfig::default().max_upload_bytes);
    }

    #[test]
    fn missing_key_loads_as_none() {
        let service = ConfigService::new(MemoryConfigStore::new());
        let loaded: Option<AppConfig> = service.load("config").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_or_default_falls_back() {
        let service = ConfigService::new(MemoryConfigStore::new());
        let loaded: AppConfig = service.load_or_default("config").unwrap();
        assert_eq!(loaded.max_upload_bytes, AppConfig::default().max_upload_bytes);
    }
}
