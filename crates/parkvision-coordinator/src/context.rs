// SPDX-License-Identifier: Apache-2.0
//! `Context` — the explicit dependency container (spec §9/§11 REDESIGN
//! FLAGS: "no global mutable state"). Every collaborator the coordinator
//! dispatches to is an explicit field, constructed once at startup and
//! threaded through by reference; nothing here is a lazily-initialized
//! global or a `OnceCell`.

use std::sync::Arc;

use parkvision_cas::ContentStore;
use parkvision_vision::RawVisionProvider;
use parkvision_render::Renderer;
use parkvision_types::Kind;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::AppConfig;
use crate::rate_limit::RateLimitDecision;

/// All collaborators one running coordinator needs, generic over the three
/// swappable components (`ContentStore`, `BlobStore`, `RawVisionProvider`)
/// so production wiring and `parkvision-testkit` fakes share the same
/// dispatch code.
///
/// `content_store` is behind an async mutex because [`ContentStore::ingest`]
/// and [`ContentStore::delete`] take `&mut self`; the other collaborators
/// are internally synchronized and held behind a plain `Arc`.
pub struct Context<S, B, P>
where
    S: ContentStore,
    B: parkvision_blobstore::BlobStore,
    P: RawVisionProvider,
{
    /// Content-addressed image store (C1).
    pub content_store: Arc<AsyncMutex<S>>,
    /// Object storage adapter (C2).
    pub blob_store: Arc<B>,
    /// Vision-provider client (C3).
    pub vision: Arc<parkvision_vision::VisionClient<P>>,
    /// Tiered result cache (C4).
    pub cache: Arc<parkvision_cache::ResultCache>,
    /// Annotation renderer (C6).
    pub renderer: Arc<Renderer>,
    /// Rate-limit collaborator (out of core scope; `AllowAll` by default).
    pub rate_limiter: Arc<dyn RateLimitDecision>,
    /// Effective configuration.
    pub config: Arc<AppConfig>,
}

impl<S, B, P> Context<S, B, P>
where
    S: ContentStore,
    B: parkvision_blobstore::BlobStore,
    P: RawVisionProvider,
{
    /// Wire a new context from its collaborators and configuration.
    pub fn new(
        content_store: S,
        blob_store: B,
        vision_provider: P,
        renderer: Renderer,
        rate_limiter: Arc<dyn RateLimitDecision>,
        config: AppConfig,
    ) -> Self {
        let cache = parkvision_cache::ResultCache::with_config(
            config.cache.max_bytes,
            parkvision_types::EvictionWeights::default(),
            std::time::Duration::from_secs(config.cache.single_flight_timeout_seconds),
        );
        let vision = parkvision_vision::VisionClient::with_policies(
            vision_provider,
            to_retry_policy(&config.retry),
            parkvision_types::CircuitBreakerConfig {
                failure_threshold: config.vision.circuit_breaker_failure_threshold,
                recovery_seconds: config.vision.circuit_breaker_recovery_seconds,
            },
        );
        Self {
            content_store: Arc::new(AsyncMutex::new(content_store)),
            blob_store: Arc::new(blob_store),
            vision: Arc::new(vision),
            cache: Arc::new(cache),
            renderer: Arc::new(renderer),
            rate_limiter,
            config: Arc::new(config),
        }
    }

    /// The cache TTL this context is configured to use for `kind`.
    pub fn ttl_seconds_for(&self, kind: Kind) -> u64 {
        self.config.cache.ttl_seconds_for(kind)
    }
}

fn to_retry_policy(config: &crate::config::RetryConfig) -> parkvision_types::RetryPolicy {
    parkvision_types::RetryPolicy {
        max_attempts: config.max_attempts,
        base_ms: config.base_ms,
        factor: config.factor,
        jitter_pct: config.jitter_pct,
        max_ms: config.max_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::AllowAll;
    use parkvision_cas::MemoryStore;

    #[test]
    fn ttl_seconds_for_falls_back_to_kind_default_when_unconfigured() {
        let config = AppConfig::default();
        assert_eq!(config.cache.ttl_seconds_for(Kind::Detect), Kind::Detect.default_ttl_seconds());
        // `Context::new` needs a `BlobStore`/`RawVisionProvider`, which live in
        // `parkvision-testkit`; the plain config delegation above is exercised
        // directly here to avoid a dev-dependency cycle back onto that crate.
        let _ = MemoryStore::new();
        let _: Arc<dyn RateLimitDecision> = Arc::new(AllowAll);
    }
}
