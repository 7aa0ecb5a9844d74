// SPDX-License-Identifier: Apache-2.0
//! Cache statistics (spec §4.4 `Stats()`).

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parkvision_types::Kind;

/// Per-kind hit/miss/eviction counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct KindStats {
    /// HIT count.
    pub hits: u64,
    /// MISS count (includes EXPIRED).
    pub misses: u64,
    /// Entries evicted under LRU pressure.
    pub evictions: u64,
}

/// Snapshot returned by [`super::ResultCache::stats`].
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Total HITs across all kinds.
    pub hits: u64,
    /// Total MISSes across all kinds.
    pub misses: u64,
    /// Total evictions across all kinds.
    pub evictions: u64,
    /// Current total bytes stored.
    pub bytes: u64,
    /// `hits / (hits + misses)`, `0.0` if no requests yet.
    pub hit_rate: f64,
    /// Per-kind breakdown.
    pub per_kind: Vec<(Kind, KindStats)>,
}

/// Lock-free counters, one atomic triple per [`Kind`].
#[derive(Default)]
pub struct Counters {
    hits: DashMap<Kind, AtomicU64>,
    misses: DashMap<Kind, AtomicU64>,
    evictions: DashMap<Kind, AtomicU64>,
}

impl Counters {
    pub fn record_hit(&self, kind: Kind) {
        self.hits.entry(kind).or_default().fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, kind: Kind) {
        self.misses.entry(kind).or_default().fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self, kind: Kind) {
        self.evictions
            .entry(kind)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, bytes: u64) -> StatsSnapshot {
        let mut per_kind = Vec::with_capacity(Kind::ALL.len());
        let mut hits = 0u64;
        let mut misses = 0u64;
        let mut evictions = 0u64;
        for kind in Kind::ALL {
            let kind_hits = self
                .hits
                .get(&kind)
                .map_or(0, |v| v.load(Ordering::Relaxed));
            let kind_misses = self
                .misses
                .get(&kind)
                .map_or(0, |v| v.load(Ordering::Relaxed));
            let kind_evictions = self
                .evictions
                .get(&kind)
                .map_or(0, |v| v.load(Ordering::Relaxed));
            hits += kind_hits;
            misses += kind_misses;
            evictions += kind_evictions;
            per_kind.push((
                kind,
                KindStats {
                    hits: kind_hits,
                    misses: kind_misses,
                    evictions: kind_evictions,
                },
            ));
        }
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };
        StatsSnapshot {
            hits,
            misses,
            evictions,
            bytes,
            hit_rate,
            per_kind,
        }
    }
}
