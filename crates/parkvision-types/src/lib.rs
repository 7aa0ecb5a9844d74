// SPDX-License-Identifier: Apache-2.0
//! Shared domain types for the parkvision image-analysis serving layer.
//!
//! This crate has no I/O and no component-specific logic — it is the vocabulary
//! every other `parkvision-*` crate speaks: the data model from the spec
//! (`ImageRecord`, `CacheKey`, `CacheEntry`, the `AnalysisArtifact` union,
//! `BatchJob`), the error taxonomy, and the response envelope.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod artifact;
pub mod batch;
pub mod cache_key;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod image_record;
pub mod primitives;
pub mod retry;

pub use artifact::{
    AnalysisArtifact, AnnotatedImageArtifact, AnnotationStats, BoundingBox, CategoryCoverage,
    ColorAnalysis, ConfidenceStats, Detection, DetectionArtifact, DominantColor, Face,
    FaceArtifact, ImageFormat, Landmark, Likelihood, NatureArtifact, Season, SeasonalAnalysis,
    VegetationHealth, VegetationStatus,
};
pub use batch::{BatchItemError, BatchItemResult, BatchSummary};
pub use cache_key::{CacheEntryMeta, CacheKey, EvictionWeights, Kind};
pub use envelope::{Envelope, ErrorPayload};
pub use error::{CoreError, ErrorCode};
pub use fingerprint::param_fingerprint;
pub use image_record::{ImageRecord, MimeType};
pub use primitives::{
    FeatureError, PrimitiveBundle, RawDominantColor, RawFace, RawLabel, RawObject, VisionFeature,
};
pub use retry::{CircuitBreakerConfig, CircuitState, RetryPolicy};
