// SPDX-License-Identifier: Apache-2.0
//! Request dispatch (spec §4.8): `Received -> Validated -> IngestIfMissing ->
//! KeyComputed -> CacheLookup -> {Hit -> Respond} | {Miss -> Compute ->
//! CachePut -> Respond} -> (Errored)`, one method per external operation in
//! spec §6.

use std::sync::Arc;

use parkvision_blobstore::BlobStore;
use parkvision_cas::ContentStore;
use parkvision_types::{
    param_fingerprint, AnalysisArtifact, AnnotatedImageArtifact, CacheKey, CoreError,
    DetectionArtifact, FaceArtifact, ImageRecord, Kind, NatureArtifact, VisionFeature,
};
use parkvision_vision::{RawVisionProvider, VisionError};
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::requests::{
    AnalyzeNatureRequest, AnalyzeRequest, CheckDuplicateResponse, ClearCacheRequest,
    DownloadAnnotatedRequest, DownloadAnnotatedResponse, ListImagesRequest, ListImagesResponse,
    StatsResponse, UploadImageRequest, UploadImageResponse, UploadStatus,
};
use crate::validate;

fn vision_unavailable(err: VisionError) -> CoreError {
    match err {
        VisionError::ServiceUnavailable { retry_after_seconds } => CoreError::ServiceUnavailable {
            message: "vision circuit is open".to_owned(),
            retry_after_seconds,
        },
        VisionError::Transient { message } => CoreError::VisionService {
            message,
            transient: true,
            retry_after_seconds: None,
        },
        VisionError::Terminal { message } => CoreError::VisionService {
            message,
            transient: false,
            retry_after_seconds: None,
        },
    }
}

fn storage_error(err: parkvision_blobstore::BlobStoreError) -> CoreError {
    CoreError::Storage {
        transient: matches!(err, parkvision_blobstore::BlobStoreError::Transient { .. }),
        message: err.to_string(),
    }
}

fn features_for(kind: Kind) -> Vec<VisionFeature> {
    match kind {
        Kind::Detect => vec![VisionFeature::Label, VisionFeature::ObjectLocalization],
        Kind::Faces => vec![VisionFeature::Face],
        Kind::Nature => vec![VisionFeature::Label, VisionFeature::ImageProperties],
        Kind::Annotate => vec![
            VisionFeature::Label,
            VisionFeature::ObjectLocalization,
            VisionFeature::Face,
        ],
        Kind::Segment | Kind::Extract | Kind::Batch => vec![VisionFeature::Label],
    }
}

impl<S, B, P> Context<S, B, P>
where
    S: ContentStore,
    B: BlobStore,
    P: RawVisionProvider,
{
    /// `UploadImage` (spec §6): hash-first dedup, blob write only on a new
    /// hash, then `ContentStore::ingest` records the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an unsupported MIME type or an
    /// oversized upload, or [`CoreError::Storage`] if the blob write fails.
    pub async fn upload_image(
        &self,
        request: UploadImageRequest,
        now_unix_ms: u64,
    ) -> Result<UploadImageResponse, CoreError> {
        self.rate_limiter.check("upload")?;
        let mime = crate::validate::mime_type(&request.mime, &self.config.allowed_mime_types)?;
        if request.bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(CoreError::Validation {
                message: format!(
                    "upload size {} exceeds max {}",
                    request.bytes.len(),
                    self.config.max_upload_bytes
                ),
            });
        }

        let hash = parkvision_cas::image_hash(&request.bytes);
        let existing = {
            let store = self.content_store.lock().await;
            store.lookup(&hash)
        };

        let blob_url = match existing.and_then(|record| record.blob_url) {
            Some(url) => url,
            None => {
                let object_name = parkvision_blobstore::original_object_name(&hash, mime.extension());
                self.blob_store
                    .put(&object_name, request.bytes.clone(), &request.mime)
                    .await
                    .map_err(storage_error)?
            }
        };

        let mut store = self.content_store.lock().await;
        let result = store
            .ingest(&request.bytes, &request.filename, mime, blob_url, now_unix_ms)
            .map_err(|err| match err {
                parkvision_cas::CasError::Validation { message } => CoreError::Validation { message },
                parkvision_cas::CasError::Storage { message } => CoreError::Storage {
                    message,
                    transient: false,
                },
            })?;

        Ok(match result {
            parkvision_cas::IngestResult::Stored { record } => UploadImageResponse {
                image_hash: record.image_hash,
                perceptual_hash: record.perceptual_hash,
                status: UploadStatus::Stored,
                similar_images: Vec::new(),
            },
            parkvision_cas::IngestResult::Duplicate { record } => UploadImageResponse {
                image_hash: record.image_hash,
                perceptual_hash: record.perceptual_hash,
                status: UploadStatus::Duplicate,
                similar_images: Vec::new(),
            },
            parkvision_cas::IngestResult::Similar { record, similar } => UploadImageResponse {
                image_hash: record.image_hash,
                perceptual_hash: record.perceptual_hash,
                status: UploadStatus::Similar,
                similar_images: similar.into_iter().map(|r| r.image_hash).collect(),
            },
        })
    }

    /// `GetImageInfo` (spec §6).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown.
    pub async fn get_image_info(&self, image_hash: &str) -> Result<ImageRecord, CoreError> {
        validate::image_hash(image_hash)?;
        let store = self.content_store.lock().await;
        store.lookup(image_hash).ok_or_else(|| CoreError::NotFound {
            what: format!("image_hash {image_hash}"),
        })
    }

    /// `ListImages` (spec §6), paginated over live (non-tombstoned) records.
    pub async fn list_images(&self, request: ListImagesRequest) -> ListImagesResponse {
        let store = self.content_store.lock().await;
        let live = store.list_live();
        let total = live.len();
        let page_size = request.page_size.max(1);
        let start = request.page.saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);
        ListImagesResponse {
            records: live[start..end].to_vec(),
            total,
        }
    }

    /// `DeleteImage` (spec §6): tombstones the record, deletes the original
    /// blob, and purges every cache entry keyed to `image_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown.
    pub async fn delete_image(&self, image_hash: &str) -> Result<(), CoreError> {
        self.rate_limiter.check(image_hash)?;
        validate::image_hash(image_hash)?;
        let record = {
            let store = self.content_store.lock().await;
            store.lookup(image_hash)
        }
        .ok_or_else(|| CoreError::NotFound {
            what: format!("image_hash {image_hash}"),
        })?;

        if record.blob_url.is_some() {
            let object_name = parkvision_blobstore::original_object_name(image_hash, record.mime_type.extension());
            if let Err(err) = self.blob_store.delete(&object_name).await {
                tracing::warn!(image_hash, %err, "failed to delete original blob, tombstoning metadata anyway");
            }
        }

        {
            let mut store = self.content_store.lock().await;
            store.delete(image_hash);
        }
        self.cache.clear_for_image(image_hash);
        Ok(())
    }

    /// `CheckDuplicate` (spec §6): near-duplicates of `image_hash` under the
    /// configured perceptual-hash threshold, excluding `image_hash` itself.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown.
    pub async fn check_duplicate(&self, image_hash: &str) -> Result<CheckDuplicateResponse, CoreError> {
        let record = self.get_image_info(image_hash).await?;
        let store = self.content_store.lock().await;
        let matches = store.find_similar(&record.perceptual_hash, self.config.similarity_hamming_threshold);

        let mut exact_matches = Vec::new();
        let mut similar_images = Vec::new();
        for candidate in matches {
            if candidate.image_hash == image_hash {
                continue;
            }
            let distance =
                parkvision_cas::hamming_distance(&candidate.perceptual_hash, &record.perceptual_hash);
            if distance == 0 {
                exact_matches.push(candidate.image_hash);
            } else {
                similar_images.push((candidate.image_hash, distance));
            }
        }
        Ok(CheckDuplicateResponse {
            is_duplicate: !exact_matches.is_empty(),
            exact_matches,
            similar_images,
        })
    }

    /// `Analyze` (spec §6, §4.8): cache lookup keyed by
    /// `(kind, version, image_hash, param_fingerprint)`, dispatching to the
    /// vision provider on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown or
    /// tombstoned, [`CoreError::Validation`] if `kind` is not one this
    /// operation dispatches (`Nature`/`Annotate`/`Batch` have their own
    /// operations), or the vision/storage error a failed compute surfaced.
    pub async fn analyze(
        &self,
        request: AnalyzeRequest,
        now_unix_ms: u64,
    ) -> Result<(AnalysisArtifact, bool), CoreError> {
        self.rate_limiter.check(&request.image_hash)?;
        if !matches!(request.kind, Kind::Detect | Kind::Faces) {
            return Err(CoreError::Validation {
                message: format!("{:?} is not dispatched through Analyze", request.kind),
            });
        }
        let record = self.get_image_info(&request.image_hash).await?;
        let object_name = record
            .blob_url
            .is_some()
            .then(|| parkvision_blobstore::original_object_name(&request.image_hash, record.mime_type.extension()))
            .ok_or_else(|| CoreError::NotFound {
                what: format!("live blob for image_hash {}", request.image_hash),
            })?;

        let kind = request.kind;
        let version = self.cache.current_version(kind);
        let fingerprint = param_fingerprint(&request.params);
        let key = CacheKey::new(kind, version, request.image_hash.clone(), fingerprint);
        let ttl_seconds = self.ttl_seconds_for(kind);
        let blob_store = Arc::clone(&self.blob_store);
        let vision = Arc::clone(&self.vision);

        let compute = move || async move {
            let bytes = blob_store.get(&object_name).await.map_err(storage_error)?;
            let bundle = vision
                .annotate(&bytes, &features_for(kind))
                .await
                .map_err(vision_unavailable)?;
            match kind {
                Kind::Detect => Ok(AnalysisArtifact::Detect(DetectionArtifact {
                    detections: crate::translate::detections_from_objects(
                        bundle.objects.as_deref().unwrap_or_default(),
                    ),
                })),
                Kind::Faces => Ok(AnalysisArtifact::Faces(FaceArtifact {
                    faces: crate::translate::faces_from_raw(bundle.faces.as_deref().unwrap_or_default()),
                })),
                other => Err(CoreError::Processing {
                    operation: "analyze".to_owned(),
                    context: format!("unexpected kind {other:?} reached Analyze's compute step"),
                }),
            }
        };

        if request.force_refresh {
            let artifact = compute().await?;
            self.cache.put(&key, artifact.clone(), ttl_seconds, request.params, now_unix_ms);
            Ok((artifact, false))
        } else {
            self.cache
                .get_or_compute(&key, ttl_seconds, request.params, now_unix_ms, compute)
                .await
        }
    }

    /// `AnalyzeNature` (spec §6, §4.5): distinct from [`Self::analyze`]
    /// because its cache key also folds in `confidence_threshold`, which
    /// changes the scored output without changing what was requested of the
    /// vision provider.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown or
    /// tombstoned, or [`CoreError::Validation`] if `confidence_threshold` is
    /// out of range.
    pub async fn analyze_nature(
        &self,
        request: AnalyzeNatureRequest,
        now_unix_ms: u64,
    ) -> Result<(AnalysisArtifact, bool), CoreError> {
        self.rate_limiter.check(&request.image_hash)?;
        validate::confidence_threshold(request.confidence_threshold)?;
        let record = self.get_image_info(&request.image_hash).await?;
        let object_name = record
            .blob_url
            .is_some()
            .then(|| parkvision_blobstore::original_object_name(&request.image_hash, record.mime_type.extension()))
            .ok_or_else(|| CoreError::NotFound {
                what: format!("live blob for image_hash {}", request.image_hash),
            })?;

        let version = self.cache.current_version(Kind::Nature);
        let params = serde_json::json!({ "confidence_threshold": request.confidence_threshold });
        let fingerprint = param_fingerprint(&params);
        let key = CacheKey::new(Kind::Nature, version, request.image_hash.clone(), fingerprint);
        let ttl_seconds = self.ttl_seconds_for(Kind::Nature);
        let blob_store = Arc::clone(&self.blob_store);
        let vision = Arc::clone(&self.vision);
        let confidence_threshold = request.confidence_threshold;

        let compute = move || async move {
            let bytes = blob_store.get(&object_name).await.map_err(storage_error)?;
            let bundle = vision
                .annotate(&bytes, &features_for(Kind::Nature))
                .await
                .map_err(vision_unavailable)?;
            let artifact: NatureArtifact = parkvision_nature::analyze(&bundle, confidence_threshold);
            Ok(AnalysisArtifact::Nature(artifact))
        };

        if request.force_refresh {
            let artifact = compute().await?;
            self.cache.put(&key, artifact.clone(), ttl_seconds, params, now_unix_ms);
            Ok((artifact, false))
        } else {
            self.cache.get_or_compute(&key, ttl_seconds, params, now_unix_ms, compute).await
        }
    }

    /// `DownloadAnnotated` (spec §6, §4.6): computes (or replays from cache)
    /// a rendered overlay and uploads it to the blob store, returning a URL
    /// rather than the bytes themselves.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `image_hash` is unknown or
    /// tombstoned, [`CoreError::Validation`] for an out-of-range render
    /// parameter, or the vision/storage/render error a failed compute
    /// surfaced.
    pub async fn download_annotated(
        &self,
        request: DownloadAnnotatedRequest,
        now_unix_ms: u64,
    ) -> Result<DownloadAnnotatedResponse, CoreError> {
        self.rate_limiter.check(&request.image_hash)?;
        validate::quality(request.render_request.quality)?;
        validate::confidence_threshold(request.render_request.confidence_threshold)?;
        let record = self.get_image_info(&request.image_hash).await?;
        let object_name = record
            .blob_url
            .is_some()
            .then(|| parkvision_blobstore::original_object_name(&request.image_hash, record.mime_type.extension()))
            .ok_or_else(|| CoreError::NotFound {
                what: format!("live blob for image_hash {}", request.image_hash),
            })?;

        let version = self.cache.current_version(Kind::Annotate);
        let fingerprint = param_fingerprint(&request.render_request);
        let key = CacheKey::new(Kind::Annotate, version, request.image_hash.clone(), fingerprint);
        let params_json = serde_json::to_value(&request.render_request).unwrap_or(serde_json::Value::Null);

        let ttl_seconds = self.ttl_seconds_for(Kind::Annotate);
        let blob_store = Arc::clone(&self.blob_store);
        let vision = Arc::clone(&self.vision);
        let renderer = Arc::clone(&self.renderer);
        let render_request = request.render_request.clone();
        let image_hash = request.image_hash.clone();
        let format = render_request.format;

        let (artifact, from_cache) = self
            .cache
            .get_or_compute(&key, ttl_seconds, params_json, now_unix_ms, move || async move {
                let bytes = blob_store.get(&object_name).await.map_err(storage_error)?;
                let bundle = vision
                    .annotate(&bytes, &features_for(Kind::Annotate))
                    .await
                    .map_err(vision_unavailable)?;
                let detections = crate::translate::detections_from_objects(bundle.objects.as_deref().unwrap_or_default());
                let faces = crate::translate::faces_from_raw(bundle.faces.as_deref().unwrap_or_default());

                let rendered = renderer
                    .render(&bytes, &detections, &faces, &render_request)
                    .map_err(|err| CoreError::Processing {
                        operation: "annotate".to_owned(),
                        context: err.to_string(),
                    })?;

                let annotation_id = parkvision_types::param_fingerprint(&(&image_hash, &render_request));
                let annotated_name = parkvision_blobstore::annotated_object_name(&annotation_id, format.extension());
                let blob_url = blob_store
                    .put(&annotated_name, rendered.bytes.clone(), format.mime_type())
                    .await
                    .map_err(storage_error)?;

                Ok(AnalysisArtifact::Annotate(AnnotatedImageArtifact {
                    blob_url,
                    format,
                    width: rendered.width,
                    height: rendered.height,
                    size_bytes: rendered.bytes.len() as u64,
                    stats: rendered.stats,
                }))
            })
            .await?;

        match artifact {
            AnalysisArtifact::Annotate(annotated) => Ok(DownloadAnnotatedResponse {
                annotated_blob_url: annotated.blob_url,
                size_bytes: annotated.size_bytes,
                stats: annotated.stats,
                format: annotated.format,
                from_cache,
            }),
            _ => Err(CoreError::Processing {
                operation: "annotate".to_owned(),
                context: "cache returned a non-Annotate artifact for an Annotate key".to_owned(),
            }),
        }
    }

    /// Current per-kind cache version counters (spec §6 `InvalidateVersion`).
    pub fn invalidate_version(&self, kind: Kind) -> u64 {
        self.cache.invalidate_version(kind)
    }

    /// `Stats` (spec §6): cache counters plus the live image count.
    pub async fn stats(&self) -> StatsResponse {
        let store = self.content_store.lock().await;
        StatsResponse {
            cache: self.cache.stats(),
            live_image_count: store.list_live().len(),
        }
    }

    /// `ClearCache` (spec §6): drops either every entry, or only those
    /// keyed to one `image_hash`.
    pub fn clear_cache(&self, request: ClearCacheRequest) -> usize {
        match request.image_hash {
            Some(image_hash) => self.cache.clear_for_image(&image_hash),
            None => self.cache.clear_all(),
        }
    }

    /// `BatchAnalyze` (spec §6, §4.7): delegates the worker pool and
    /// single-flight collapsing to [`parkvision_batch::batch_analyze`], with
    /// `compute` wired to the same dispatch [`Self::analyze`] uses.
    pub async fn batch_analyze(
        &self,
        request: parkvision_batch::BatchRequest,
        cancel: CancellationToken,
        now_unix_ms: u64,
    ) -> parkvision_batch::BatchResult {
        if self.rate_limiter.check("batch").is_err() {
            let total = (request.image_hashes.len() * request.kinds.len()) as u32;
            return parkvision_batch::BatchResult {
                summary: parkvision_types::BatchSummary {
                    total,
                    failed: total,
                    ..parkvision_types::BatchSummary::default()
                },
                items: Vec::new(),
                partial: true,
            };
        }
        let content_store = Arc::clone(&self.content_store);
        let blob_store = Arc::clone(&self.blob_store);
        let vision = Arc::clone(&self.vision);

        parkvision_batch::batch_analyze(
            Arc::clone(&self.cache),
            request,
            cancel,
            now_unix_ms,
            move |image_hash, kind| {
                let content_store = Arc::clone(&content_store);
                let blob_store = Arc::clone(&blob_store);
                let vision = Arc::clone(&vision);
                async move {
                    let record = {
                        let store = content_store.lock().await;
                        store.lookup(&image_hash)
                    }
                    .ok_or_else(|| CoreError::NotFound {
                        what: format!("image_hash {image_hash}"),
                    })?;
                    let object_name = record
                        .blob_url
                        .is_some()
                        .then(|| parkvision_blobstore::original_object_name(&image_hash, record.mime_type.extension()))
                        .ok_or_else(|| CoreError::NotFound {
                            what: format!("live blob for image_hash {image_hash}"),
                        })?;
                    let bytes = blob_store.get(&object_name).await.map_err(storage_error)?;
                    let bundle = vision
                        .annotate(&bytes, &features_for(kind))
                        .await
                        .map_err(vision_unavailable)?;
                    match kind {
                        Kind::Detect => Ok(AnalysisArtifact::Detect(DetectionArtifact {
                            detections: crate::translate::detections_from_objects(
                                bundle.objects.as_deref().unwrap_or_default(),
                            ),
                        })),
                        Kind::Faces => Ok(AnalysisArtifact::Faces(FaceArtifact {
                            faces: crate::translate::faces_from_raw(bundle.faces.as_deref().unwrap_or_default()),
                        })),
                        Kind::Nature => Ok(AnalysisArtifact::Nature(parkvision_nature::analyze(
                            &bundle,
                            parkvision_nature::DEFAULT_CONFIDENCE_THRESHOLD,
                        ))),
                        other => Err(CoreError::Validation {
                            message: format!("{other:?} is not dispatched through BatchAnalyze"),
                        }),
                    }
                }
            },
        )
        .await
    }
}
