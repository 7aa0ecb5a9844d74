// SPDX-License-Identifier: Apache-2.0
//! Retrying adapter over a remote object store (spec §4.2).
//!
//! Object names follow the spec's keyspace: `images/{image_hash}.{ext}` for
//! originals, `annotated/{annotation_id}.{ext}` for renders. `Put` is
//! idempotent — a `HEAD` check skips re-uploading bytes already present
//! under the target name.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions
)]

use std::time::Duration;

use parkvision_types::RetryPolicy;
use rand::Rng;

/// Errors raised by a [`BlobStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BlobStoreError {
    /// Connection, timeout, or 5xx response — safe to retry.
    #[error("transient blob store error: {message}")]
    Transient {
        /// Explanation of the failure.
        message: String,
    },
    /// 4xx response or malformed request — retrying will not help.
    #[error("blob store error: {message}")]
    Terminal {
        /// Explanation of the failure.
        message: String,
    },
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BlobStoreError {
    /// Whether a [`RetryPolicy`] should retry this error class.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Build the canonical object name for an original upload (spec §6).
pub fn original_object_name(image_hash: &str, extension: &str) -> String {
    format!("images/{image_hash}.{extension}")
}

/// Build the canonical object name for an annotated render (spec §6).
pub fn annotated_object_name(annotation_id: &str, extension: &str) -> String {
    format!("annotated/{annotation_id}.{extension}")
}

/// Object-store adapter (spec §4.2): `Put`/`Get`/`Delete` keyed by object
/// name, with retry+backoff for transient failures baked into the trait
/// contract (implementations perform the retry internally).
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `object_name`, returning the canonical URL.
    ///
    /// Idempotent: if an object already exists at `object_name`, its URL is
    /// returned without re-uploading.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Terminal`] after exhausting the retry
    /// budget on a non-transient failure, or [`BlobStoreError::Transient`]
    /// if every retry attempt also failed transiently.
    async fn put(&self, object_name: &str, bytes: Vec<u8>, mime: &str) -> Result<String, BlobStoreError>;

    /// Fetch the bytes stored under `object_name`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotFound`] if no object exists at that
    /// name, or a transient/terminal error per the retry outcome.
    async fn get(&self, object_name: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Remove the object at `object_name`. No error if already absent.
    ///
    /// # Errors
    ///
    /// Returns a transient/terminal error per the retry outcome.
    async fn delete(&self, object_name: &str) -> Result<(), BlobStoreError>;
}

/// HTTP-backed [`BlobStore`] implementation.
///
/// Maps object names onto `{base_url}/{object_name}` and speaks plain
/// `PUT`/`GET`/`HEAD`/`DELETE` — compatible with any S3-style presigned or
/// reverse-proxied bucket endpoint.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl HttpBlobStore {
    /// Construct a store pointed at `base_url` using the spec §4.2 default
    /// retry policy (200ms base, factor 2, ±25% jitter, 5 attempts).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Construct a store with a custom retry policy.
    pub fn with_retry_policy(base_url: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry_policy,
        }
    }

    fn url_for(&self, object_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), object_name)
    }

    async fn retrying<T, F, Fut>(&self, mut attempt_fn: F) -> Result<T, BlobStoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, BlobStoreError>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.retry_policy.should_retry(attempt) => {
                    let jitter_unit = rand::thread_rng().gen_range(-1.0..=1.0);
                    let delay = self.retry_policy.delay_for(attempt, jitter_unit);
                    tracing::warn!(attempt, ?delay, "transient blob store error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn classify_status(status: reqwest::StatusCode) -> BlobStoreError {
    if status == reqwest::StatusCode::NOT_FOUND {
        BlobStoreError::NotFound(status.to_string())
    } else if status.is_server_error() {
        BlobStoreError::Transient {
            message: format!("upstream returned {status}"),
        }
    } else {
        BlobStoreError::Terminal {
            message: format!("upstream returned {status}"),
        }
    }
}

fn classify_transport(err: &reqwest::Error) -> BlobStoreError {
    if err.is_timeout() || err.is_connect() {
        BlobStoreError::Transient {
            message: err.to_string(),
        }
    } else {
        BlobStoreError::Terminal {
            message: err.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, object_name: &str, bytes: Vec<u8>, mime: &str) -> Result<String, BlobStoreError> {
        let url = self.url_for(object_name);

        let head = self.client.head(&url).send().await;
        if let Ok(response) = head {
            if response.status().is_success() {
                return Ok(url);
            }
        }

        self.retrying(|| {
            let url = url.clone();
            let bytes = bytes.clone();
            let mime = mime.to_owned();
            async move {
                let response = self
                    .client
                    .put(&url)
                    .header(reqwest::header::CONTENT_TYPE, mime)
                    .body(bytes)
                    .send()
                    .await
                    .map_err(|err| classify_transport(&err))?;
                if response.status().is_success() {
                    Ok(url.clone())
                } else {
                    Err(classify_status(response.status()))
                }
            }
        })
        .await
    }

    async fn get(&self, object_name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let url = self.url_for(object_name);
        self.retrying(|| {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|err| classify_transport(&err))?;
                if !response.status().is_success() {
                    return Err(classify_status(response.status()));
                }
                response
                    .bytes()
                    .await
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| classify_transport(&err))
            }
        })
        .await
    }

    async fn delete(&self, object_name: &str) -> Result<(), BlobStoreError> {
        let url = self.url_for(object_name);
        self.retrying(|| {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .delete(&url)
                    .send()
                    .await
                    .map_err(|err| classify_transport(&err))?;
                if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
                    Ok(())
                } else {
                    Err(classify_status(response.status()))
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_object_name_matches_keyspace() {
        assert_eq!(
            original_object_name(&"a".repeat(32), "jpg"),
            format!("images/{}.jpg", "a".repeat(32))
        );
    }

    #[test]
    fn annotated_object_name_matches_keyspace() {
        assert_eq!(
            annotated_object_name("ann-1", "png"),
            "annotated/ann-1.png"
        );
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(BlobStoreError::Transient {
            message: "x".into()
        }
        .is_transient());
        assert!(!BlobStoreError::Terminal {
            message: "x".into()
        }
        .is_transient());
        assert!(!BlobStoreError::NotFound("x".into()).is_transient());
    }

    #[tokio::test]
    async fn retrying_returns_first_success() {
        let store = HttpBlobStore::new("http://example.invalid");
        let mut calls = 0;
        let result: Result<u32, BlobStoreError> = store
            .retrying(|| {
                calls += 1;
                async move { Ok(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retrying_gives_up_on_terminal_error() {
        let store = HttpBlobStore::new("http://example.invalid");
        let mut calls = 0;
        let result: Result<u32, BlobStoreError> = store
            .retrying(|| {
                calls += 1;
                async move {
                    Err(BlobStoreError::Terminal {
                        message: "bad request".into(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
