// SPDX-License-Identifier: Apache-2.0
//! Scriptable [`RawVisionProvider`] fake for testing retry and circuit
//! breaker behavior without a real upstream call.

use std::sync::{Arc, Mutex};

use parkvision_types::{PrimitiveBundle, VisionFeature};
use parkvision_vision::{RawVisionProvider, VisionError};

/// In-memory [`RawVisionProvider`] fake.
///
/// Returns [`Self::set_response`]'s bundle (or a default empty one) on
/// success. [`Self::fail_next_calls`] makes the next N calls return a
/// scripted error instead, which is what exercises a real client's retry
/// loop and circuit breaker.
#[derive(Clone, Default)]
pub struct MockVisionClient {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    response: PrimitiveBundle,
    call_count: usize,
    fail_next_calls: usize,
    fail_transient: bool,
}

impl MockVisionClient {
    /// Create a provider that always succeeds with an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bundle returned by subsequent successful calls.
    pub fn set_response(&self, response: PrimitiveBundle) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.response = response;
    }

    /// Make the next `count` calls fail. `transient` selects
    /// [`VisionError::Transient`] (retryable) vs [`VisionError::Terminal`].
    pub fn fail_next_calls(&self, count: usize, transient: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.fail_next_calls = count;
        inner.fail_transient = transient;
    }

    /// Number of `call` invocations made so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).call_count
    }
}

#[async_trait::async_trait]
impl RawVisionProvider for MockVisionClient {
    async fn call(&self, _bytes: &[u8], _features: &[VisionFeature]) -> Result<PrimitiveBundle, VisionError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.call_count += 1;
        if inner.fail_next_calls > 0 {
            inner.fail_next_calls -= 1;
            return if inner.fail_transient {
                Err(VisionError::Transient { message: "scripted transient failure".to_owned() })
            } else {
                Err(VisionError::Terminal { message: "scripted terminal failure".to_owned() })
            };
        }
        Ok(inner.response.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_call_succeeds_with_empty_bundle() {
        let provider = MockVisionClient::new();
        let bundle = provider.call(&[], &[VisionFeature::Label]).await.unwrap();
        assert!(bundle.labels.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn fail_next_calls_is_consumed_then_succeeds() {
        let provider = MockVisionClient::new();
        provider.fail_next_calls(1, true);
        let first = provider.call(&[], &[VisionFeature::Label]).await;
        assert!(matches!(first, Err(VisionError::Transient { .. })));
        let second = provider.call(&[], &[VisionFeature::Label]).await;
        assert!(second.is_ok());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn terminal_failure_is_distinguishable_from_transient() {
        let provider = MockVisionClient::new();
        provider.fail_next_calls(1, false);
        let result = provider.call(&[], &[VisionFeature::Label]).await;
        assert!(matches!(result, Err(VisionError::Terminal { .. })));
    }

    #[tokio::test]
    async fn set_response_is_returned_on_success() {
        let provider = MockVisionClient::new();
        provider.set_response(PrimitiveBundle {
            labels: Some(vec![]),
            objects: None,
            faces: None,
            dominant_colors: None,
            errors: vec![],
        });
        let bundle = provider.call(&[], &[VisionFeature::Label]).await.unwrap();
        assert!(bundle.labels.is_some());
    }
}
