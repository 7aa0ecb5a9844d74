// SPDX-License-Identifier: Apache-2.0
//! HTTP-backed [`RawVisionProvider`] — a single attempt per call, retry and
//! circuit-breaking are [`crate::VisionClient`]'s job, not this adapter's.

use parkvision_types::{PrimitiveBundle, VisionFeature};

use crate::{RawVisionProvider, VisionError};

/// Speaks a plain JSON-over-HTTP contract: `POST {base_url}/annotate` with
/// the raw image bytes as the body and the requested features joined into
/// an `X-Vision-Features` header, decoding the response body as a
/// [`PrimitiveBundle`].
pub struct HttpVisionProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVisionProvider {
    /// Construct a provider pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

fn classify_status(status: reqwest::StatusCode) -> VisionError {
    if status.is_server_error() {
        VisionError::Transient { message: format!("upstream returned {status}") }
    } else {
        VisionError::Terminal { message: format!("upstream returned {status}") }
    }
}

fn classify_transport(err: &reqwest::Error) -> VisionError {
    if err.is_timeout() || err.is_connect() {
        VisionError::Transient { message: err.to_string() }
    } else {
        VisionError::Terminal { message: err.to_string() }
    }
}

fn feature_header_value(features: &[VisionFeature]) -> String {
    features
        .iter()
        .map(|feature| serde_json::to_value(feature).map(|v| v.as_str().unwrap_or_default().to_owned()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait::async_trait]
impl RawVisionProvider for HttpVisionProvider {
    async fn call(&self, bytes: &[u8], features: &[VisionFeature]) -> Result<PrimitiveBundle, VisionError> {
        let url = format!("{}/annotate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("X-Vision-Features", feature_header_value(features))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }

        response
            .json::<PrimitiveBundle>()
            .await
            .map_err(|err| VisionError::Terminal { message: format!("malformed response body: {err}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_header_value_joins_screaming_snake_case_names() {
        let header = feature_header_value(&[VisionFeature::Label, VisionFeature::ObjectLocalization]);
        assert_eq!(header, "LABEL,OBJECT_LOCALIZATION");
    }

    #[test]
    fn feature_header_value_is_empty_for_no_features() {
        assert_eq!(feature_header_value(&[]), "");
    }
}
