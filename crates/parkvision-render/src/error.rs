// SPDX-License-Identifier: Apache-2.0
//! Renderer error taxonomy.

/// Errors raised by [`crate::Renderer`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The original image bytes could not be decoded.
    #[error("failed to decode source image: {message}")]
    Decode {
        /// Human-readable explanation.
        message: String,
    },
    /// The drawn canvas could not be re-encoded to the requested format.
    #[error("failed to encode output image: {message}")]
    Encode {
        /// Human-readable explanation.
        message: String,
    },
    /// The embedded label font could not be parsed.
    #[error("invalid font data: {message}")]
    InvalidFont {
        /// Human-readable explanation.
        message: String,
    },
}
