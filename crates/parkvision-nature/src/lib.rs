// SPDX-License-Identifier: Apache-2.0
//! Natural-element analysis (spec §4.5): label categorization, vegetation
//! health, seasonal inference, and color analysis.
//!
//! Every function here is pure with respect to its inputs — deterministic
//! for an equal `PrimitiveBundle` — which is what makes caching the result
//! under a fingerprint scheme correct.
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

pub mod categorize;
pub mod color;
pub mod season;
pub mod vegetation;

pub use categorize::{Category, DEFAULT_CONFIDENCE_THRESHOLD};

use parkvision_types::{NatureArtifact, PrimitiveBundle};

/// Run the full natural-element analysis over a vision provider's raw
/// output (spec §4.5).
///
/// Missing inputs degrade gracefully: if `labels` or `dominant_colors`
/// were not requested or failed upstream, the corresponding sub-scores
/// fall back to their zero/empty baseline rather than erroring, since
/// `PrimitiveBundle` already records the failure in `errors`.
pub fn analyze(bundle: &PrimitiveBundle, confidence_threshold: f32) -> NatureArtifact {
    let empty_labels = Vec::new();
    let empty_colors = Vec::new();
    let labels = bundle.labels.as_ref().unwrap_or(&empty_labels);
    let dominant_colors = bundle.dominant_colors.as_ref().unwrap_or(&empty_colors);

    let coverage = categorize::estimate_coverage(labels, confidence_threshold);
    let vegetation_health =
        vegetation::score_vegetation_health(dominant_colors, labels, coverage.vegetation);
    let recommendations = vegetation::recommendations(&vegetation_health);
    let seasonal = season::infer_season(labels);
    let colors = color::analyze_colors(dominant_colors);

    NatureArtifact {
        coverage,
        vegetation_health,
        seasonal,
        colors,
        recommendations,
    }
}
