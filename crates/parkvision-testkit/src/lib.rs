// SPDX-License-Identifier: Apache-2.0
//! Shared test doubles for parkvision crates: an in-memory [`BlobStore`] and
//! a scriptable [`RawVisionProvider`], both cheap to clone and call-counted
//! so tests can assert on retry/circuit-breaker behavior without any real
//! I/O.
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

mod blob_store;
mod vision_provider;

pub use blob_store::InMemoryBlobStore;
pub use vision_provider::MockVisionClient;
