// SPDX-License-Identifier: Apache-2.0
//! Request coordinator: `AppConfig`, the explicit `Context` dependency
//! container, request/response DTOs, and the dispatch methods that turn a
//! DTO into calls against C1-C7. Nothing here is HTTP-shaped; transport
//! binaries map these methods onto whatever wire format they speak.
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

pub mod config;
pub mod context;
pub mod coordinator;
pub mod rate_limit;
pub mod requests;
pub mod translate;
pub mod validate;

pub use config::AppConfig;
pub use context::Context;
pub use rate_limit::{AllowAll, RateLimitDecision};
