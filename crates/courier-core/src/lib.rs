#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Transport-agnostic transfer interfaces and DTOs.
//!
//! Layout: `model.rs` (request DTO), `classify.rs` (response
//! classification), `identity.rs` (pluggable identifier strategy),
//! `transport.rs` (the abstract transport contract), `error.rs`
//! (failure taxonomy).

pub mod classify;
pub mod error;
pub mod identity;
pub mod model;
pub mod transport;

pub use classify::{TransferOutcome, classify};
pub use error::{TransferError, TransferFailure};
pub use identity::TaskIdentity;
pub use model::TransferRequest;
pub use transport::Transport;
