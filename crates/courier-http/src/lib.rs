#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]

//! Default transport adapter backed by `reqwest`.
//!
//! [`HttpTransport`] implements the abstract transport contract over a
//! shared HTTP client: created tasks live in an active-task table until
//! their completion event is pushed, downloads stream their bodies into
//! staging files, and every completion is delivered through the event
//! relay, never as a method return value.
//!
//! Layout: `config.rs` (transport configuration + validation),
//! `transport.rs` (the adapter itself).

mod config;
mod transport;

pub use config::{ConfigError, HttpTransportConfig};
pub use transport::HttpTransport;
