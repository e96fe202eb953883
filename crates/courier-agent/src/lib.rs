#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]

//! Coordinator for long-running transfers whose completions may outlive
//! the process that started them.
//!
//! The platform pushes completion notifications at arbitrary future
//! times, possibly into a fresh process instance; callers want to await
//! a result, or register a handler, for a transfer they identify by a
//! stable string. [`TransferAgent`] bridges the two: it keeps the
//! identifier-to-handler registry, re-derives identifiers from the
//! transport's surviving task handles after a restart, classifies
//! protocol outcomes, and hands the platform's finished-events signal
//! back to its owner exactly once.
//!
//! Layout: `agent.rs` (the coordinator), `registry.rs` (pending-handler
//! bookkeeping), `drain.rs` (single-shot finished-events latch).

mod agent;
mod drain;
mod registry;

pub use agent::TransferAgent;
