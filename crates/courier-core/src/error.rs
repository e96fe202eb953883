//! Failure taxonomy for transfer outcomes.

use std::time::Duration;

use thiserror::Error;

/// Reasons a completed transfer resolves to a failed outcome.
///
/// These are terminal conditions: either the protocol exchange itself
/// broke down, or the response cannot be interpreted. Transient and
/// rejected HTTP statuses are *not* failures; they are first-class
/// outcomes the caller branches on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferFailure {
    /// The transport reported a protocol-level error before a response
    /// could be classified.
    #[error("transport protocol error: {message}")]
    Protocol {
        /// Transport-reported failure description.
        message: String,
    },
    /// The transfer finished with neither a response nor an error.
    #[error("transfer produced neither a response nor an error")]
    NoResponse,
    /// The response carried a status code outside the valid HTTP range.
    #[error("http status {status} is outside the valid range")]
    InvalidStatus {
        /// The out-of-range status code.
        status: u16,
    },
    /// A success status arrived without the content the transfer kind
    /// requires (a download completed with no staged body).
    #[error("successful response was missing the expected content")]
    ExpectedContentMissing,
    /// The coordinator was torn down before a completion arrived; only
    /// awaitable variants observe this.
    #[error("coordinator was torn down before the transfer completed")]
    Interrupted,
}

/// Collapsed error view of a non-success outcome, for callers that want a
/// plain `Result` surface instead of branching on the outcome variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The transfer failed terminally.
    #[error(transparent)]
    Failed(#[from] TransferFailure),
    /// The request was understood and refused; retrying is pointless.
    #[error("request rejected with http status {status}")]
    Rejected {
        /// The rejecting status code.
        status: u16,
    },
    /// The failure is transient; the server may have suggested a delay.
    #[error("transient failure with http status {status}")]
    Transient {
        /// The transient status code.
        status: u16,
        /// Parsed `Retry-After` delay, when the server supplied one.
        retry_after: Option<Duration>,
    },
}
