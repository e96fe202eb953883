//! Classification of protocol-level completion signals into outcomes.

use std::time::Duration;

use courier_events::ResponseHead;

use crate::error::{TransferError, TransferFailure};

/// Classified result of one finished transfer.
///
/// Produced exactly once per transfer and consumed exactly once by the
/// registered handler (or logged and discarded when orphaned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome<T> {
    /// The request succeeded and any required content is present.
    Success {
        /// Transfer payload: the staged file path for downloads, unit for
        /// uploads.
        payload: T,
        /// The successful status code.
        status: u16,
    },
    /// The failure is transient and the request may be retried. Retry
    /// *policy* is the caller's concern.
    Retryable {
        /// The transient status code.
        status: u16,
        /// Parsed `Retry-After` delay, when present and well-formed.
        retry_after: Option<Duration>,
    },
    /// The request was understood and refused.
    Rejected {
        /// The rejecting status code.
        status: u16,
    },
    /// The exchange broke down before a usable response existed.
    Failed {
        /// Why the transfer failed.
        reason: TransferFailure,
    },
}

impl<T> TransferOutcome<T> {
    /// Whether this outcome carries a payload.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The HTTP status associated with the outcome, when one exists.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. }
            | Self::Retryable { status, .. }
            | Self::Rejected { status } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    /// Map the success payload, preserving every other variant.
    #[must_use]
    pub fn map<U>(self, map: impl FnOnce(T) -> U) -> TransferOutcome<U> {
        match self {
            Self::Success { payload, status } => TransferOutcome::Success {
                payload: map(payload),
                status,
            },
            Self::Retryable {
                status,
                retry_after,
            } => TransferOutcome::Retryable {
                status,
                retry_after,
            },
            Self::Rejected { status } => TransferOutcome::Rejected { status },
            Self::Failed { reason } => TransferOutcome::Failed { reason },
        }
    }

    /// Collapse the outcome into a `Result`, folding the retryable and
    /// rejected variants into [`TransferError`].
    ///
    /// # Errors
    ///
    /// Returns an error for every variant except `Success`.
    pub fn into_result(self) -> Result<(T, u16), TransferError> {
        match self {
            Self::Success { payload, status } => Ok((payload, status)),
            Self::Retryable {
                status,
                retry_after,
            } => Err(TransferError::Transient {
                status,
                retry_after,
            }),
            Self::Rejected { status } => Err(TransferError::Rejected { status }),
            Self::Failed { reason } => Err(TransferError::Failed(reason)),
        }
    }
}

/// Classify a completion signal into an outcome.
///
/// Pure and deterministic: the outcome is a function of the response
/// head, the transport error, and payload presence alone. A transport
/// error dominates everything else; a missing head means the transfer
/// produced nothing classifiable. Statuses 200, 201, 202 and 204 succeed
/// when the payload is present; 408, 429, 500, 502, 503 and 504 are
/// transient and carry the parsed `Retry-After` delay; anything else in
/// the valid range is a rejection.
#[must_use]
pub fn classify<T>(
    head: Option<&ResponseHead>,
    transport_error: Option<String>,
    payload: Option<T>,
) -> TransferOutcome<T> {
    if let Some(message) = transport_error {
        return TransferOutcome::Failed {
            reason: TransferFailure::Protocol { message },
        };
    }

    let Some(head) = head else {
        return TransferOutcome::Failed {
            reason: TransferFailure::NoResponse,
        };
    };

    let status = head.status;
    if !(100..=599).contains(&status) {
        return TransferOutcome::Failed {
            reason: TransferFailure::InvalidStatus { status },
        };
    }

    match status {
        200 | 201 | 202 | 204 => payload.map_or(
            TransferOutcome::Failed {
                reason: TransferFailure::ExpectedContentMissing,
            },
            |payload| TransferOutcome::Success { payload, status },
        ),
        408 | 429 | 500 | 502 | 503 | 504 => TransferOutcome::Retryable {
            status,
            retry_after: head.retry_after(),
        },
        _ => TransferOutcome::Rejected { status },
    }
}
