//! Payload types carried by transfer events.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Direction of a transfer tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Bytes flow from the remote endpoint into a staged local file.
    Download,
    /// Bytes flow from a local payload file to the remote endpoint.
    Upload,
}

impl TransferKind {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TransferKind::Download => "download",
            TransferKind::Upload => "upload",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status line and headers of a protocol-level response, recorded on the
/// handle once the remote endpoint has answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as received, in order.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Construct a head with no recorded headers.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Append a header, preserving arrival order.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value matching `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `Retry-After` header as a duration, if present and an integer
    /// count of seconds. Malformed values yield `None`.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("Retry-After")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Opaque reference to an in-flight transfer owned by the transport.
///
/// Clones share the underlying label and response slots, so an identifier
/// stamped through one clone is visible through every other: the slot is
/// the persistence point that lets a transfer be re-derived after a
/// restart.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    kind: TransferKind,
    task_id: u64,
    label: Arc<Mutex<Option<String>>>,
    response: Arc<Mutex<Option<ResponseHead>>>,
}

impl TaskHandle {
    /// Mint a handle for a transport-assigned task id.
    #[must_use]
    pub fn new(kind: TransferKind, task_id: u64) -> Self {
        Self {
            kind,
            task_id,
            label: Arc::new(Mutex::new(None)),
            response: Arc::new(Mutex::new(None)),
        }
    }

    /// Direction of the underlying transfer.
    #[must_use]
    pub const fn kind(&self) -> TransferKind {
        self.kind
    }

    /// Transport-assigned task id, unique within one transport instance.
    #[must_use]
    pub const fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Current contents of the persistable label slot.
    ///
    /// # Panics
    ///
    /// Panics if the label slot mutex has been poisoned.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.label.lock().expect("label slot mutex poisoned").clone()
    }

    /// Overwrite the persistable label slot.
    ///
    /// # Panics
    ///
    /// Panics if the label slot mutex has been poisoned.
    pub fn set_label(&self, label: impl Into<String>) {
        *self.label.lock().expect("label slot mutex poisoned") = Some(label.into());
    }

    /// Response head recorded for this transfer, once available.
    ///
    /// # Panics
    ///
    /// Panics if the response slot mutex has been poisoned.
    #[must_use]
    pub fn response(&self) -> Option<ResponseHead> {
        self.response
            .lock()
            .expect("response slot mutex poisoned")
            .clone()
    }

    /// Record the response head for this transfer.
    ///
    /// # Panics
    ///
    /// Panics if the response slot mutex has been poisoned.
    pub fn set_response(&self, head: ResponseHead) {
        *self.response.lock().expect("response slot mutex poisoned") = Some(head);
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.task_id == other.task_id
    }
}

impl Eq for TaskHandle {}
