//! Abstract contract between the coordinator and a concrete transport.

use std::path::Path;

use async_trait::async_trait;
use courier_events::{TaskHandle, TransferKind};

use crate::model::TransferRequest;

/// The facility that actually moves bytes.
///
/// Implementations own the sockets and OS-level transfer state, are safe
/// for concurrent use, and deliver completions exclusively through the
/// event relay, never as a return value of these methods.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Snapshot the handles of currently active transfers of `kind`.
    ///
    /// The snapshot may lag just-started transfers by a scheduling
    /// quantum; callers must tolerate that eventual consistency.
    async fn active_handles(&self, kind: TransferKind) -> anyhow::Result<Vec<TaskHandle>>;

    /// Create (but do not start) a download task for `request`.
    async fn create_download(&self, request: &TransferRequest) -> anyhow::Result<TaskHandle>;

    /// Create (but do not start) an upload task sending the file at
    /// `payload` with `request`.
    async fn create_upload(
        &self,
        payload: &Path,
        request: &TransferRequest,
    ) -> anyhow::Result<TaskHandle>;

    /// Start a previously created task.
    async fn start(&self, handle: &TaskHandle) -> anyhow::Result<()>;
}
