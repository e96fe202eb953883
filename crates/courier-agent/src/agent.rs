//! The transfer coordinator.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use courier_core::{
    TaskIdentity, TransferFailure, TransferOutcome, TransferRequest, Transport, classify,
};
use courier_events::{EventStream, TaskHandle, TransferEvent, TransferKind};
use tokio::sync::Notify;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::drain::DrainLatch;
use crate::registry::{DownloadHandler, Registry, UploadHandler};

/// Coordinates uploads and downloads against an abstract [`Transport`],
/// matching asynchronous completion events back to caller-registered
/// handlers by stable identifier.
///
/// One agent owns one transport's event stream. All registry and drain
/// mutations are serialized: handlers and the latch sit behind a lock
/// that is never held across a suspension point, and completion events
/// are consumed one at a time by a single loop.
///
/// Cloning is cheap and shares the same coordinator state.
#[derive(Clone)]
pub struct TransferAgent {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    identity: TaskIdentity,
    registry: Mutex<Registry>,
    drain: Mutex<DrainLatch>,
    shutdown: Notify,
}

enum PendingStart {
    Download(TransferRequest),
    Upload(PathBuf, TransferRequest),
}

impl TransferAgent {
    /// Construct an agent over `transport`, consuming completion events
    /// from `events`. The consumer loop runs until the relay closes or
    /// [`TransferAgent::shutdown`] is called.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, identity: TaskIdentity, events: EventStream) -> Self {
        let inner = Arc::new(Inner {
            transport,
            identity,
            registry: Mutex::new(Registry::default()),
            drain: Mutex::new(DrainLatch::new()),
            shutdown: Notify::new(),
        });

        let consumer = Arc::clone(&inner);
        tokio::spawn(async move {
            consumer.consume(events).await;
        });

        Self { inner }
    }

    /// Begin (or re-attach to) a download identified by `identifier`.
    ///
    /// The handler is invoked exactly once with the classified outcome,
    /// possibly only on a future launch of the process, since the
    /// transfer may outlive it. Callers should track pending identifiers
    /// and re-invoke this method on subsequent launches. When the
    /// transport already lists an active download stamped with
    /// `identifier` (it survived a restart), no new task is created.
    ///
    /// A successful outcome carries the staged body location; the staged
    /// file is removed after the handler returns, so the handler must
    /// read or move it before returning.
    ///
    /// # Panics
    ///
    /// Panics if a download handler is already registered for
    /// `identifier`. Re-registering a live identifier is a caller bug.
    pub fn begin_download(
        &self,
        request: TransferRequest,
        identifier: impl Into<String>,
        handler: impl FnOnce(&str, TransferOutcome<PathBuf>) + Send + 'static,
    ) {
        let identifier = identifier.into();
        self.inner
            .lock_registry()
            .register_download(identifier.clone(), Box::new(handler));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner
                .attach_or_start(TransferKind::Download, identifier, PendingStart::Download(request))
                .await;
        });
    }

    /// Begin (or re-attach to) an upload of the file at `payload`.
    ///
    /// Same contract as [`TransferAgent::begin_download`]: exactly-once
    /// handler invocation, possibly on a future launch, idempotent
    /// re-attach, and a panic on a duplicate live identifier.
    ///
    /// # Panics
    ///
    /// Panics if an upload handler is already registered for
    /// `identifier`.
    pub fn begin_upload(
        &self,
        payload: impl Into<PathBuf>,
        request: TransferRequest,
        identifier: impl Into<String>,
        handler: impl FnOnce(&str, TransferOutcome<()>) + Send + 'static,
    ) {
        let identifier = identifier.into();
        self.inner
            .lock_registry()
            .register_upload(identifier.clone(), Box::new(handler));

        let inner = Arc::clone(&self.inner);
        let payload = payload.into();
        tokio::spawn(async move {
            inner
                .attach_or_start(
                    TransferKind::Upload,
                    identifier,
                    PendingStart::Upload(payload, request),
                )
                .await;
        });
    }

    /// Awaitable variant of [`TransferAgent::begin_download`].
    ///
    /// Resolves when the matching completion event arrives, which may
    /// never happen within this process's lifetime; callers needing a
    /// timeout must layer one externally. Note the staged file is
    /// removed once the internal handler returns; use
    /// [`TransferAgent::begin_download`] with a handler to read the
    /// body before cleanup.
    ///
    /// # Panics
    ///
    /// Panics if a download handler is already registered for
    /// `identifier`.
    pub async fn download(
        &self,
        request: TransferRequest,
        identifier: impl Into<String>,
    ) -> TransferOutcome<PathBuf> {
        let (sender, receiver) = oneshot::channel();
        self.begin_download(request, identifier, move |_, outcome| {
            let _ = sender.send(outcome);
        });

        receiver.await.unwrap_or(TransferOutcome::Failed {
            reason: TransferFailure::Interrupted,
        })
    }

    /// Awaitable variant of [`TransferAgent::begin_upload`].
    ///
    /// # Panics
    ///
    /// Panics if an upload handler is already registered for
    /// `identifier`.
    pub async fn upload(
        &self,
        payload: impl Into<PathBuf>,
        request: TransferRequest,
        identifier: impl Into<String>,
    ) -> TransferOutcome<()> {
        let (sender, receiver) = oneshot::channel();
        self.begin_upload(payload, request, identifier, move |_, outcome| {
            let _ = sender.send(outcome);
        });

        receiver.await.unwrap_or(TransferOutcome::Failed {
            reason: TransferFailure::Interrupted,
        })
    }

    /// Wait until the transport has delivered every completion
    /// notification queued for the current wake-up.
    ///
    /// Returns immediately when the signal has already arrived during
    /// this agent's lifetime. Only one waiter is tracked at a time; a
    /// concurrent second wait displaces the first, which then never
    /// resolves through the signal.
    pub async fn finished_events(&self) {
        let receiver = self.inner.lock_drain().wait();
        if let Some(receiver) = receiver {
            let _ = receiver.await;
        }
    }

    /// Register the platform-facing drain hand-off: `callback` runs once
    /// all queued completion notifications have been delivered, at most
    /// once per agent lifetime.
    pub fn on_all_events_delivered(&self, callback: impl FnOnce() + Send + 'static) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let receiver = inner.lock_drain().wait();
            match receiver {
                None => callback(),
                Some(receiver) => {
                    if receiver.await.is_ok() {
                        callback();
                    }
                }
            }
        });
    }

    /// Stop consuming events and abandon every pending handler.
    ///
    /// Awaitable variants pending at shutdown resolve to a failed
    /// outcome with an interrupted reason; plain handlers are dropped
    /// without being invoked.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }
}

impl Inner {
    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().expect("registry mutex poisoned")
    }

    fn lock_drain(&self) -> std::sync::MutexGuard<'_, DrainLatch> {
        self.drain.lock().expect("drain latch mutex poisoned")
    }

    async fn consume(self: Arc<Self>, mut events: EventStream) {
        loop {
            tokio::select! {
                event = events.next() => {
                    match event {
                        Some(event) => self.dispatch(event).await,
                        None => break,
                    }
                }
                () = self.shutdown.notified() => break,
            }
        }

        let abandoned = self.lock_registry().clear();
        if abandoned > 0 {
            warn!(abandoned, "coordinator stopped with pending transfers");
        } else {
            debug!("coordinator stopped");
        }
    }

    async fn dispatch(&self, event: TransferEvent) {
        match event {
            TransferEvent::AllEventsDelivered => self.handle_all_events_delivered(),
            TransferEvent::DownloadDataReady {
                handle,
                staging_path,
            } => self.handle_data_ready(&handle, staging_path),
            TransferEvent::TransferCompleted { handle, error } => {
                self.handle_completed(&handle, error).await;
            }
        }
    }

    fn handle_all_events_delivered(&self) {
        if self.lock_drain().signal() {
            info!("all queued completion notifications delivered");
        } else {
            debug!("skipping repeated finished-events signal");
        }
    }

    fn handle_data_ready(&self, handle: &TaskHandle, staging_path: PathBuf) {
        debug!(
            task_id = handle.task_id(),
            path = %staging_path.display(),
            "download body staged"
        );
        self.lock_registry().stage(handle.task_id(), staging_path);
    }

    async fn handle_completed(&self, handle: &TaskHandle, error: Option<String>) {
        let staged = self.lock_registry().take_staged(handle.task_id());

        let Some(identifier) = self.identity.extract(handle) else {
            warn!(
                kind = %handle.kind(),
                task_id = handle.task_id(),
                "completed task has no identifier; dropping"
            );
            if let Some(path) = staged {
                self.discard_staged(&path).await;
            }
            return;
        };

        let head = handle.response();
        match handle.kind() {
            TransferKind::Download => {
                let outcome = classify(head.as_ref(), error, staged.clone());
                let handler = self.lock_registry().take_download(&identifier);
                self.deliver_download(&identifier, handler, outcome);
                if let Some(path) = staged {
                    self.discard_staged(&path).await;
                }
            }
            TransferKind::Upload => {
                let outcome = classify(head.as_ref(), error, Some(()));
                let handler = self.lock_registry().take_upload(&identifier);
                self.deliver_upload(&identifier, handler, outcome);
            }
        }
    }

    fn deliver_download(
        &self,
        identifier: &str,
        handler: Option<DownloadHandler>,
        outcome: TransferOutcome<PathBuf>,
    ) {
        match handler {
            Some(handler) => {
                info!(identifier, "completed download task");
                handler(identifier, outcome);
            }
            None => {
                info!(identifier, "no handler found for completed download");
            }
        }
    }

    fn deliver_upload(
        &self,
        identifier: &str,
        handler: Option<UploadHandler>,
        outcome: TransferOutcome<()>,
    ) {
        match handler {
            Some(handler) => {
                info!(identifier, "completed upload task");
                handler(identifier, outcome);
            }
            None => {
                info!(identifier, "no handler found for completed upload");
            }
        }
    }

    async fn discard_staged(&self, path: &Path) {
        if let Err(err) = tokio::fs::remove_file(path).await {
            debug!(
                error = %err,
                path = %path.display(),
                "failed to remove staged file"
            );
        }
    }

    async fn attach_or_start(&self, kind: TransferKind, identifier: String, start: PendingStart) {
        if let Err(err) = self.try_attach_or_start(kind, &identifier, start).await {
            warn!(
                kind = %kind,
                identifier = %identifier,
                error = %err,
                "failed to start transfer"
            );
            self.resolve_start_failure(kind, &identifier, err.to_string());
        }
    }

    /// Snapshot the transport's active handles and re-attach when the
    /// identifier is already running; otherwise create, stamp, and start
    /// a fresh task. The snapshot is not a lock: a completion racing this
    /// check is absorbed as an orphan rather than blocking anything.
    async fn try_attach_or_start(
        &self,
        kind: TransferKind,
        identifier: &str,
        start: PendingStart,
    ) -> anyhow::Result<()> {
        let active = self.transport.active_handles(kind).await?;
        let ids: HashSet<String> = active
            .iter()
            .filter_map(|handle| self.identity.extract(handle))
            .collect();

        if ids.contains(identifier) {
            debug!(kind = %kind, identifier, "found existing task for identifier");
            return Ok(());
        }

        let handle = match start {
            PendingStart::Download(request) => self.transport.create_download(&request).await?,
            PendingStart::Upload(payload, request) => {
                self.transport.create_upload(&payload, &request).await?
            }
        };

        if self.identity.extract(&handle).is_some() {
            warn!(
                identifier,
                "identifier slot is already in use and will be overwritten"
            );
        }
        self.identity.stamp(&handle, identifier);
        self.transport.start(&handle).await?;
        Ok(())
    }

    /// A transfer that could not be created or started will never emit a
    /// completion event; resolve its handler with a failed outcome now,
    /// through the same take-then-invoke path completions use.
    fn resolve_start_failure(&self, kind: TransferKind, identifier: &str, message: String) {
        let reason = TransferFailure::Protocol { message };
        match kind {
            TransferKind::Download => {
                let handler = self.lock_registry().take_download(identifier);
                self.deliver_download(identifier, handler, TransferOutcome::Failed { reason });
            }
            TransferKind::Upload => {
                let handler = self.lock_registry().take_upload(identifier);
                self.deliver_upload(identifier, handler, TransferOutcome::Failed { reason });
            }
        }
    }
}
