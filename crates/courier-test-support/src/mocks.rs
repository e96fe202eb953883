//! Scripted transport standing in for a real byte-moving facility.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use courier_core::{TransferRequest, Transport};
use courier_events::{EventRelay, TaskHandle, TransferEvent, TransferKind};

/// In-memory [`Transport`] whose behaviour is driven entirely by the
/// test: preload handles that "survived a restart", observe which tasks
/// the coordinator creates and starts, inject create/start failures, and
/// replay completion events through the relay.
pub struct ScriptedTransport {
    relay: EventRelay,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_task_id: u64,
    active: Vec<TaskHandle>,
    created: Vec<TaskHandle>,
    started: Vec<TaskHandle>,
    fail_create: Option<String>,
    fail_start: Option<String>,
}

impl ScriptedTransport {
    /// Build a transport that publishes events through `relay`.
    #[must_use]
    pub fn new(relay: EventRelay) -> Self {
        Self {
            relay,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("scripted transport state poisoned")
    }

    fn mint(state: &mut State, kind: TransferKind) -> TaskHandle {
        let handle = TaskHandle::new(kind, state.next_task_id);
        state.next_task_id += 1;
        handle
    }

    /// Add an already-running task stamped with `identifier`, as if it
    /// survived a process restart.
    pub fn preload_active(&self, kind: TransferKind, identifier: &str) -> TaskHandle {
        let mut state = self.lock();
        let handle = Self::mint(&mut state, kind);
        handle.set_label(identifier);
        state.active.push(handle.clone());
        handle
    }

    /// Every handle the coordinator created so far.
    pub fn created(&self) -> Vec<TaskHandle> {
        self.lock().created.clone()
    }

    /// Every handle the coordinator started so far.
    pub fn started(&self) -> Vec<TaskHandle> {
        self.lock().started.clone()
    }

    /// Make the next create call fail with `message`.
    pub fn fail_next_create(&self, message: impl Into<String>) {
        self.lock().fail_create = Some(message.into());
    }

    /// Make the next start call fail with `message`.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lock().fail_start = Some(message.into());
    }

    /// Publish a staged-body event for a download.
    pub fn stage(&self, handle: &TaskHandle, path: impl Into<PathBuf>) {
        self.relay.publish(TransferEvent::DownloadDataReady {
            handle: handle.clone(),
            staging_path: path.into(),
        });
    }

    /// Publish the completion event for `handle` and retire it from the
    /// active list.
    pub fn complete(&self, handle: &TaskHandle, error: Option<String>) {
        self.lock().active.retain(|active| active != handle);
        self.relay.publish(TransferEvent::TransferCompleted {
            handle: handle.clone(),
            error,
        });
    }

    /// Publish the platform's finished-events signal.
    pub fn finish_events(&self) {
        self.relay.publish(TransferEvent::AllEventsDelivered);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn active_handles(&self, kind: TransferKind) -> anyhow::Result<Vec<TaskHandle>> {
        Ok(self
            .lock()
            .active
            .iter()
            .filter(|handle| handle.kind() == kind)
            .cloned()
            .collect())
    }

    async fn create_download(&self, _request: &TransferRequest) -> anyhow::Result<TaskHandle> {
        let mut state = self.lock();
        if let Some(message) = state.fail_create.take() {
            bail!(message);
        }
        let handle = Self::mint(&mut state, TransferKind::Download);
        state.created.push(handle.clone());
        Ok(handle)
    }

    async fn create_upload(
        &self,
        _payload: &Path,
        _request: &TransferRequest,
    ) -> anyhow::Result<TaskHandle> {
        let mut state = self.lock();
        if let Some(message) = state.fail_create.take() {
            bail!(message);
        }
        let handle = Self::mint(&mut state, TransferKind::Upload);
        state.created.push(handle.clone());
        Ok(handle)
    }

    async fn start(&self, handle: &TaskHandle) -> anyhow::Result<()> {
        let mut state = self.lock();
        if let Some(message) = state.fail_start.take() {
            bail!(message);
        }
        state.started.push(handle.clone());
        state.active.push(handle.clone());
        Ok(())
    }
}
