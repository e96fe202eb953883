//! The reqwest-backed transport adapter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use courier_core::{TransferRequest, Transport};
use courier_events::{EventRelay, ResponseHead, TaskHandle, TransferEvent, TransferKind};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::HttpTransportConfig;

/// Transport that moves bytes over HTTP with a shared [`reqwest`] client.
///
/// Tasks are created into an in-memory active table and executed on
/// spawned tokio tasks once started. Completions, and for downloads the
/// staged-body notification, are pushed through the event relay.
/// When the last active task retires, the adapter pushes the
/// all-events-delivered signal; the coordinator's latch makes repeats
/// across batches harmless.
pub struct HttpTransport {
    client: Client,
    relay: EventRelay,
    staging_dir: PathBuf,
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    next_task_id: u64,
    tasks: HashMap<u64, Entry>,
}

struct Entry {
    handle: TaskHandle,
    request: TransferRequest,
    payload: Option<PathBuf>,
    started: bool,
}

impl HttpTransport {
    /// Build a transport publishing completion events through `relay`.
    ///
    /// Validates the configuration, creates the staging directory when
    /// missing, and constructs the shared client.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, the staging
    /// directory cannot be created, or the client cannot be built.
    pub fn new(config: HttpTransportConfig, relay: EventRelay) -> Result<Self> {
        config.validate().context("invalid transport configuration")?;
        std::fs::create_dir_all(&config.staging_dir).with_context(|| {
            format!(
                "failed to create staging directory {}",
                config.staging_dir.display()
            )
        })?;

        let mut builder = Client::builder().connect_timeout(config.connect_timeout());
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder.build().context("failed to build http client")?;

        Ok(Self {
            client,
            relay,
            staging_dir: config.staging_dir,
            state: Arc::new(Mutex::new(State::default())),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("transport state mutex poisoned")
    }

    fn create_task(
        &self,
        kind: TransferKind,
        request: &TransferRequest,
        payload: Option<PathBuf>,
    ) -> TaskHandle {
        let mut state = self.lock();
        let task_id = state.next_task_id;
        state.next_task_id += 1;

        let handle = TaskHandle::new(kind, task_id);
        state.tasks.insert(
            task_id,
            Entry {
                handle: handle.clone(),
                request: request.clone(),
                payload,
                started: false,
            },
        );
        debug!(kind = %kind, task_id, url = %request.url, "created transfer task");
        handle
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn active_handles(&self, kind: TransferKind) -> Result<Vec<TaskHandle>> {
        Ok(self
            .lock()
            .tasks
            .values()
            .filter(|entry| entry.handle.kind() == kind)
            .map(|entry| entry.handle.clone())
            .collect())
    }

    async fn create_download(&self, request: &TransferRequest) -> Result<TaskHandle> {
        Ok(self.create_task(TransferKind::Download, request, None))
    }

    async fn create_upload(
        &self,
        payload: &Path,
        request: &TransferRequest,
    ) -> Result<TaskHandle> {
        Ok(self.create_task(TransferKind::Upload, request, Some(payload.to_path_buf())))
    }

    async fn start(&self, handle: &TaskHandle) -> Result<()> {
        let (request, payload) = {
            let mut state = self.lock();
            let entry = state
                .tasks
                .get_mut(&handle.task_id())
                .with_context(|| format!("unknown task {}", handle.task_id()))?;
            if entry.started {
                bail!("task {} already started", handle.task_id());
            }
            entry.started = true;
            (entry.request.clone(), entry.payload.clone())
        };

        let executor = Executor {
            client: self.client.clone(),
            relay: self.relay.clone(),
            staging_dir: self.staging_dir.clone(),
            state: Arc::clone(&self.state),
        };
        let handle = handle.clone();
        tokio::spawn(async move {
            executor.run(handle, request, payload).await;
        });
        Ok(())
    }
}

/// Everything one spawned transfer needs, detached from the transport's
/// lifetime.
struct Executor {
    client: Client,
    relay: EventRelay,
    staging_dir: PathBuf,
    state: Arc<Mutex<State>>,
}

impl Executor {
    async fn run(self, handle: TaskHandle, request: TransferRequest, payload: Option<PathBuf>) {
        let error = match self.perform(&handle, &request, payload).await {
            Ok(Some(staged)) => {
                self.relay.publish(TransferEvent::DownloadDataReady {
                    handle: handle.clone(),
                    staging_path: staged,
                });
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!(
                    task_id = handle.task_id(),
                    url = %request.url,
                    error = %format!("{err:#}"),
                    "transfer failed at the transport level"
                );
                Some(format!("{err:#}"))
            }
        };

        // Retire the task before publishing, so a membership snapshot
        // taken after the completion event no longer sees it.
        let drained = {
            let mut state = self.state.lock().expect("transport state mutex poisoned");
            state.tasks.remove(&handle.task_id());
            state.tasks.is_empty()
        };

        self.relay.publish(TransferEvent::TransferCompleted {
            handle,
            error,
        });
        if drained {
            self.relay.publish(TransferEvent::AllEventsDelivered);
        }
    }

    /// Perform the exchange. Returns the staged body location for
    /// downloads; the response head is recorded on the handle as soon as
    /// the remote endpoint answers, whatever the status code says.
    async fn perform(
        &self,
        handle: &TaskHandle,
        request: &TransferRequest,
        payload: Option<PathBuf>,
    ) -> Result<Option<PathBuf>> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("invalid request method {:?}", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(payload) = payload {
            let body = tokio::fs::read(&payload)
                .await
                .with_context(|| format!("failed to read payload {}", payload.display()))?;
            builder = builder.body(body);
        }

        let mut response = builder.send().await.context("request failed")?;

        let mut head = ResponseHead::new(response.status().as_u16());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                head = head.with_header(name.as_str(), value);
            }
        }
        handle.set_response(head);

        match handle.kind() {
            TransferKind::Upload => Ok(None),
            TransferKind::Download => {
                let staged = self
                    .staging_dir
                    .join(format!("download-{}-{}", handle.task_id(), Uuid::new_v4()));
                let mut file = tokio::fs::File::create(&staged)
                    .await
                    .with_context(|| format!("failed to create {}", staged.display()))?;
                while let Some(chunk) = response.chunk().await.context("failed reading body")? {
                    file.write_all(&chunk)
                        .await
                        .with_context(|| format!("failed writing {}", staged.display()))?;
                }
                file.flush()
                    .await
                    .with_context(|| format!("failed flushing {}", staged.display()))?;
                debug!(
                    task_id = handle.task_id(),
                    path = %staged.display(),
                    "download body staged"
                );
                Ok(Some(staged))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use courier_events::EventStream;
    use tempfile::TempDir;

    fn transport(dir: &TempDir) -> (HttpTransport, EventStream) {
        let (relay, events) = EventRelay::channel();
        let config = HttpTransportConfig {
            staging_dir: dir.path().join("staging"),
            ..HttpTransportConfig::default()
        };
        (
            HttpTransport::new(config, relay).expect("transport builds"),
            events,
        )
    }

    #[tokio::test]
    async fn created_tasks_are_listed_until_completion() -> Result<()> {
        let dir = TempDir::new()?;
        let (transport, _events) = transport(&dir);
        let request = TransferRequest::new("http://127.0.0.1:9/never");

        let handle = transport.create_download(&request).await?;
        assert_eq!(
            transport.active_handles(TransferKind::Download).await?,
            vec![handle.clone()]
        );
        assert!(
            transport
                .active_handles(TransferKind::Upload)
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let (transport, _events) = transport(&dir);
        // Port 9 (discard) is unroutable in practice; the executor will
        // fail, which this test never waits for.
        let request = TransferRequest::new("http://127.0.0.1:9/never");

        let handle = transport.create_download(&request).await?;
        transport.start(&handle).await?;
        assert!(transport.start(&handle).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_handles_cannot_be_started() -> Result<()> {
        let dir = TempDir::new()?;
        let (transport, _events) = transport(&dir);

        let foreign = TaskHandle::new(TransferKind::Download, 404);
        assert!(transport.start(&foreign).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoints_complete_with_a_transport_error() -> Result<()> {
        let dir = TempDir::new()?;
        let (transport, mut events) = transport(&dir);
        let request = TransferRequest::new("http://127.0.0.1:1/unreachable");

        let handle = transport.create_download(&request).await?;
        transport.start(&handle).await?;

        let event = tokio::time::timeout(std::time::Duration::from_secs(60), events.next())
            .await
            .expect("completion should arrive")
            .expect("relay open");
        match event {
            TransferEvent::TransferCompleted { handle: done, error } => {
                assert_eq!(done, handle);
                assert!(error.is_some(), "connection failure expected");
            }
            other => panic!("unexpected event {other:?}"),
        }

        // The table drained, so the finished-events signal follows.
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), events.next())
            .await
            .expect("drain signal should arrive")
            .expect("relay open");
        assert!(matches!(event, TransferEvent::AllEventsDelivered));
        Ok(())
    }
}
