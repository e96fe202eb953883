//! Event relay between a transport's push-style completion callbacks and
//! the single coordinator loop that consumes them.
//!
//! The relay is an unbounded in-memory queue: producers (transport
//! callback contexts, possibly concurrent across transfers) push typed
//! events without ever blocking, and exactly one consumer drains them in
//! push order. Consuming events one at a time is what serializes all
//! coordinator state mutations without an explicit lock around them.

mod handle;

pub use handle::{ResponseHead, TaskHandle, TransferKind};

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

/// Typed events pushed by a transport and drained by the coordinator.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// Every completion notification queued for the current wake-up has
    /// been delivered. May be signalled more than once across launches.
    AllEventsDelivered,
    /// A transfer finished, successfully or not. `error` carries the
    /// transport-level failure message when the protocol exchange itself
    /// broke down; protocol-level rejection is judged from the response
    /// head recorded on the handle.
    TransferCompleted {
        /// Handle of the finished transfer.
        handle: TaskHandle,
        /// Transport-level failure, if the exchange broke down.
        error: Option<String>,
    },
    /// A download's body has been staged to a local file. Always precedes
    /// the matching `TransferCompleted` for the same handle.
    DownloadDataReady {
        /// Handle of the download that produced the staged file.
        handle: TaskHandle,
        /// Location of the staged body.
        staging_path: PathBuf,
    },
}

impl TransferEvent {
    /// Machine-friendly discriminator for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            TransferEvent::AllEventsDelivered => "all_events_delivered",
            TransferEvent::TransferCompleted { .. } => "transfer_completed",
            TransferEvent::DownloadDataReady { .. } => "download_data_ready",
        }
    }
}

/// Producer half of the relay. Cheap to clone; pushes never block.
#[derive(Debug, Clone)]
pub struct EventRelay {
    sender: mpsc::UnboundedSender<TransferEvent>,
}

impl EventRelay {
    /// Create a connected producer/consumer pair.
    #[must_use]
    pub fn channel() -> (Self, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, EventStream { receiver })
    }

    /// Push an event onto the relay. A relay whose consumer has gone away
    /// drops the event silently; there is nobody left to drain it.
    pub fn publish(&self, event: TransferEvent) {
        let _ = self.sender.send(event);
    }
}

/// Consumer half of the relay. There is exactly one per coordinator.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<TransferEvent>,
}

impl EventStream {
    /// Receive the next event in push order. Returns `None` once every
    /// producer handle has been dropped and the queue is empty.
    pub async fn next(&mut self) -> Option<TransferEvent> {
        self.receiver.recv().await
    }
}

impl tokio_stream::Stream for EventStream {
    type Item = TransferEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
