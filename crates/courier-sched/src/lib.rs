#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Wake-scheduler facade.
//!
//! A thin submit/register surface over whatever opportunistic-execution
//! facility the platform provides: callers submit wake requests keyed by
//! identifier and register launch handlers; the platform glue dispatches
//! a [`WakeTask`] into the matching handler when a wake window opens.
//! The facade keeps everything in-process so tests can drive dispatch
//! themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// A request for a future wake-up, keyed by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeRequest {
    /// A lightweight refresh opportunity.
    Refresh {
        /// Wake identifier; the latest request per identifier wins.
        identifier: String,
        /// Do not wake before this instant, when set.
        earliest_begin: Option<DateTime<Utc>>,
    },
    /// A longer processing window with resource requirements.
    Processing {
        /// Wake identifier; the latest request per identifier wins.
        identifier: String,
        /// Do not wake before this instant, when set.
        earliest_begin: Option<DateTime<Utc>>,
        /// Only wake while the network is reachable.
        requires_network: bool,
        /// Only wake while external power is available.
        requires_power: bool,
    },
}

impl WakeRequest {
    /// A refresh request with no earliest-begin constraint.
    #[must_use]
    pub fn refresh(identifier: impl Into<String>) -> Self {
        Self::Refresh {
            identifier: identifier.into(),
            earliest_begin: None,
        }
    }

    /// A processing request with no constraints.
    #[must_use]
    pub fn processing(identifier: impl Into<String>) -> Self {
        Self::Processing {
            identifier: identifier.into(),
            earliest_begin: None,
            requires_network: false,
            requires_power: false,
        }
    }

    /// The wake identifier this request is keyed by.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Refresh { identifier, .. } | Self::Processing { identifier, .. } => identifier,
        }
    }

    /// Constrain the request to begin no earlier than `instant`.
    #[must_use]
    pub fn not_before(mut self, instant: DateTime<Utc>) -> Self {
        match &mut self {
            Self::Refresh { earliest_begin, .. } | Self::Processing { earliest_begin, .. } => {
                *earliest_begin = Some(instant);
            }
        }
        self
    }
}

type LaunchHandler = Arc<dyn Fn(WakeTask) + Send + Sync>;
type ExpirationHandler = Box<dyn FnOnce() + Send>;

/// Handle given to a launch handler for one wake window.
#[derive(Clone)]
pub struct WakeTask {
    identifier: String,
    completed: Arc<Mutex<Option<bool>>>,
    expiration: Arc<Mutex<Option<ExpirationHandler>>>,
}

impl WakeTask {
    fn new(identifier: String) -> Self {
        Self {
            identifier,
            completed: Arc::new(Mutex::new(None)),
            expiration: Arc::new(Mutex::new(None)),
        }
    }

    /// Identifier of the wake request being serviced.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Tell the platform the work for this window is done.
    ///
    /// # Panics
    ///
    /// Panics if the completion slot mutex has been poisoned.
    pub fn set_completed(&self, success: bool) {
        *self.completed.lock().expect("completion slot poisoned") = Some(success);
    }

    /// Completion status reported so far, if any.
    ///
    /// # Panics
    ///
    /// Panics if the completion slot mutex has been poisoned.
    #[must_use]
    pub fn completed(&self) -> Option<bool> {
        *self.completed.lock().expect("completion slot poisoned")
    }

    /// Install the handler run when the wake window is about to close.
    ///
    /// # Panics
    ///
    /// Panics if the expiration slot mutex has been poisoned.
    pub fn set_expiration_handler(&self, handler: impl FnOnce() + Send + 'static) {
        *self.expiration.lock().expect("expiration slot poisoned") = Some(Box::new(handler));
    }

    /// Run the expiration handler, once. Called by the platform glue
    /// when the window closes before the work completed.
    ///
    /// # Panics
    ///
    /// Panics if the expiration slot mutex has been poisoned.
    pub fn expire(&self) {
        let handler = self.expiration.lock().expect("expiration slot poisoned").take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

/// In-process registry of wake requests and launch handlers.
#[derive(Default)]
pub struct WakeScheduler {
    state: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    requests: HashMap<String, WakeRequest>,
    registrations: HashMap<String, LaunchHandler>,
}

impl WakeScheduler {
    /// An empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("scheduler state poisoned")
    }

    /// Record a wake request. The latest request per identifier wins.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler state mutex has been poisoned.
    pub fn submit(&self, request: WakeRequest) {
        let identifier = request.identifier().to_string();
        debug!(identifier = %identifier, "wake request submitted");
        self.lock().requests.insert(identifier, request);
    }

    /// Install the launch handler for `identifier`. Returns `false`
    /// without replacing anything when a handler is already registered;
    /// registering twice is a caller mistake, not a reconfiguration.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler state mutex has been poisoned.
    pub fn register(
        &self,
        identifier: impl Into<String>,
        handler: impl Fn(WakeTask) + Send + Sync + 'static,
    ) -> bool {
        let identifier = identifier.into();
        let mut state = self.lock();
        if state.registrations.contains_key(&identifier) {
            warn!(identifier = %identifier, "launch handler already registered");
            return false;
        }
        state.registrations.insert(identifier, Arc::new(handler));
        true
    }

    /// The wake request currently recorded for `identifier`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler state mutex has been poisoned.
    #[must_use]
    pub fn pending_request(&self, identifier: &str) -> Option<WakeRequest> {
        self.lock().requests.get(identifier).cloned()
    }

    /// Open a wake window for `identifier`: consume the pending request
    /// and run the registered launch handler with a fresh [`WakeTask`].
    /// Returns the task for observation, or `None` when no handler is
    /// registered.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler state mutex has been poisoned.
    pub fn dispatch(&self, identifier: &str) -> Option<WakeTask> {
        let handler = {
            let mut state = self.lock();
            let handler = state.registrations.get(identifier).cloned();
            if handler.is_some() {
                state.requests.remove(identifier);
            }
            handler
        };

        let Some(handler) = handler else {
            debug!(identifier = %identifier, "no launch handler registered for wake");
            return None;
        };

        let task = WakeTask::new(identifier.to_string());
        handler(task.clone());
        Some(task)
    }
}
