//! Pluggable strategy for persisting stable identifiers on task handles.

use std::fmt;
use std::sync::Arc;

use courier_events::TaskHandle;

type ExtractFn = dyn Fn(&TaskHandle) -> Option<String> + Send + Sync;
type StampFn = dyn Fn(&TaskHandle, &str) + Send + Sync;

/// Strategy pair that reads a stable identifier back out of an opaque
/// handle and stamps one onto a handle being created.
///
/// The default strategy stores the identifier in the handle's label slot,
/// which the transport retains across process restarts; deployments with
/// other persistence (a side table keyed by task id, say) substitute
/// their own pair.
#[derive(Clone)]
pub struct TaskIdentity {
    extract: Arc<ExtractFn>,
    stamp: Arc<StampFn>,
}

impl TaskIdentity {
    /// Build a strategy from an extract/stamp pair.
    #[must_use]
    pub fn new(
        extract: impl Fn(&TaskHandle) -> Option<String> + Send + Sync + 'static,
        stamp: impl Fn(&TaskHandle, &str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            extract: Arc::new(extract),
            stamp: Arc::new(stamp),
        }
    }

    /// Build a read-only strategy; stamping becomes a no-op.
    #[must_use]
    pub fn extract_only(
        extract: impl Fn(&TaskHandle) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self::new(extract, |_, _| {})
    }

    /// The default strategy: the identifier lives in the handle's label
    /// slot.
    #[must_use]
    pub fn label_slot() -> Self {
        Self::new(
            |handle| handle.label(),
            |handle, identifier| handle.set_label(identifier),
        )
    }

    /// Read the stable identifier from `handle`, when one is present.
    #[must_use]
    pub fn extract(&self, handle: &TaskHandle) -> Option<String> {
        (self.extract)(handle)
    }

    /// Persist `identifier` onto `handle`.
    pub fn stamp(&self, handle: &TaskHandle, identifier: &str) {
        (self.stamp)(handle, identifier);
    }
}

impl Default for TaskIdentity {
    fn default() -> Self {
        Self::label_slot()
    }
}

impl fmt::Debug for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskIdentity").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use courier_events::TransferKind;

    #[test]
    fn label_slot_strategy_round_trips() {
        let identity = TaskIdentity::label_slot();
        let handle = TaskHandle::new(TransferKind::Download, 1);

        assert_eq!(identity.extract(&handle), None);
        identity.stamp(&handle, "report-2026-08");
        assert_eq!(identity.extract(&handle), Some("report-2026-08".into()));
    }

    #[test]
    fn side_table_strategy_is_substitutable() {
        let table: Arc<Mutex<HashMap<u64, String>>> = Arc::new(Mutex::new(HashMap::new()));

        let extract_table = Arc::clone(&table);
        let stamp_table = Arc::clone(&table);
        let identity = TaskIdentity::new(
            move |handle| {
                extract_table
                    .lock()
                    .expect("side table poisoned")
                    .get(&handle.task_id())
                    .cloned()
            },
            move |handle, identifier| {
                stamp_table
                    .lock()
                    .expect("side table poisoned")
                    .insert(handle.task_id(), identifier.to_string());
            },
        );

        let handle = TaskHandle::new(TransferKind::Upload, 11);
        identity.stamp(&handle, "avatar-upload");

        assert_eq!(handle.label(), None, "side table must not touch the slot");
        assert_eq!(identity.extract(&handle), Some("avatar-upload".into()));
    }

    #[test]
    fn extract_only_strategy_ignores_stamps() {
        let identity = TaskIdentity::extract_only(|handle| handle.label());
        let handle = TaskHandle::new(TransferKind::Download, 5);

        identity.stamp(&handle, "ignored");
        assert_eq!(identity.extract(&handle), None);
    }
}
