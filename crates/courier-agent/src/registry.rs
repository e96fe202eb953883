use std::collections::HashMap;
use std::path::PathBuf;

use courier_core::TransferOutcome;

pub(crate) type DownloadHandler = Box<dyn FnOnce(&str, TransferOutcome<PathBuf>) + Send>;
pub(crate) type UploadHandler = Box<dyn FnOnce(&str, TransferOutcome<()>) + Send>;

/// Pending-handler bookkeeping. One handler per `(kind, identifier)` key;
/// handlers leave the registry the moment they are taken, which is what
/// makes invocation exactly-once.
#[derive(Default)]
pub(crate) struct Registry {
    downloads: HashMap<String, DownloadHandler>,
    uploads: HashMap<String, UploadHandler>,
    staged: HashMap<u64, PathBuf>,
}

impl Registry {
    /// Register a download handler.
    ///
    /// Panics if `identifier` already has a pending download handler;
    /// re-registering a live identifier is a caller bug, not a runtime
    /// condition.
    pub(crate) fn register_download(&mut self, identifier: String, handler: DownloadHandler) {
        assert!(
            !self.downloads.contains_key(&identifier),
            "download handler already registered for identifier {identifier:?}"
        );
        self.downloads.insert(identifier, handler);
    }

    /// Register an upload handler. Panics on a duplicate identifier, as
    /// [`Registry::register_download`] does.
    pub(crate) fn register_upload(&mut self, identifier: String, handler: UploadHandler) {
        assert!(
            !self.uploads.contains_key(&identifier),
            "upload handler already registered for identifier {identifier:?}"
        );
        self.uploads.insert(identifier, handler);
    }

    pub(crate) fn take_download(&mut self, identifier: &str) -> Option<DownloadHandler> {
        self.downloads.remove(identifier)
    }

    pub(crate) fn take_upload(&mut self, identifier: &str) -> Option<UploadHandler> {
        self.uploads.remove(identifier)
    }

    /// Remember the staged body location for a download task until its
    /// completion event arrives.
    pub(crate) fn stage(&mut self, task_id: u64, path: PathBuf) {
        self.staged.insert(task_id, path);
    }

    pub(crate) fn take_staged(&mut self, task_id: u64) -> Option<PathBuf> {
        self.staged.remove(&task_id)
    }

    /// Drop every pending handler, resolving nothing. Used at loop
    /// shutdown so awaitable bridges observe the closed channel instead
    /// of pending forever.
    pub(crate) fn clear(&mut self) -> usize {
        let abandoned = self.downloads.len() + self.uploads.len();
        self.downloads.clear();
        self.uploads.clear();
        self.staged.clear();
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_download() -> DownloadHandler {
        Box::new(|_, _| {})
    }

    #[test]
    fn taking_a_handler_removes_it() {
        let mut registry = Registry::default();
        registry.register_download("id-1".into(), noop_download());

        assert!(registry.take_download("id-1").is_some());
        assert!(registry.take_download("id-1").is_none());
    }

    #[test]
    fn kinds_do_not_share_a_namespace() {
        let mut registry = Registry::default();
        registry.register_download("id-1".into(), noop_download());
        registry.register_upload("id-1".into(), Box::new(|_, _| {}));

        assert!(registry.take_upload("id-1").is_some());
        assert!(registry.take_download("id-1").is_some());
    }

    #[test]
    #[should_panic(expected = "download handler already registered")]
    fn duplicate_download_registration_panics() {
        let mut registry = Registry::default();
        registry.register_download("id-1".into(), noop_download());
        registry.register_download("id-1".into(), noop_download());
    }

    #[test]
    #[should_panic(expected = "upload handler already registered")]
    fn duplicate_upload_registration_panics() {
        let mut registry = Registry::default();
        registry.register_upload("id-1".into(), Box::new(|_, _| {}));
        registry.register_upload("id-1".into(), Box::new(|_, _| {}));
    }

    #[test]
    fn staged_paths_are_taken_once() {
        let mut registry = Registry::default();
        registry.stage(4, PathBuf::from("/tmp/staged"));

        assert_eq!(registry.take_staged(4), Some(PathBuf::from("/tmp/staged")));
        assert_eq!(registry.take_staged(4), None);
    }

    #[test]
    fn clear_reports_abandoned_handlers() {
        let mut registry = Registry::default();
        registry.register_download("a".into(), noop_download());
        registry.register_upload("b".into(), Box::new(|_, _| {}));
        registry.stage(1, PathBuf::from("/tmp/x"));

        assert_eq!(registry.clear(), 2);
        assert!(registry.take_staged(1).is_none());
    }
}
