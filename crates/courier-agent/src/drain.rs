use tokio::sync::oneshot;

/// Single-shot latch for the platform's finished-events signal.
///
/// The latch starts pending; the first signal flips it and releases the
/// registered waiter, if any. Later signals are no-ops: the platform may
/// legitimately re-signal across launches, but each coordinator instance
/// hands the signal on at most once. Registering a second waiter while
/// one is outstanding displaces the first (last writer wins); a displaced
/// waiter is never released.
pub(crate) struct DrainLatch {
    pending: bool,
    waiter: Option<oneshot::Sender<()>>,
}

impl DrainLatch {
    pub(crate) const fn new() -> Self {
        Self {
            pending: true,
            waiter: None,
        }
    }

    /// Record the finished-events signal. Returns `true` when this was
    /// the first signal, releasing the outstanding waiter.
    pub(crate) fn signal(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.send(());
        }
        true
    }

    /// Register to be released by the next signal. Returns `None` when
    /// the latch has already fired, in which case there is nothing to
    /// wait for.
    pub(crate) fn wait(&mut self) -> Option<oneshot::Receiver<()>> {
        if !self.pending {
            return None;
        }
        let (sender, receiver) = oneshot::channel();
        self.waiter = Some(sender);
        Some(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_signal_releases_the_waiter() {
        let mut latch = DrainLatch::new();
        let receiver = latch.wait().expect("latch should be pending");

        assert!(latch.signal());
        assert!(receiver.await.is_ok());
    }

    #[test]
    fn repeated_signals_are_no_ops() {
        let mut latch = DrainLatch::new();
        assert!(latch.signal());
        assert!(!latch.signal());
        assert!(!latch.signal());
    }

    #[test]
    fn waiting_after_the_signal_returns_immediately() {
        let mut latch = DrainLatch::new();
        latch.signal();
        assert!(latch.wait().is_none());
    }

    #[tokio::test]
    async fn a_second_waiter_displaces_the_first() {
        let mut latch = DrainLatch::new();
        let first = latch.wait().expect("pending");
        let second = latch.wait().expect("still pending");

        latch.signal();
        assert!(first.await.is_err(), "displaced waiter must not fire");
        assert!(second.await.is_ok());
    }
}
