//! Async test assertions.

use std::time::Duration;

use tokio::time::{Instant, sleep};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or the default deadline elapses.
///
/// # Panics
///
/// Panics with `message` when the condition does not hold in time.
pub async fn eventually(mut condition: impl FnMut() -> bool, message: &str) {
    let deadline = Instant::now() + DEFAULT_DEADLINE;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        sleep(POLL_INTERVAL).await;
    }
    panic!("condition not met within {DEFAULT_DEADLINE:?}: {message}");
}
