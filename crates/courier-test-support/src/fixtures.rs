//! Test fixtures and environment helpers.

use std::path::{Path, PathBuf};

use courier_core::TransferRequest;
use courier_telemetry::{LogFormat, LoggingConfig};
use uuid::Uuid;

/// Install a verbose test subscriber. Safe to call from every test; only
/// the first call in the process installs anything.
pub fn init_test_logging() {
    let _ = courier_telemetry::init_logging(&LoggingConfig {
        level: "debug",
        format: LogFormat::Pretty,
    });
}

/// A transfer identifier unique to this call.
#[must_use]
pub fn unique_identifier(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// A plain GET request against a placeholder endpoint.
#[must_use]
pub fn sample_request() -> TransferRequest {
    TransferRequest::new("https://transfers.invalid/resource")
}

/// Write `contents` into `dir` under a unique name and return the path.
///
/// # Panics
///
/// Panics if the file cannot be written; fixtures fail tests loudly.
#[must_use]
pub fn staged_file(dir: &Path, contents: &[u8]) -> PathBuf {
    let path = dir.join(format!("staged-{}", Uuid::new_v4()));
    std::fs::write(&path, contents).expect("failed to write staged fixture file");
    path
}
