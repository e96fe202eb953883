//! Request DTO handed to the transport when a transfer is created.

use serde::{Deserialize, Serialize};

fn default_method() -> String {
    "GET".to_string()
}

/// Protocol-level description of the request a transfer performs.
///
/// The request says nothing about identity or completion handling; those
/// belong to the coordinator. Upload payloads are supplied separately as
/// a file path, mirroring how long-running transports require on-disk
/// bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Absolute URL of the remote endpoint.
    pub url: String,
    /// HTTP method; defaults to `GET`.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request headers, applied in order.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl TransferRequest {
    /// A `GET` request for `url` with no additional headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: Vec::new(),
        }
    }

    /// Replace the request method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Append a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requests_default_to_get() {
        let request = TransferRequest::new("https://example.com/report");
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn builder_methods_accumulate() {
        let request = TransferRequest::new("https://example.com/report")
            .with_method("PUT")
            .with_header("Content-Type", "application/json")
            .with_header("Authorization", "Bearer token");

        assert_eq!(request.method, "PUT");
        assert_eq!(request.headers.len(), 2);
    }

    #[test]
    fn missing_method_deserializes_to_get() {
        let request: TransferRequest =
            serde_json::from_str(r#"{"url": "https://example.com/a"}"#).expect("valid request");
        assert_eq!(request.method, "GET");
    }
}
