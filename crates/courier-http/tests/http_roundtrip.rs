//! Full-stack round trips: coordinator + HTTP transport against a local
//! canned-response server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier_agent::TransferAgent;
use courier_core::{TaskIdentity, TransferOutcome, TransferRequest};
use courier_events::EventRelay;
use courier_http::{HttpTransport, HttpTransportConfig};
use courier_test_support::assert::eventually;
use courier_test_support::fixtures::init_test_logging;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request: read it fully, answer with `status_line`
/// plus `extra_headers`, and return the request body that was received.
fn serve_once(
    listener: TcpListener,
    status_line: &'static str,
    extra_headers: &'static str,
    body: &'static [u8],
) -> JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");

        let mut buf = Vec::new();
        let mut tmp = [0_u8; 1024];
        let header_end = loop {
            let read = socket.read(&mut tmp).await.expect("read request head");
            assert!(read > 0, "client closed before sending a full request");
            buf.extend_from_slice(&tmp[..read]);
            if let Some(position) = find_blank_line(&buf) {
                break position;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let read = socket.read(&mut tmp).await.expect("read request body");
            assert!(read > 0, "client closed before sending the body");
            buf.extend_from_slice(&tmp[..read]);
        }

        let response = format!(
            "{status_line}\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response head");
        socket.write_all(body).await.expect("write response body");
        socket.flush().await.expect("flush response");

        buf[header_end..].to_vec()
    })
}

/// Offset just past the header-terminating blank line.
fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|position| position + 4)
}

struct Stack {
    _dir: TempDir,
    staging_dir: std::path::PathBuf,
    agent: TransferAgent,
}

fn stack() -> Stack {
    init_test_logging();
    let dir = TempDir::new().expect("tempdir");
    let staging_dir = dir.path().join("staging");
    let (relay, events) = EventRelay::channel();
    let transport = HttpTransport::new(
        HttpTransportConfig {
            staging_dir: staging_dir.clone(),
            user_agent: Some("courier-tests/0.1".into()),
            ..HttpTransportConfig::default()
        },
        relay,
    )
    .expect("transport builds");
    let agent = TransferAgent::new(Arc::new(transport), TaskIdentity::label_slot(), events);
    Stack {
        _dir: dir,
        staging_dir,
        agent,
    }
}

async fn bound_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("http://{addr}/resource"))
}

#[tokio::test]
async fn downloads_stage_the_body_and_clean_up() {
    let stack = stack();
    let (listener, url) = bound_listener().await;
    let server = serve_once(listener, "HTTP/1.1 200 OK", "", b"hello courier");

    // Read the staged body inside the handler: the file is gone once the
    // handler returns.
    let received: Arc<Mutex<Option<(Vec<u8>, u16)>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&received);
    stack
        .agent
        .begin_download(TransferRequest::new(url), "dl-1", move |_, outcome| {
            if let TransferOutcome::Success { payload, status } = outcome {
                let bytes = std::fs::read(&payload).expect("staged file readable in handler");
                *sink.lock().expect("sink poisoned") = Some((bytes, status));
            }
        });

    eventually(
        || received.lock().expect("sink poisoned").is_some(),
        "download handler invoked",
    )
    .await;
    let (bytes, status) = received
        .lock()
        .expect("sink poisoned")
        .take()
        .expect("outcome recorded");
    assert_eq!(bytes, b"hello courier");
    assert_eq!(status, 200);

    server.await.expect("server task");

    // The staging directory holds nothing once the handler returned.
    eventually(
        || {
            std::fs::read_dir(&stack.staging_dir)
                .map(|entries| entries.count() == 0)
                .unwrap_or(false)
        },
        "staging directory cleaned",
    )
    .await;
}

#[tokio::test]
async fn uploads_send_the_payload_file() {
    let stack = stack();
    let (listener, url) = bound_listener().await;
    let server = serve_once(listener, "HTTP/1.1 201 Created", "", b"");

    let payload = stack.staging_dir.join("payload.bin");
    std::fs::create_dir_all(&stack.staging_dir).expect("staging dir");
    std::fs::write(&payload, b"upload-bytes").expect("payload written");

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        stack.agent.upload(
            payload,
            TransferRequest::new(url).with_method("POST"),
            "up-1",
        ),
    )
    .await
    .expect("upload resolves");
    assert_eq!(
        outcome,
        TransferOutcome::Success {
            payload: (),
            status: 201
        }
    );

    let request_body = server.await.expect("server task");
    assert_eq!(request_body, b"upload-bytes");
}

#[tokio::test]
async fn overloaded_servers_yield_retryable_outcomes() {
    let stack = stack();
    let (listener, url) = bound_listener().await;
    let server = serve_once(
        listener,
        "HTTP/1.1 503 Service Unavailable",
        "Retry-After: 120\r\n",
        b"",
    );

    let payload = stack.staging_dir.join("retry.bin");
    std::fs::create_dir_all(&stack.staging_dir).expect("staging dir");
    std::fs::write(&payload, b"try me later").expect("payload written");

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        stack.agent.upload(
            payload,
            TransferRequest::new(url).with_method("PUT"),
            "up-503",
        ),
    )
    .await
    .expect("upload resolves");
    assert_eq!(
        outcome,
        TransferOutcome::Retryable {
            status: 503,
            retry_after: Some(Duration::from_secs(120)),
        }
    );

    server.await.expect("server task");
}

#[tokio::test]
async fn refused_downloads_resolve_to_rejected() {
    let stack = stack();
    let (listener, url) = bound_listener().await;
    let server = serve_once(listener, "HTTP/1.1 404 Not Found", "", b"gone");

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        stack.agent.download(TransferRequest::new(url), "dl-404"),
    )
    .await
    .expect("download resolves");
    assert_eq!(outcome, TransferOutcome::Rejected { status: 404 });

    server.await.expect("server task");

    // Even a rejected download staged its body; the coordinator removed
    // it afterwards.
    eventually(
        || {
            std::fs::read_dir(&stack.staging_dir)
                .map(|entries| entries.count() == 0)
                .unwrap_or(false)
        },
        "staging directory cleaned",
    )
    .await;
}
