//! Client disconnect handling over a real socket.
//!
//! A client that hangs up mid-stream must leave a `failed` record behind and
//! must not wedge the server.

use depot::delivery::{AuditStore, Delivery, StaticRoot, TracingReporter, TransferStatus};
use depot::http::{AppState, TrustedHeaderAuth, router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const LARGE: usize = 32 * 1024 * 1024;

async fn start_server() -> (tempfile::TempDir, AuditStore, SocketAddr) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
    std::fs::write(dir.path().join("downloads/large.bin"), vec![7u8; LARGE]).unwrap();
    std::fs::write(dir.path().join("downloads/small.bin"), b"tiny").unwrap();

    let store = AuditStore::memory();
    let delivery = Delivery::new(
        StaticRoot::new(dir.path(), "downloads").unwrap(),
        store.clone(),
        Arc::new(TracingReporter),
    );
    let auth = TrustedHeaderAuth::new("x-user-id", false).unwrap();
    let app = router(AppState::new(delivery, Arc::new(auth)), "/apis");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (dir, store, addr)
}

async fn send_get(addr: SocketAddr, path: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nx-user-id: u-7\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    stream
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnect_mid_stream_fails_record() {
    let (_dir, store, addr) = start_server().await;

    let mut stream = send_get(addr, "/apis/download?downloadPath=large.bin").await;
    let mut buf = vec![0u8; 16 * 1024];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(n > 0);
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
    drop(stream);

    let mut status = None;
    for _ in 0..500 {
        let records = store.list_records(10).await.unwrap();
        if let Some(record) = records.first()
            && record.status.is_terminal()
        {
            status = Some(record.status);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, Some(TransferStatus::Failed));

    // The server keeps serving.
    let mut stream = send_get(addr, "/apis/download?downloadPath=small.bin").await;
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 200"));
    assert!(text.ends_with("tiny"));
}
