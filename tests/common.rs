//! Shared test harness for router-level tests.
//!
//! [`TestHost`] lays out a static root in a temp directory:
//!
//! ```text
//! <tmp>/secret.txt               outside the root
//! <tmp>/static/bundle.zip        patch bundle
//! <tmp>/static/downloads/ten.bin
//! <tmp>/static/downloads/季度 report (v2).pdf
//! <tmp>/static/media/song.mp3    1000 bytes
//! <tmp>/static/media/movie.mp4
//! ```

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Method, Request, Response};
use bytes::Bytes;
use depot::delivery::{AuditStore, Delivery, StaticRoot, TracingReporter, TransferRecord};
use depot::http::{AppState, TrustedHeaderAuth, router};
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const USER: &str = "u-42";

pub fn peer() -> SocketAddr {
    "203.0.113.7:40000".parse().unwrap()
}

pub fn song_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

pub struct TestHostBuilder {
    prefix: String,
    metrics: Option<String>,
}

impl TestHostBuilder {
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Serve a fixed exposition text on `/metrics`.
    pub fn metrics(mut self, text: &str) -> Self {
        self.metrics = Some(text.to_string());
        self
    }

    pub fn start(self) -> TestHost {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("static");
        std::fs::create_dir_all(root.join("downloads")).unwrap();
        std::fs::create_dir_all(root.join("media")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();
        std::fs::write(root.join("bundle.zip"), b"PK\x03\x04patch").unwrap();
        std::fs::write(root.join("downloads/ten.bin"), b"0123456789").unwrap();
        std::fs::write(root.join("downloads/季度 report (v2).pdf"), b"%PDF-1.7").unwrap();
        std::fs::write(root.join("media/song.mp3"), song_bytes()).unwrap();
        std::fs::write(root.join("media/movie.mp4"), b"videobytes").unwrap();

        let store = AuditStore::memory();
        let delivery = Delivery::new(
            StaticRoot::new(&root, "downloads").unwrap(),
            store.clone(),
            Arc::new(TracingReporter),
        );
        let auth = TrustedHeaderAuth::new("x-user-id", false).unwrap();
        let mut state = AppState::new(delivery, Arc::new(auth));
        if let Some(text) = self.metrics {
            state = state.with_metrics(Arc::new(move || text.clone()));
        }

        let router = router(state, &self.prefix).layer(MockConnectInfo(peer()));
        TestHost {
            _dir: dir,
            root,
            store,
            router,
        }
    }
}

pub struct TestHost {
    _dir: TempDir,
    pub root: PathBuf,
    pub store: AuditStore,
    router: Router,
}

impl TestHost {
    pub fn builder() -> TestHostBuilder {
        TestHostBuilder {
            prefix: "/apis".to_string(),
            metrics: None,
        }
    }

    /// GET as the default authenticated user.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.get_with(uri, &[("x-user-id", USER)]).await
    }

    pub async fn get_with(&self, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        self.request(Method::GET, uri, headers).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Wait until `n` records exist and all of them are terminal.
    pub async fn settled_records(&self, n: usize) -> Vec<TransferRecord> {
        for _ in 0..200 {
            let records = self.store.list_records(100).await.unwrap();
            if records.len() == n && records.iter().all(|r| r.status.is_terminal()) {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("records did not settle: {:?}", self.store.list_records(100).await.unwrap());
    }
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
