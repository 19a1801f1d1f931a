//! Shared utilities for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header::HOST, HeaderMap, HeaderValue, Method, Request, StatusCode};
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rewrite_proxy::cache::{Blob, BlobMeta, BlobStore, MemoryBlobStore, StoreError, StoreResult};
use rewrite_proxy::config::ProxyConfig;
use rewrite_proxy::proxy::{EntryPoint, Orchestrator, ProxyRequest};
use rewrite_proxy::upstream::{
    OriginFetcher, OriginRequest, UpstreamError, UpstreamResponse,
};

pub const ORIGIN: &str = "https://origin.test";

pub const BRANDED_PAGE: &str = "<html><head><title>Home</title></head>\
    <body><h1>Welcome</h1><a class=\"badge\">Made in Framer</a></body></html>";

type Responder = dyn Fn(&OriginRequest) -> Result<UpstreamResponse, UpstreamError> + Send + Sync;

/// In-process origin that answers from a closure and records every request.
pub struct ScriptedOrigin {
    responder: Box<Responder>,
    requests: Mutex<Vec<OriginRequest>>,
}

impl ScriptedOrigin {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&OriginRequest) -> Result<UpstreamResponse, UpstreamError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answers 200 with `body` as `text/html`.
    pub fn html(body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(response(StatusCode::OK, "text/html; charset=utf-8", body)))
    }

    /// Always answers with a non-success status.
    pub fn status(status: StatusCode, body: &'static str) -> Arc<Self> {
        Self::new(move |_| {
            Err(UpstreamError::Status(Box::new(response(
                status,
                "text/html",
                body,
            ))))
        })
    }

    /// Never reachable.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|_| Err(UpstreamError::Unreachable("connection refused".into())))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> OriginRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("origin was never called")
    }
}

#[async_trait]
impl OriginFetcher for ScriptedOrigin {
    async fn fetch(&self, request: OriginRequest) -> Result<UpstreamResponse, UpstreamError> {
        let result = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        result
    }
}

pub fn response(status: StatusCode, content_type: &str, body: &str) -> UpstreamResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_str(content_type).unwrap(),
    );
    UpstreamResponse::new(status, headers, Bytes::copy_from_slice(body.as_bytes()))
}

/// Memory store that counts every operation.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryBlobStore,
    pub puts: AtomicUsize,
    pub heads: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn operations(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
            + self.heads.load(Ordering::SeqCst)
            + self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for CountingStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<BlobMeta> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, body, content_type).await
    }

    async fn head(&self, key: &str) -> StoreResult<Option<BlobMeta>> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.inner.head(key).await
    }

    async fn fetch(&self, url: &str) -> StoreResult<Blob> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(url).await
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl BlobStore for BrokenStore {
    async fn put(&self, _key: &str, _body: Bytes, _content_type: &str) -> StoreResult<BlobMeta> {
        Err(StoreError::Unavailable("write quota exceeded".into()))
    }

    async fn head(&self, _key: &str) -> StoreResult<Option<BlobMeta>> {
        Err(StoreError::Unavailable("lookup timed out".into()))
    }

    async fn fetch(&self, url: &str) -> StoreResult<Blob> {
        Err(StoreError::NotFound(url.to_string()))
    }
}

pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.origin_url = ORIGIN.into();
    config
}

pub fn orchestrator(
    config: &ProxyConfig,
    origin: Arc<ScriptedOrigin>,
    store: Arc<dyn BlobStore>,
) -> Orchestrator {
    Orchestrator::from_config(config, origin, store).unwrap()
}

/// Build a `ProxyRequest` the way the HTTP bindings do.
pub fn request(method: Method, uri: &str, host: Option<&str>, body: &'static str) -> ProxyRequest {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(host) = host {
        builder = builder.header(HOST, host);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    let entry = if parts.uri.path() == "/" {
        EntryPoint::Root
    } else {
        EntryPoint::Wildcard
    };
    ProxyRequest::from_parts(entry, &parts, Bytes::from_static(body.as_bytes()))
}

pub fn get(uri: &str) -> ProxyRequest {
    request(Method::GET, uri, Some("proxy.test"), "")
}

/// Start a programmable HTTP origin on an ephemeral port.
///
/// The closure receives the request line and returns status, content type
/// and body.
pub async fn start_programmable_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request_line) = read_request(&mut socket).await else {
                    return;
                };
                let (status, content_type, body) = f(request_line).await;
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len(),
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Read one request (head and `Content-Length` body); returns its request line.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    head.lines().next().map(str::to_string)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
