//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the two bindings (`/` and `/{*path}`)
//! - Wire up middleware (tracing, body limit, timeout, request ID)
//! - Hand each request to the orchestrator and emit its response
//! - Serve until the shutdown signal fires
//!
//! Both handlers are thin: they buffer the body, collect the routing facts
//! and delegate. Routing decisions live in the orchestrator.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::{EntryPoint, Orchestrator, ProxyRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub max_body_size: usize,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, orchestrator: Arc<Orchestrator>) -> Self {
        let state = AppState {
            orchestrator,
            max_body_size: config.security.max_body_size,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed innermost first. A request that outlives the
    /// deadline is an origin problem, so it answers 504, not 408.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let max_body_size = state.max_body_size;

        Router::new()
            .route("/", any(root_handler))
            .route("/{*path}", any(path_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(RequestBodyLimitLayer::new(max_body_size))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id(request.headers()),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn root_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    serve(state, EntryPoint::Root, request).await
}

async fn path_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    serve(state, EntryPoint::Wildcard, request).await
}

async fn serve(state: AppState, entry: EntryPoint, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_size, "Rejected request body");
            let err = if is_length_limit(&e) {
                ProxyError::PayloadTooLarge {
                    limit: state.max_body_size,
                }
            } else {
                ProxyError::BadRequestBody(e.to_string())
            };
            metrics::record_request("NONE", err.status().as_u16(), start);
            return err.into_response();
        }
    };

    let request = ProxyRequest::from_parts(entry, &parts, body);
    tracing::debug!(path = %request.path, method = %request.method, "Proxying request");

    match state.orchestrator.handle(request).await {
        Ok(response) => {
            metrics::record_request(response.cache_label(), response.status.as_u16(), start);
            response.into_response()
        }
        Err(err) => {
            match &err {
                ProxyError::UpstreamNonSuccess { status, .. } => {
                    tracing::info!(status = %status, "Forwarding origin error response");
                }
                other => tracing::error!(error = %other, "Request failed"),
            }
            metrics::record_request("NONE", err.status().as_u16(), start);
            err.into_response()
        }
    }
}

/// Whether a body read failed because it ran over the size limit.
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBlobStore;
    use crate::upstream::{OriginFetcher, OriginRequest, UpstreamResponse, UpstreamResult};
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use bytes::Bytes;
    use http_body_util::Limited;
    use tower::ServiceExt;

    /// Origin that answers after `delay`.
    struct SlowOrigin {
        delay: Duration,
    }

    #[async_trait]
    impl OriginFetcher for SlowOrigin {
        async fn fetch(&self, _request: OriginRequest) -> UpstreamResult<UpstreamResponse> {
            tokio::time::sleep(self.delay).await;
            Ok(UpstreamResponse::new(
                StatusCode::OK,
                HeaderMap::new(),
                Bytes::from_static(b"<html></html>"),
            ))
        }
    }

    fn server(request_secs: u64, delay: Duration) -> HttpServer {
        let mut config = ProxyConfig::default();
        config.upstream.origin_url = "https://origin.test".to_string();
        config.timeouts.request_secs = request_secs;
        let orchestrator = Orchestrator::from_config(
            &config,
            Arc::new(SlowOrigin { delay }),
            Arc::new(MemoryBlobStore::new()),
        )
        .unwrap();
        HttpServer::new(&config, Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn test_layered_router_serves_requests() {
        let router = server(30, Duration::ZERO).router();

        let res = router
            .clone()
            .oneshot(Request::get("/?test=true").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(X_REQUEST_ID));

        let res = router
            .oneshot(Request::get("/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-cache-status"], "MISS");
    }

    #[tokio::test]
    async fn test_request_deadline_answers_504() {
        let router = server(1, Duration::from_secs(3)).router();

        let res = router
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_a_length_error() {
        let body = Body::new(Limited::new(Body::from("x".repeat(64)), 16));
        let err = axum::body::to_bytes(body, usize::MAX).await.unwrap_err();
        assert!(is_length_limit(&err));

        let err = axum::body::to_bytes(Body::from("x".repeat(64)), 16)
            .await
            .unwrap_err();
        assert!(is_length_limit(&err));
    }

    #[test]
    fn test_broken_body_is_not_a_length_error() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        ));
        assert!(!is_length_limit(&err));

        let res = ProxyError::BadRequestBody(err.to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
