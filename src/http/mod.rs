//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, `/` and `/{*path}` bindings)
//!     → request.rs (request ID generation and lookup)
//!     → [orchestrator decides the path and builds a ProxyResponse]
//!     → response.rs (content type, cache headers, passthrough headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{format_timestamp, X_CACHE_STATUS, X_CACHE_TIMESTAMP};
pub use server::{AppState, HttpServer};
