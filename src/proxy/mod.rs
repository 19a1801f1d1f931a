//! Request orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP binding (/ or /{*path})
//!     → request.rs (ProxyRequest: method, path, query, host, body)
//!     → orchestrator.rs (Route::classify, then one of five paths)
//!         → cache (key, lookup, write-through)
//!         → upstream (origin fetch)
//!         → rewrite (branding removal)
//!     → outcome.rs (ProxyResponse)
//!     → http/response.rs (headers, emission)
//! ```

pub mod orchestrator;
pub mod outcome;
pub mod pages;
pub mod request;

pub use orchestrator::{Orchestrator, OrchestratorBuildError, Route};
pub use outcome::{CacheStatus, ProxyResponse};
pub use request::{EntryPoint, ProxyRequest, QueryParams};
