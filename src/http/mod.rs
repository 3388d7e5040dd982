//! HTTP request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! caller builds ApiRequest (request.rs)
//!     → pipeline.rs outbound interceptor (default headers + bearer credential)
//!     → transport.rs (reqwest, base URL, timeout, request ID)
//!     → pipeline.rs inbound interceptor
//!         2xx            → response handed back untouched
//!         401, fresh     → single-flight refresh → rewrite header → replay once
//!         anything else  → ApiError to the caller
//! ```
//!
//! # Design Decisions
//! - Requests are replayable descriptors; multipart bodies own their bytes
//! - Refresh never travels through the pipeline, so it cannot recurse
//! - Concurrent 401s share one refresh call

pub mod pipeline;
pub mod request;
pub mod transport;

pub use pipeline::{AuthPipeline, LoggingObserver, SessionObserver};
pub use request::{ApiRequest, ApiResponse, MultipartBody, MultipartPart, RequestBody};
pub use transport::{ReqwestTransport, Transport};
