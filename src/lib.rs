//! AquaGreen monitoring API client.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                  AQUAGREEN CLIENT                     │
//!                    │                                                       │
//!   CLI / UI shell   │  ┌──────────┐    ┌──────────────┐    ┌────────────┐  │
//!   ─────────────────┼─▶│   api    │───▶│     http     │───▶│ transport  │──┼──▶ Backend
//!                    │  │ actions  │    │   pipeline   │    │  reqwest   │  │    REST API
//!                    │  └────┬─────┘    └──────┬───────┘    └────────────┘  │
//!                    │       │                 │ 401                        │
//!                    │       ▼                 ▼                            │
//!                    │  ┌──────────┐    ┌──────────────┐                    │
//!                    │  │  state   │    │ auth refresh │                    │
//!                    │  └──────────┘    └──────┬───────┘                    │
//!                    │                         ▼                            │
//!                    │  ┌─────────────────────────────────────────────┐     │
//!                    │  │ session: credential pair, storage, idle mon │     │
//!                    │  └─────────────────────────────────────────────┘     │
//!                    │                                                       │
//!                    │  Cross-cutting: config, observability, resilience     │
//!                    └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod columns;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod resilience;
pub mod session;

pub use api::DashboardClient;
pub use config::ClientConfig;
pub use error::{ApiError, AuthError, TransportError};
pub use http::AuthPipeline;
pub use session::SessionContext;
