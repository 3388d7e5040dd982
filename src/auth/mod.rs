//! Credential lifecycle.
//!
//! # Data Flow
//! ```text
//! pipeline.rs sees a 401 on a fresh request
//!     → refresh.rs POST auth/token/refresh/ {refresh}
//!         ok    → session.update_access_token(access)
//!         error → session.clear_auth(), error returned
//! ```
//!
//! # Design Decisions
//! - The refresh call goes straight to the transport, never through the
//!   interceptors, so a rejected refresh cannot trigger another refresh

pub mod refresh;

pub use refresh::{TokenRefresher, REFRESH_PATH};
