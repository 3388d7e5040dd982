//! Dashboard actions.
//!
//! # Data Flow
//! ```text
//! caller (CLI, UI shell)
//!     → client.rs run(): loading on, last_error cleared
//!     → files.rs / crops.rs / account.rs build an ApiRequest
//!     → http::AuthPipeline (bearer, 401 refresh + replay)
//!     → payload.rs collapses list shapes
//!     → state.rs stores the result, or the error's user message
//! ```
//!
//! # Design Decisions
//! - Identifiers are validated `ResourceId`s; bad input never reaches the
//!   network
//! - Processed data is a best-effort read: bounded retry, then empty rows
//! - Metadata labels are non-critical and never record an error

pub mod account;
pub mod client;
pub mod crops;
pub mod files;
pub mod payload;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::DashboardClient;
pub use payload::normalize_list;
pub use state::{DashboardState, LoadingGuard, StateStore};
pub use types::{
    parse_resource_id, CropImage, CropImageFilter, CropImageUpload, Credentials, CsvFile,
    ExcelFile, FileUpload, ImageMetadata, MetadataEntry, RegisterRequest, RegistrationOutcome,
    ResourceId,
};
