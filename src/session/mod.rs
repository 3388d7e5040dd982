//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     storage.rs (durable keys: token, refreshToken, user)
//!     → context.rs restores the Credential Pair (both tokens or nothing)
//!
//! login / register / refresh / logout / timeout:
//!     → context.rs mutates the pair
//!     → storage.rs mirrors every mutation to disk
//!
//! user activity:
//!     → inactivity.rs stamps lastActivityTime
//!     → periodic check drops the session once the threshold is exceeded
//! ```
//!
//! # Design Decisions
//! - The session is an explicit object injected into every request issuer;
//!   there is no process-wide singleton
//! - Access and refresh tokens are set and cleared together
//! - Last write wins; writes are rare and user-attributable

pub mod context;
pub mod credentials;
pub mod inactivity;
pub mod storage;

pub use context::SessionContext;
pub use credentials::{AccessToken, CredentialPair, RefreshToken, UserProfile};
pub use inactivity::{ActivityEvent, Clock, InactivityMonitor, MonitorHandle, SystemClock};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
