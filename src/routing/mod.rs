//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteTable
//!     → router.rs (expand ANY, merge per path, later entries override)
//!     → DispatchPlan (immutable)
//!     → http::server registers one method router per path
//!
//! Unrouted request (or configured path, unconfigured method):
//!     → matcher.rs (path → template identifier)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same table always produces the same plan
//! - File-based routing is the fallback, never a 405

pub mod matcher;
pub mod router;

pub use matcher::FileRouteMatcher;
pub use router::DispatchPlan;
