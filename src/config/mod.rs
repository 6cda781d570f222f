//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! server.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → CLI flags override individual fields
//!
//! routes.xml
//!     → routes.rs (parse; missing/malformed → empty table + warning)
//!     → RouteTable (immutable, shared via Arc)
//!
//! --watch:
//!     watcher.rs observes the template root and logs changes
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod routes;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use routes::{RouteEntry, RouteMethod, RouteTable};
pub use schema::ServerConfig;
pub use schema::{CompileConfig, ListenerConfig, SiteConfig};
