//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch plan)
//!     → request.rs (request ID, RequestContext extraction)
//!     → template engine (fresh scope per render)
//!     → response.rs (200 html / 404 / 500 plain text)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
