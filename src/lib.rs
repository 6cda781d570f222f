//! Template server library.
//!
//! Renders HTML documents containing `<% %>` directives and compiles a
//! directory of them, plus a route table, into a standalone executable.

pub mod compile;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod template;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use template::{DirectiveProcessor, EmbeddedRegistry, FsRegistry, TemplateRegistry};
