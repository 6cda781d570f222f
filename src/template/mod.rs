//! Directive expansion engine.
//!
//! # Data Flow
//! ```text
//! identifier
//!     → registry.rs (fetch raw content: filesystem or embedded table)
//!     → processor.rs (includes → code blocks → output tags)
//!         scanner.rs locates tags, scope.rs holds assignments,
//!         expr.rs evaluates output expressions against context.rs
//!     → rendered document
//! ```
//!
//! # Design Decisions
//! - The engine holds no shared mutable state; each render owns its scope
//! - Registries are immutable after construction and shared across renders

pub mod context;
pub mod expr;
pub mod processor;
pub mod registry;
pub mod scanner;
pub mod scope;

pub use context::RequestContext;
pub use processor::DirectiveProcessor;
pub use registry::{EmbeddedRegistry, FsRegistry, RegistryError, TemplateRegistry};
pub use scope::VariableScope;
