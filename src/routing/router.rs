//! Route table → dispatch plan.
//!
//! # Responsibilities
//! - Expand `ANY` into concrete methods
//! - Group bindings by path so each path is registered once
//! - Resolve duplicate path+method bindings
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Later table entries override earlier ones for the same path and method,
//!   matching registration order semantics
//! - Paths that do not start with `/`, or that the path router would refuse
//!   (stray `*` segments, conflicting captures), are skipped with a warning

use std::collections::HashMap;

use axum::http::Method;

use crate::config::routes::{RouteMethod, RouteTable};
use crate::routing::matcher::to_router_path;

/// Methods a wildcard route answers.
pub const ANY_METHODS: [Method; 8] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::TRACE,
];

fn expand(method: RouteMethod) -> Vec<Method> {
    match method {
        RouteMethod::Get => vec![Method::GET],
        RouteMethod::Post => vec![Method::POST],
        RouteMethod::Put => vec![Method::PUT],
        RouteMethod::Delete => vec![Method::DELETE],
        RouteMethod::Patch => vec![Method::PATCH],
        RouteMethod::Any => ANY_METHODS.to_vec(),
    }
}

/// Why a configured path cannot be registered.
fn rejection(router_path: &str, accepted: &mut matchit::Router<()>) -> Option<String> {
    if router_path
        .split('/')
        .any(|segment| segment.starts_with('*') || segment.starts_with(':'))
    {
        return Some("`*` is only allowed as the last segment".to_string());
    }
    accepted.insert(router_path, ()).err().map(|e| e.to_string())
}

/// All method bindings for one router path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBinding {
    /// Path in router syntax.
    pub path: String,
    /// Method → template identifier, in first-registration order.
    pub handlers: Vec<(Method, String)>,
}

/// Resolved set of configured routes, one binding per distinct path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    bindings: Vec<PathBinding>,
}

impl DispatchPlan {
    pub fn from_table(table: &RouteTable) -> Self {
        let mut bindings: Vec<PathBinding> = Vec::new();
        let mut by_path: HashMap<String, usize> = HashMap::new();
        let mut accepted = matchit::Router::new();

        for entry in table.entries() {
            if !entry.path.starts_with('/') {
                tracing::warn!(path = %entry.path, "Skipping route: path must start with '/'");
                continue;
            }

            let path = to_router_path(&entry.path);
            if !by_path.contains_key(&path) {
                if let Some(reason) = rejection(&path, &mut accepted) {
                    tracing::warn!(path = %entry.path, reason = %reason, "Skipping route");
                    continue;
                }
            }

            let idx = *by_path.entry(path.clone()).or_insert_with(|| {
                bindings.push(PathBinding {
                    path,
                    handlers: Vec::new(),
                });
                bindings.len() - 1
            });
            let binding = &mut bindings[idx];

            for method in entry.methods.iter().copied().flat_map(expand) {
                match binding.handlers.iter_mut().find(|(m, _)| *m == method) {
                    Some(existing) => {
                        tracing::debug!(
                            path = %entry.path,
                            method = %method,
                            previous = %existing.1,
                            file = %entry.file,
                            "Route binding overridden"
                        );
                        existing.1 = entry.file.clone();
                    }
                    None => binding.handlers.push((method, entry.file.clone())),
                }
            }
        }

        Self { bindings }
    }

    pub fn bindings(&self) -> &[PathBinding] {
        &self.bindings
    }

    /// Template bound to an exact router path and method, if any.
    #[cfg(test)]
    pub(crate) fn lookup(&self, path: &str, method: &Method) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.path == path)?
            .handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, file)| file.as_str())
    }
}
