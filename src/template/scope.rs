//! Per-render variable scope.

use std::collections::HashMap;

/// Variables assigned by code blocks during one render.
///
/// A scope is created fresh for every top-level render and dropped when that
/// render returns; it is never shared between requests.
#[derive(Debug, Default, Clone)]
pub struct VariableScope {
    vars: HashMap<String, String>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`. Last write wins.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}
