//! Output expression parsing and evaluation.
//!
//! # Resolution order
//! 1. A name bound in the active [`VariableScope`] (shadows everything below)
//! 2. `request.<field>` for `method`, `url`, `host`, `remoteaddr`
//! 3. `query.<name>` / `form.<name>`
//! 4. `left + right` with exactly one `+`
//! 5. Anything else echoes its own source text
//!
//! # Design Decisions
//! - Parsing is separate from evaluation so each rule can be tested alone
//! - Unrecognized expressions are not errors
//! - A non-numeric sum concatenates its operands without the `+` separator

use crate::template::context::RequestContext;
use crate::template::scope::VariableScope;

/// Request-backed namespaces an expression can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Request,
    Query,
    Form,
}

impl Namespace {
    fn split(source: &str) -> Option<(Self, &str)> {
        if let Some(key) = source.strip_prefix("request.") {
            Some((Namespace::Request, key))
        } else if let Some(key) = source.strip_prefix("query.") {
            Some((Namespace::Query, key))
        } else if let Some(key) = source.strip_prefix("form.") {
            Some((Namespace::Form, key))
        } else {
            None
        }
    }
}

/// A parsed output expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr<'a> {
    /// `request.*`, `query.*` or `form.*`.
    Namespaced { namespace: Namespace, key: &'a str },
    /// Two trimmed operands around a single `+`.
    Sum { left: &'a str, right: &'a str },
    /// Text that matches no other form; evaluates to itself.
    Literal(&'a str),
}

impl<'a> Expr<'a> {
    /// Parse a trimmed expression source.
    pub fn parse(source: &'a str) -> Self {
        if let Some((namespace, key)) = Namespace::split(source) {
            return Expr::Namespaced { namespace, key };
        }

        if source.contains('+') {
            let mut parts = source.split('+');
            if let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) {
                return Expr::Sum {
                    left: left.trim(),
                    right: right.trim(),
                };
            }
        }

        Expr::Literal(source)
    }
}

/// Evaluate `source` against the scope and the request.
pub fn evaluate(source: &str, scope: &VariableScope, request: &RequestContext) -> String {
    if let Some(value) = scope.get(source) {
        return value.to_string();
    }

    match Expr::parse(source) {
        Expr::Namespaced {
            namespace: Namespace::Request,
            key,
        } => match key {
            "method" => request.method.clone(),
            "url" => request.url.clone(),
            "host" => request.host.clone(),
            "remoteaddr" => request.remote_addr.clone(),
            _ => source.to_string(),
        },
        Expr::Namespaced {
            namespace: Namespace::Query,
            key,
        } => request.query_param(key).to_string(),
        Expr::Namespaced {
            namespace: Namespace::Form,
            key,
        } => request.form_value(key).to_string(),
        Expr::Sum { left, right } => sum(left, right),
        Expr::Literal(text) => text.to_string(),
    }
}

fn sum(left: &str, right: &str) -> String {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(l), Ok(r)) => l.wrapping_add(r).to_string(),
        _ => format!("{left}{right}"),
    }
}
