//! Rendering a template into a response.
//!
//! # Responsibilities
//! - Fetch the top-level template and run the directive processor
//! - Map the outcome to a status code and body
//!
//! # Design Decisions
//! - Missing template → 404 with a plain-text body naming it
//! - Storage failure → 500 with a plain-text body carrying the error
//! - Include failures never reach this layer; they render inline

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::template::{DirectiveProcessor, RequestContext, TemplateRegistry};

/// Result of rendering one top-level template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    NotFound(String),
    Failed(String),
}

impl RenderOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            RenderOutcome::Rendered(_) => StatusCode::OK,
            RenderOutcome::NotFound(_) => StatusCode::NOT_FOUND,
            RenderOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RenderOutcome {
    fn into_response(self) -> Response {
        match self {
            RenderOutcome::Rendered(body) => Html(body).into_response(),
            RenderOutcome::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("File not found: {}", id)).into_response()
            }
            RenderOutcome::Failed(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// Fetch and render `id` with a fresh variable scope.
pub fn render_document(
    registry: &dyn TemplateRegistry,
    id: &str,
    max_include_depth: usize,
    request: &RequestContext,
) -> RenderOutcome {
    match registry.fetch(id) {
        Ok(content) => RenderOutcome::Rendered(
            DirectiveProcessor::new(registry)
                .with_max_include_depth(max_include_depth)
                .render(&content, request),
        ),
        Err(e) if e.is_not_found() => RenderOutcome::NotFound(id.to_string()),
        Err(e) => RenderOutcome::Failed(format!("Error reading file: {}", e)),
    }
}
