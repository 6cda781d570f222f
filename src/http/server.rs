//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router from the dispatch plan
//! - Wire up middleware (request ID, tracing, CORS, timeout)
//! - Render templates for configured and file-based routes
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{RouteTable, ServerConfig};
use crate::http::request::{extract_context, request_id, MakeRequestUuid};
use crate::http::response::{render_document, RenderOutcome};
use crate::observability::metrics;
use crate::routing::{DispatchPlan, FileRouteMatcher};
use crate::template::TemplateRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn TemplateRegistry>,
    pub files: Arc<FileRouteMatcher>,
    pub max_include_depth: usize,
    pub max_body_bytes: usize,
}

/// HTTP server for templates.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server serving `registry` through `routes`.
    pub fn new(config: &ServerConfig, registry: Arc<dyn TemplateRegistry>, routes: &RouteTable) -> Self {
        let state = AppState {
            registry,
            files: Arc::new(FileRouteMatcher::new(
                config.site.index.clone(),
                config.site.extension.clone(),
            )),
            max_include_depth: config.render.max_include_depth,
            max_body_bytes: config.limits.max_body_bytes,
        };

        let plan = DispatchPlan::from_table(routes);
        let router = Self::build_router(config, &plan, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, plan: &DispatchPlan, state: AppState) -> Router {
        let mut router = Router::new();

        for binding in plan.bindings() {
            let mut method_router: MethodRouter<AppState> = MethodRouter::new();
            for (method, file) in &binding.handlers {
                let filter = match MethodFilter::try_from(method.clone()) {
                    Ok(filter) => filter,
                    Err(_) => {
                        tracing::warn!(path = %binding.path, method = %method, "Unsupported method, skipping");
                        continue;
                    }
                };
                let file: Arc<str> = Arc::from(file.as_str());
                method_router = method_router.on(
                    filter,
                    move |State(state): State<AppState>, request: Request<Body>| {
                        let file = file.clone();
                        async move { render_route(state, file.to_string(), request).await }
                    },
                );
            }

            tracing::debug!(
                path = %binding.path,
                methods = binding.handlers.len(),
                "Route registered"
            );
            router = router.route(&binding.path, method_router.fallback(file_handler));
        }

        router
            .fallback(file_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CorsLayer::permissive())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.limits.request_timeout_secs,
                    ))),
            )
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Handler for paths (or methods) no configured route claims.
async fn file_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let id = state.files.template_for(request.uri().path());
    render_route(state, id, request).await
}

async fn render_route(state: AppState, id: String, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method: Method = request.method().clone();

    tracing::debug!(request_id = %request_id, method = %method, template = %id, "Rendering template");

    let context = extract_context(request, state.max_body_bytes).await;
    let registry = state.registry.clone();
    let depth = state.max_include_depth;
    let kind = registry.kind();

    let rendered = tokio::task::spawn_blocking(move || {
        let outcome = render_document(registry.as_ref(), &id, depth, &context);
        (id, outcome)
    })
    .await;

    let outcome = match rendered {
        Ok((id, outcome)) => {
            match &outcome {
                RenderOutcome::NotFound(_) => {
                    tracing::info!(request_id = %request_id, template = %id, "Template not found")
                }
                RenderOutcome::Failed(message) => {
                    tracing::error!(request_id = %request_id, template = %id, error = %message, "Render failed")
                }
                RenderOutcome::Rendered(_) => {}
            }
            outcome
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Render task failed");
            RenderOutcome::Failed(format!("Template processing error: {}", e))
        }
    };

    metrics::record_render(kind, outcome.status().as_u16(), start);
    outcome.into_response()
}
