//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble a [`Site`] (registry + route table) from disk or from an
//!   embedded table
//! - Start background tasks (watcher, metrics)
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: bind errors are fatal
//! - Watcher and metrics failures are logged and serving continues
//! - Compiled programs enter through [`run_embedded`] and share every code path
//!   with the filesystem-backed server except the registry

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::loader::ConfigError;
use crate::config::routes::load_routes_or_empty;
use crate::config::validation::validate_config;
use crate::config::watcher::{self, RootWatcher};
use crate::config::{RouteTable, ServerConfig};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{logging, metrics};
use crate::template::{EmbeddedRegistry, FsRegistry, TemplateRegistry};

/// Error type for server startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Templates and routes served together.
#[derive(Debug, Clone)]
pub struct Site {
    pub registry: Arc<dyn TemplateRegistry>,
    pub routes: RouteTable,
}

impl Site {
    /// Templates read from `config.site.root` on every request, routes from
    /// `config.site.routes_file` (empty table if it cannot be loaded).
    pub fn from_filesystem(config: &ServerConfig) -> Self {
        Self {
            registry: Arc::new(FsRegistry::new(&config.site.root)),
            routes: load_routes_or_empty(Path::new(&config.site.routes_file)),
        }
    }

    /// Templates and routes frozen into a compiled program.
    pub fn embedded(templates: &[(&str, &str)], routes: &[(&str, &str, &[&str])]) -> Self {
        Self {
            registry: Arc::new(EmbeddedRegistry::from_static(templates)),
            routes: RouteTable::from_static(routes),
        }
    }
}

/// Serve `site` until a shutdown signal arrives.
pub async fn serve(config: ServerConfig, site: Site) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    serve_with_shutdown(config, site, server_shutdown).await
}

/// Serve `site` until `shutdown` fires.
pub async fn serve_with_shutdown(
    config: ServerConfig,
    site: Site,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Dropping the handle stops the watcher, so it lives as long as `serve`.
    let _watch_handle = if config.site.watch {
        let (root_watcher, changes) = RootWatcher::new(Path::new(&config.site.root));
        match root_watcher.run() {
            Ok(handle) => {
                tokio::spawn(watcher::log_changes(changes));
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not set up file watcher");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        registry = site.registry.kind(),
        routes = site.routes.len(),
        root = %config.site.root,
        watch = config.site.watch,
        "Server ready"
    );

    let server = HttpServer::new(&config, site.registry, &site.routes);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Command line of a compiled program.
#[derive(Debug, Parser)]
#[command(about = "Serves templates compiled into this binary", long_about = None)]
pub struct EmbeddedArgs {
    /// Port to run the server on (default: the compiled-in listener's port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (default: the compiled-in listener's host)
    #[arg(long)]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl EmbeddedArgs {
    /// Apply command line overrides. Watching is always off.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            let port = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(_, port)| port.to_string())
                .unwrap_or_else(|| "8080".to_string());
            config.listener.bind_address = format!("{}:{}", host, port);
        }
        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        config.site.watch = false;
    }
}

/// Configuration of a compiled program: the settings captured at compile time
/// with `args` applied on top.
pub fn embedded_config(settings: &str, args: &EmbeddedArgs) -> Result<ServerConfig, ConfigError> {
    let mut config: ServerConfig = toml::from_str(settings)?;
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Entry point of compiled programs.
pub fn run_embedded(
    templates: &[(&str, &str)],
    routes: &[(&str, &str, &[&str])],
    settings: &str,
) -> ExitCode {
    let args = EmbeddedArgs::parse();
    let config = match embedded_config(settings, &args) {
        Ok(config) => config,
        Err(e) => {
            logging::init(args.log_level.as_deref().unwrap_or("info"));
            tracing::error!(error = %e, "Invalid compiled-in settings");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.observability.log_level);

    let site = Site::embedded(templates, routes);
    tracing::info!(
        templates = templates.len(),
        routes = site.routes.len(),
        address = %config.listener.bind_address,
        "Compiled server starting"
    );

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)
        .and_then(|runtime| runtime.block_on(serve(config, site)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
